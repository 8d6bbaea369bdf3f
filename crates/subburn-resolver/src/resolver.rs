//! Link resolution against hosting providers.

use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, info, warn};

use subburn_models::FileLocation;

use crate::config::ResolverConfig;
use crate::error::{ResolutionError, ResolutionResult};
use crate::provider::{
    drive_file_id, filename_from_disposition, filename_from_url, pixeldrain_id, Provider,
    UNKNOWN_FILENAME,
};

/// Cookie name prefix Google Drive uses for the large-file confirmation token.
const DRIVE_WARNING_COOKIE: &str = "download_warning";

/// Pixeldrain `/api/file/<id>/info` response (only the fields we read).
#[derive(Debug, Deserialize)]
struct PixeldrainInfo {
    name: Option<String>,
}

/// Resolves user-supplied links to a final download URL and filename.
#[derive(Debug, Clone)]
pub struct LinkResolver {
    http: Client,
    config: ResolverConfig,
}

impl LinkResolver {
    /// Create a resolver with its own HTTP client.
    pub fn new(config: ResolverConfig) -> ResolutionResult<Self> {
        let http = Client::builder()
            .user_agent(concat!("subburn-resolver/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ResolutionError::unreachable(format!("HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }

    /// Create a resolver sharing an existing HTTP client.
    pub fn with_client(http: Client, config: ResolverConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve a link to its final URL and declared filename.
    pub async fn resolve(&self, url: &str) -> ResolutionResult<FileLocation> {
        let provider = Provider::detect(url);
        debug!(provider = %provider, "Resolving link: {}", url);

        let result = match provider {
            Provider::Pixeldrain => self.resolve_pixeldrain(url).await,
            Provider::GoogleDrive => self.resolve_drive(url).await,
            Provider::Generic => self.resolve_generic(url).await,
        };

        match &result {
            Ok(location) => info!(
                provider = %provider,
                filename = %location.filename,
                "Resolved link to {}", location.url
            ),
            Err(e) => warn!(provider = %provider, error = %e, "Failed to resolve link: {}", url),
        }

        result
    }

    async fn resolve_pixeldrain(&self, url: &str) -> ResolutionResult<FileLocation> {
        let id = pixeldrain_id(url)
            .ok_or_else(|| ResolutionError::provider_unreachable("no file id in link"))?;

        let download_url = format!("{}/file/{}", self.config.pixeldrain_api_base, id);
        let info_url = format!("{}/info", download_url);

        let info: PixeldrainInfo = self
            .http
            .get(&info_url)
            .timeout(self.config.pixeldrain_timeout)
            .send()
            .await
            .and_then(Response::error_for_status)
            .map_err(|e| ResolutionError::provider_unreachable(e.to_string()))?
            .json()
            .await
            .map_err(|e| ResolutionError::provider_unreachable(e.to_string()))?;

        let name = info
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| ResolutionError::provider_unreachable(format!("no name for file {}", id)))?;

        Ok(FileLocation::new(download_url, name))
    }

    async fn resolve_drive(&self, url: &str) -> ResolutionResult<FileLocation> {
        let id = drive_file_id(url)
            .ok_or_else(|| ResolutionError::quota_or_invalid("no file id in link"))?;

        let template = format!("{}/uc?id={}&export=download", self.config.drive_base, id);
        let mut response = self.drive_get(&template, None).await?;

        if let Some((name, token)) = drive_warning_cookie(&response) {
            debug!(file_id = id, "Google Drive confirmation required, replaying with token");
            let confirmed = format!("{}&confirm={}", template, token);
            let cookie = format!("{}={}", name, token);
            response = self.drive_get(&confirmed, Some(&cookie)).await?;
        }

        let content_type = header_str(&response, CONTENT_TYPE).unwrap_or_default();
        if content_type.contains("text/html") {
            return Err(ResolutionError::quota_or_invalid(
                "received an HTML page instead of a file",
            ));
        }

        let filename = header_str(&response, CONTENT_DISPOSITION)
            .and_then(|cd| filename_from_disposition(&cd))
            .ok_or_else(|| ResolutionError::quota_or_invalid("no filename in Content-Disposition"))?;

        Ok(FileLocation::new(response.url().to_string(), filename))
    }

    async fn drive_get(&self, url: &str, cookie: Option<&str>) -> ResolutionResult<Response> {
        let mut request = self.http.get(url).timeout(self.config.drive_timeout);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }

        // Only headers are read; the body is dropped unread.
        request
            .send()
            .await
            .and_then(Response::error_for_status)
            .map_err(|e| ResolutionError::quota_or_invalid(e.to_string()))
    }

    async fn resolve_generic(&self, url: &str) -> ResolutionResult<FileLocation> {
        let response = self
            .http
            .head(url)
            .timeout(self.config.head_timeout)
            .send()
            .await
            .and_then(Response::error_for_status)
            .map_err(|e| ResolutionError::unreachable(e.to_string()))?;

        let final_url = response.url().clone();

        let filename = header_str(&response, CONTENT_DISPOSITION)
            .and_then(|cd| filename_from_disposition(&cd))
            .or_else(|| filename_from_url(&final_url))
            .unwrap_or_else(|| {
                warn!("Could not determine filename for {}", url);
                UNKNOWN_FILENAME.to_string()
            });

        Ok(FileLocation::new(final_url.to_string(), filename))
    }
}

fn header_str(response: &Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Find a `download_warning*` cookie set by the response.
fn drive_warning_cookie(response: &Response) -> Option<(String, String)> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(parse_warning_cookie)
}

fn parse_warning_cookie(set_cookie: &str) -> Option<(String, String)> {
    let pair = set_cookie.split(';').next()?;
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.starts_with(DRIVE_WARNING_COOKIE) {
        Some((name.to_string(), value.trim().to_string()))
    } else {
        None
    }
}
