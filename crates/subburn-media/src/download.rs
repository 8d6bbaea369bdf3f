//! Streaming HTTP download to local disk.

use futures_util::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};

/// Write buffer size used while streaming to disk.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// Default bound on any single network wait (connect, headers, next chunk).
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Downloads resolved file locations to local paths.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpDownloader {
    /// Create a downloader with its own HTTP client.
    pub fn new(timeout: Duration) -> MediaResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .user_agent(concat!("subburn-media/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, timeout })
    }

    /// Create a downloader sharing an existing HTTP client.
    pub fn with_client(http: reqwest::Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    /// Stream `url` into `dest`, overwriting it. Returns the number of bytes written.
    ///
    /// The timeout bounds each wait on the network, not the whole transfer,
    /// so large files only fail when the connection stalls.
    pub async fn download(&self, url: &str, dest: impl AsRef<Path>) -> MediaResult<u64> {
        let dest = dest.as_ref();
        let secs = self.timeout.as_secs();

        info!("Downloading {} to {}", url, dest.display());

        let response = tokio::time::timeout(self.timeout, self.http.get(url).send())
            .await
            .map_err(|_| MediaError::Timeout(secs))??
            .error_for_status()?;

        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut writer = BufWriter::with_capacity(CHUNK_SIZE, File::create(dest).await?);
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        loop {
            let next = tokio::time::timeout(self.timeout, stream.next())
                .await
                .map_err(|_| MediaError::Timeout(secs))?;

            match next {
                Some(chunk) => {
                    let chunk = chunk?;
                    writer.write_all(&chunk).await?;
                    written += chunk.len() as u64;
                }
                None => break,
            }
        }

        writer.flush().await?;

        debug!(bytes = written, "Download finished: {}", dest.display());
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_download_writes_body() {
        let server = MockServer::start().await;
        let body = vec![7u8; CHUNK_SIZE * 3 + 11];
        Mock::given(method("GET"))
            .and(path("/file.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("nested").join("out.mp4");
        let downloader = HttpDownloader::new(Duration::from_secs(5)).unwrap();

        let written = downloader
            .download(&format!("{}/file.mp4", server.uri()), &dest)
            .await
            .unwrap();

        assert_eq!(written, body.len() as u64);
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), body);
    }

    #[tokio::test]
    async fn test_download_rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.mp4");
        let downloader = HttpDownloader::new(Duration::from_secs(5)).unwrap();

        let result = downloader
            .download(&format!("{}/missing.mp4", server.uri()), &dest)
            .await;

        assert!(matches!(result, Err(MediaError::DownloadFailed { .. })));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_download_times_out_on_slow_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let downloader = HttpDownloader::new(Duration::from_millis(200)).unwrap();

        let result = downloader
            .download(&format!("{}/slow.mp4", server.uri()), dir.path().join("slow.mp4"))
            .await;

        assert!(matches!(result, Err(MediaError::Timeout(_))));
    }
}
