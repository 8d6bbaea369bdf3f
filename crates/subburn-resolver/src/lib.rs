//! Link resolution for hosted video and subtitle files.
//!
//! Turns a user-supplied link into a [`subburn_models::FileLocation`]:
//! the final, redirect-resolved download URL plus the declared filename.
//!
//! Supported providers, in dispatch order:
//! - Pixeldrain (`pixeldrain.com/u/<id>`, `pixeldrain.com/l/<id>`)
//! - Google Drive (`/file/d/<id>`, `open?id=<id>`, `uc?id=<id>`), including
//!   the large-file confirmation interstitial
//! - Any other direct link, probed with a HEAD request

pub mod config;
pub mod error;
pub mod provider;
pub mod resolver;

pub use config::ResolverConfig;
pub use error::{ResolutionError, ResolutionResult};
pub use provider::{Provider, UNKNOWN_FILENAME};
pub use resolver::LinkResolver;
