//! Upload flow error types.

use std::time::Duration;

/// Errors produced while uploading files to a site.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("could not find site with exact name {0}")]
    SiteNotFound(String),

    #[error("site {0} has no deploys to wait on")]
    NoDeploys(String),

    #[error("Existing build failed. Terminating upload...")]
    DeployFailed,

    #[error("destination path {path} contains illegal characters: {chars}")]
    InvalidPath { path: String, chars: String },

    #[error("deploy still not ready after {0:?}")]
    Timeout(Duration),

    #[error("cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Netlify API error: {0}")]
    Api(#[from] netlify_upload_api::Error),

    #[error("could not upload {failed} of {total} files")]
    Upload { failed: usize, total: usize },
}
