//! Netlify API client.
//!
//! Async HTTP client using `reqwest` with Bearer token authentication.

use std::path::Path;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderValue};
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::models::{Deploy, DeployFiles, Site, SiteFile};

const DEFAULT_BASE_URL: &str = "https://api.netlify.com/api/v1";

/// Characters escaped in upload path segments. `/` separators pass
/// through so nested destination paths keep their shape in the URL.
const UPLOAD_PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'%');

/// Errors from the Netlify client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid API token")]
    InvalidToken,
}

/// Netlify API client.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    /// Creates a new client authenticating with the given personal
    /// access token.
    pub fn new(token: &str) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| Error::InvalidToken)?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Sets a custom base URL (for testing).
    #[cfg(test)]
    pub(crate) fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// Sends a prepared request, mapping non-2xx responses to
    /// [`Error::Api`] and returning the raw response body.
    async fn send(&self, req: reqwest::RequestBuilder) -> Result<Vec<u8>, Error> {
        let resp = req.send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.bytes().await?.to_vec())
    }

    /// Lists sites filtered by name.
    pub async fn list_sites(&self, name: &str) -> Result<Vec<Site>, Error> {
        let url = format!("{}/sites", self.base_url);
        let body = self
            .send(self.http.get(&url).query(&[("name", name)]))
            .await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Lists a site's deploys, newest first.
    pub async fn list_site_deploys(&self, site_id: &str) -> Result<Vec<Deploy>, Error> {
        let url = format!("{}/sites/{site_id}/deploys", self.base_url);
        let body = self.send(self.http.get(&url)).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Fetches a single deploy of a site.
    pub async fn get_site_deploy(&self, site_id: &str, deploy_id: &str) -> Result<Deploy, Error> {
        let url = format!("{}/sites/{site_id}/deploys/{deploy_id}", self.base_url);
        let body = self.send(self.http.get(&url)).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Lists the files currently deployed to a site.
    pub async fn list_site_files(&self, site_id: &str) -> Result<Vec<SiteFile>, Error> {
        let url = format!("{}/sites/{site_id}/files", self.base_url);
        let body = self.send(self.http.get(&url)).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Creates a deploy of a site from a file manifest.
    pub async fn create_site_deploy(
        &self,
        site_id: &str,
        files: &DeployFiles,
    ) -> Result<Deploy, Error> {
        let url = format!("{}/sites/{site_id}/deploys", self.base_url);
        let body = self.send(self.http.post(&url).json(files)).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Streams a local file to `path` within a deploy.
    ///
    /// Opens its own handle on `source`; the destination path must
    /// already be sanitized (no leading slash, no `#`/`?`).
    pub async fn upload_deploy_file(
        &self,
        deploy_id: &str,
        path: &str,
        source: &Path,
    ) -> Result<SiteFile, Error> {
        let file = tokio::fs::File::open(source).await?;
        let size = file.metadata().await?.len();

        let encoded = utf8_percent_encode(path, UPLOAD_PATH).to_string();
        let url = format!("{}/deploys/{deploy_id}/files/{encoded}", self.base_url);
        debug!(deploy = %deploy_id, path = %path, size, "uploading file");

        let req = self
            .http
            .put(&url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, size)
            .body(reqwest::Body::wrap_stream(ReaderStream::new(file)));

        let body = self.send(req).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Cancels an in-flight deploy.
    pub async fn cancel_deploy(&self, deploy_id: &str) -> Result<(), Error> {
        let url = format!("{}/deploys/{deploy_id}/cancel", self.base_url);
        self.send(self.http.post(&url)).await?;
        Ok(())
    }

    /// Deletes a deploy.
    pub async fn delete_deploy(&self, deploy_id: &str) -> Result<(), Error> {
        let url = format!("{}/deploys/{deploy_id}", self.base_url);
        self.send(self.http.delete(&url)).await?;
        Ok(())
    }
}
