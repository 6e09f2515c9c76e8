//! Remote API capability used by the upload flow.
//!
//! `DeployApi` is implemented by the action binary on top of the real
//! Netlify client. Using a trait keeps the flow decoupled from transport
//! and testable with in-memory fakes.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use netlify_upload_api::models::{Deploy, DeployFiles, Site, SiteFile};

use crate::error::UploadError;

/// Boxed future returned by [`DeployApi`] methods.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, UploadError>> + Send + 'a>>;

/// The narrow slice of the Netlify API the upload flow consumes.
pub trait DeployApi: Send + Sync {
    /// Lists sites filtered by name.
    fn list_sites<'a>(&'a self, name: &'a str) -> ApiFuture<'a, Vec<Site>>;

    /// Lists a site's deploys, newest first.
    fn list_site_deploys<'a>(&'a self, site_id: &'a str) -> ApiFuture<'a, Vec<Deploy>>;

    /// Fetches a single deploy of a site.
    fn get_site_deploy<'a>(
        &'a self,
        site_id: &'a str,
        deploy_id: &'a str,
    ) -> ApiFuture<'a, Deploy>;

    /// Lists the files currently deployed to a site.
    fn list_site_files<'a>(&'a self, site_id: &'a str) -> ApiFuture<'a, Vec<SiteFile>>;

    /// Creates a deploy of a site from a file manifest.
    fn create_site_deploy<'a>(
        &'a self,
        site_id: &'a str,
        files: &'a DeployFiles,
    ) -> ApiFuture<'a, Deploy>;

    /// Streams the file at `source` to `path` within a deploy.
    ///
    /// Takes the local path rather than an open stream: the hash pass
    /// already consumed one handle, so the transport opens its own.
    fn upload_deploy_file<'a>(
        &'a self,
        deploy_id: &'a str,
        path: &'a str,
        source: &'a Path,
    ) -> ApiFuture<'a, SiteFile>;

    /// Cancels an in-flight deploy.
    fn cancel_deploy<'a>(&'a self, deploy_id: &'a str) -> ApiFuture<'a, ()>;

    /// Deletes a deploy.
    fn delete_deploy<'a>(&'a self, deploy_id: &'a str) -> ApiFuture<'a, ()>;
}
