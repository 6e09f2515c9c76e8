//! Bridges the HTTP client to the upload flow's API trait.

use std::path::Path;

use netlify_upload_api::Client;
use netlify_upload_api::models::{Deploy, DeployFiles, Site, SiteFile};
use netlify_upload_deploy::{ApiFuture, DeployApi};

/// [`DeployApi`] implementation over the real Netlify client.
pub struct NetlifyApi {
    client: Client,
}

impl NetlifyApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl DeployApi for NetlifyApi {
    fn list_sites<'a>(&'a self, name: &'a str) -> ApiFuture<'a, Vec<Site>> {
        Box::pin(async move { Ok(self.client.list_sites(name).await?) })
    }

    fn list_site_deploys<'a>(&'a self, site_id: &'a str) -> ApiFuture<'a, Vec<Deploy>> {
        Box::pin(async move { Ok(self.client.list_site_deploys(site_id).await?) })
    }

    fn get_site_deploy<'a>(
        &'a self,
        site_id: &'a str,
        deploy_id: &'a str,
    ) -> ApiFuture<'a, Deploy> {
        Box::pin(async move { Ok(self.client.get_site_deploy(site_id, deploy_id).await?) })
    }

    fn list_site_files<'a>(&'a self, site_id: &'a str) -> ApiFuture<'a, Vec<SiteFile>> {
        Box::pin(async move { Ok(self.client.list_site_files(site_id).await?) })
    }

    fn create_site_deploy<'a>(
        &'a self,
        site_id: &'a str,
        files: &'a DeployFiles,
    ) -> ApiFuture<'a, Deploy> {
        Box::pin(async move { Ok(self.client.create_site_deploy(site_id, files).await?) })
    }

    fn upload_deploy_file<'a>(
        &'a self,
        deploy_id: &'a str,
        path: &'a str,
        source: &'a Path,
    ) -> ApiFuture<'a, SiteFile> {
        Box::pin(async move {
            Ok(self
                .client
                .upload_deploy_file(deploy_id, path, source)
                .await?)
        })
    }

    fn cancel_deploy<'a>(&'a self, deploy_id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(async move { Ok(self.client.cancel_deploy(deploy_id).await?) })
    }

    fn delete_deploy<'a>(&'a self, deploy_id: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(async move { Ok(self.client.delete_deploy(deploy_id).await?) })
    }
}
