//! Netlify API client for site deploys and file uploads.
//!
//! Async client for the [Netlify v1 API](https://docs.netlify.com/api/get-started/)
//! covering the operations the upload flow consumes: site lookup, deploy
//! listing and inspection, site file listing, deploy creation and
//! teardown, and raw file upload.

pub mod client;
pub mod models;

pub use client::{Client, Error};
pub use models::{Deploy, DeployFiles, DeployState, Site, SiteFile};
