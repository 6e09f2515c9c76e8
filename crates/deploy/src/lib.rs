//! Upload flow for Netlify site deploys.
//!
//! This crate implements the **business logic** for pushing local files
//! into a site's next deploy. It is a library crate with no transport
//! dependencies — the action binary provides a [`DeployApi`]
//! implementation that bridges to the actual HTTP client.
//!
//! # Pipeline
//!
//! 1. **Resolve** — look up the site ID by name
//! 2. **Settle** — poll the newest deploy until it leaves its pending state
//! 3. **Hash** — SHA-1 each source file in one streaming pass
//! 4. **Reconcile** — merge the new paths into the site's file manifest
//! 5. **Submit** — create the deploy carrying the merged manifest
//! 6. **Upload** — stream each file's bytes to its destination path

pub mod api;
pub mod digest;
pub mod error;
pub mod manifest;
pub mod path;
pub mod types;
pub mod uploader;

// Re-export primary types for convenience.
pub use api::{ApiFuture, DeployApi};
pub use digest::{FileDigest, digest_file};
pub use error::UploadError;
pub use manifest::FileManifest;
pub use path::clean_destination_path;
pub use types::{FileSpec, PollConfig, UploadEvent, UploadOutcome, UploadPlan};
pub use uploader::Uploader;
