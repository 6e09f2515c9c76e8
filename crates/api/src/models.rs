//! Wire models for the subset of the Netlify API this tool consumes.
//!
//! Netlify serializes snake_case JSON, matching Rust field names, so no
//! rename attributes are needed. Locked deploys come back with explicit
//! `null` ids, hence the null-tolerant deserializer on those fields.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A site, as returned by the name-filtered site listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub site_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
}

/// Lifecycle state of a deploy.
///
/// Everything that is not `Ready` or `Error` counts as pending; states
/// Netlify adds later fall into `Other` instead of failing the parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployState {
    New,
    Enqueued,
    Building,
    Uploading,
    Uploaded,
    Preparing,
    Prepared,
    Processing,
    Ready,
    Error,
    #[serde(other)]
    Other,
}

/// A deploy of a site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deploy {
    #[serde(default, deserialize_with = "null_default")]
    pub id: String,
    pub state: DeployState,
    #[serde(default, deserialize_with = "null_default")]
    pub locked: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A file already deployed to a site. `id` is the slash-prefixed
/// destination path; `sha` is the hex SHA-1 of its content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteFile {
    pub id: String,
    #[serde(default)]
    pub sha: String,
}

/// Body for creating a deploy: the full path-to-digest manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeployFiles {
    pub files: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

/// Treats an explicit JSON `null` like a missing field.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
