//! Deploy manifest reconciliation.

use std::collections::HashMap;

use netlify_upload_api::models::SiteFile;

/// Mapping from slash-prefixed destination path to hex SHA-1 digest.
///
/// Built from the site's existing file list and merged with new entries,
/// so a deploy never drops files that are already live. Registering a
/// path that is already present overwrites only that entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileManifest {
    files: HashMap<String, String>,
}

impl FileManifest {
    /// Builds a manifest from the files currently deployed to a site.
    pub fn from_site_files(existing: &[SiteFile]) -> Self {
        Self {
            files: existing
                .iter()
                .map(|file| (file.id.clone(), file.sha.clone()))
                .collect(),
        }
    }

    /// Registers a cleaned destination path (no leading slash) under its
    /// manifest key `/path`.
    pub fn register(&mut self, clean_path: &str, sha1: &str) {
        self.files
            .insert(format!("/{clean_path}"), sha1.to_string());
    }

    /// Returns the digest registered for a manifest key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.files.get(key).map(String::as_str)
    }

    /// Number of entries in the manifest.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the manifest holds no entries.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Consumes the manifest into the wire mapping.
    pub fn into_files(self) -> HashMap<String, String> {
        self.files
    }
}
