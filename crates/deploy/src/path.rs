//! Destination path normalization.

use crate::error::UploadError;

/// Cleans a destination path for use as a manifest key.
///
/// Deploy paths are URL-addressed, so `#` and `?` are illegal anywhere
/// in them. A single leading `/` is stripped; manifest registration adds
/// it back. Already-clean paths pass through unchanged, which makes the
/// function idempotent.
pub fn clean_destination_path(path: &str) -> Result<String, UploadError> {
    let illegal: Vec<String> = path
        .chars()
        .filter(|c| matches!(c, '#' | '?'))
        .map(String::from)
        .collect();

    if !illegal.is_empty() {
        return Err(UploadError::InvalidPath {
            path: path.to_string(),
            chars: illegal.join(", "),
        });
    }

    Ok(path.strip_prefix('/').unwrap_or(path).to_string())
}
