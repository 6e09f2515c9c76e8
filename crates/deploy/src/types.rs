//! Public types for the upload flow.

use std::path::PathBuf;
use std::time::Duration;

/// One file to upload: local source and raw destination path.
///
/// The destination is cleaned during the run; it may still carry a
/// leading slash here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    pub source: PathBuf,
    pub destination: String,
}

/// What to upload and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPlan {
    pub site_name: String,
    pub files: Vec<FileSpec>,
    /// Branch to attach the deploy to, when the site uses branch deploys.
    pub branch: Option<String>,
}

/// Polling cadence for deploy readiness.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay between status checks.
    pub interval: Duration,
    /// Total time to wait before giving up with a timeout error.
    pub max_wait: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(600),
        }
    }
}

/// Progress events emitted during an upload run.
#[derive(Debug, Clone)]
pub enum UploadEvent {
    SiteResolved {
        site_id: String,
    },
    WaitingForDeploy {
        deploy_id: String,
        attempt: u32,
    },
    FileHashed {
        destination: String,
        sha1: String,
        size: u64,
    },
    DeployCreated {
        deploy_id: String,
    },
    FileUploaded {
        destination: String,
    },
    FileFailed {
        destination: String,
        error: String,
    },
    Completed {
        deploy_id: String,
    },
    Failed {
        error: String,
    },
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub site_id: String,
    pub deploy_id: String,
    /// Cleaned destination paths that were uploaded, in plan order.
    pub uploaded: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_config_defaults() {
        let poll = PollConfig::default();
        assert_eq!(poll.interval, Duration::from_secs(5));
        assert_eq!(poll.max_wait, Duration::from_secs(600));
    }
}
