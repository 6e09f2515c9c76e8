//! Sequential upload flow orchestration.
//!
//! Drives the pipeline against a [`DeployApi`], emits coarse progress
//! events, and supports cancellation between stages. Every failure after
//! the new deploy exists tears that deploy down again so the site is not
//! left with a half-registered manifest.

use std::path::PathBuf;

use netlify_upload_api::models::{Deploy, DeployFiles, DeployState};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::DeployApi;
use crate::digest::{FileDigest, digest_file};
use crate::error::UploadError;
use crate::manifest::FileManifest;
use crate::path::clean_destination_path;
use crate::types::{PollConfig, UploadEvent, UploadOutcome, UploadPlan};

/// A source file after hashing and destination cleaning.
struct PreparedFile {
    source: PathBuf,
    destination: String,
    digest: FileDigest,
}

/// Runs the upload pipeline for one site.
pub struct Uploader<'a> {
    api: &'a dyn DeployApi,
    poll: PollConfig,
    cancel: CancellationToken,
    events_tx: mpsc::Sender<UploadEvent>,
    events_rx: Option<mpsc::Receiver<UploadEvent>>,
}

impl<'a> Uploader<'a> {
    /// Creates an uploader over the given API with default polling.
    pub fn new(api: &'a dyn DeployApi) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            api,
            poll: PollConfig::default(),
            cancel: CancellationToken::new(),
            events_tx,
            events_rx: Some(events_rx),
        }
    }

    /// Overrides the polling cadence.
    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.events_rx.take()
    }

    /// Returns a cancellation token for this run.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the full pipeline.
    pub async fn run(&self, plan: &UploadPlan) -> Result<UploadOutcome, UploadError> {
        match self.run_inner(plan).await {
            Ok(outcome) => {
                info!(
                    site = %outcome.site_id,
                    deploy = %outcome.deploy_id,
                    files = outcome.uploaded.len(),
                    "upload complete"
                );
                self.emit(UploadEvent::Completed {
                    deploy_id: outcome.deploy_id.clone(),
                });
                Ok(outcome)
            }
            Err(e) => {
                error!(error = %e, "upload failed");
                self.emit(UploadEvent::Failed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run_inner(&self, plan: &UploadPlan) -> Result<UploadOutcome, UploadError> {
        self.check_cancelled()?;

        let site_id = self.resolve_site(&plan.site_name).await?;
        self.emit(UploadEvent::SiteResolved {
            site_id: site_id.clone(),
        });
        debug!(site = %plan.site_name, site_id = %site_id, "resolved site");

        // Let whatever is currently deploying settle before touching the site.
        let current = self.latest_deploy(&site_id).await?;
        self.await_ready(&site_id, &current).await?;

        // Hash sources and clean destinations before touching the manifest.
        let mut prepared = Vec::with_capacity(plan.files.len());
        for spec in &plan.files {
            self.check_cancelled()?;
            let destination = clean_destination_path(&spec.destination)?;
            let digest = digest_file(&spec.source)?;
            debug!(
                source = %spec.source.display(),
                destination = %destination,
                sha1 = %digest.sha1,
                size = digest.size,
                "hashed file"
            );
            self.emit(UploadEvent::FileHashed {
                destination: destination.clone(),
                sha1: digest.sha1.clone(),
                size: digest.size,
            });
            prepared.push(PreparedFile {
                source: spec.source.clone(),
                destination,
                digest,
            });
        }

        // Merge into the live file list so existing files survive the deploy.
        let existing = self.api.list_site_files(&site_id).await?;
        let mut manifest = FileManifest::from_site_files(&existing);
        for file in &prepared {
            manifest.register(&file.destination, &file.digest.sha1);
        }
        debug!(
            entries = manifest.len(),
            new = prepared.len(),
            "manifest reconciled"
        );

        let body = DeployFiles {
            files: manifest.into_files(),
            branch: plan.branch.clone(),
        };
        let deploy = self.api.create_site_deploy(&site_id, &body).await?;
        self.emit(UploadEvent::DeployCreated {
            deploy_id: deploy.id.clone(),
        });
        debug!(deploy = %deploy.id, "created deploy");

        match self.upload_all(&site_id, &deploy, &prepared).await {
            Ok(uploaded) => Ok(UploadOutcome {
                site_id,
                deploy_id: deploy.id,
                uploaded,
            }),
            Err(e) => {
                self.destroy_deploy(&deploy.id).await;
                Err(e)
            }
        }
    }

    /// Resolves a site name to its ID via the name-filtered listing.
    pub async fn resolve_site(&self, name: &str) -> Result<String, UploadError> {
        let sites = self.api.list_sites(name).await?;
        sites
            .iter()
            .find(|site| site.name == name)
            .map(|site| site.site_id.clone())
            .ok_or_else(|| UploadError::SiteNotFound(name.to_string()))
    }

    /// Returns the site's most recent deploy (the listing is newest-first).
    pub async fn latest_deploy(&self, site_id: &str) -> Result<Deploy, UploadError> {
        let mut deploys = self.api.list_site_deploys(site_id).await?;
        if deploys.is_empty() {
            return Err(UploadError::NoDeploys(site_id.to_string()));
        }
        Ok(deploys.remove(0))
    }

    /// Polls a deploy until it reaches a terminal state.
    ///
    /// An errored deploy fails the run immediately; a ready or locked
    /// deploy (or one the API returned without an id) counts as settled.
    /// The first status check runs before any sleep, and the wait is
    /// bounded by [`PollConfig::max_wait`].
    pub async fn await_ready(&self, site_id: &str, deploy: &Deploy) -> Result<String, UploadError> {
        if deploy.id.is_empty() || deploy.locked {
            debug!(deploy = %deploy.id, locked = deploy.locked, "nothing to poll");
            return Ok(deploy.id.clone());
        }

        let started = tokio::time::Instant::now();
        let mut attempt: u32 = 0;

        loop {
            self.check_cancelled()?;
            attempt += 1;

            let current = self.api.get_site_deploy(site_id, &deploy.id).await?;
            match current.state {
                DeployState::Error => return Err(UploadError::DeployFailed),
                DeployState::Ready => return Ok(current.id),
                _ if current.locked => return Ok(current.id),
                _ => {}
            }

            self.emit(UploadEvent::WaitingForDeploy {
                deploy_id: deploy.id.clone(),
                attempt,
            });
            debug!(
                deploy = %deploy.id,
                attempt,
                state = ?current.state,
                "deploy not ready yet"
            );

            if started.elapsed() >= self.poll.max_wait {
                return Err(UploadError::Timeout(self.poll.max_wait));
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(UploadError::Cancelled),
                _ = tokio::time::sleep(self.poll.interval) => {}
            }
        }
    }

    /// Uploads every prepared file, then waits for the deploy to go live.
    ///
    /// Transport failures are accumulated so every broken file gets
    /// reported before the run aborts.
    async fn upload_all(
        &self,
        site_id: &str,
        deploy: &Deploy,
        prepared: &[PreparedFile],
    ) -> Result<Vec<String>, UploadError> {
        let mut uploaded = Vec::with_capacity(prepared.len());
        let mut failed = 0usize;

        for file in prepared {
            self.check_cancelled()?;
            match self
                .api
                .upload_deploy_file(&deploy.id, &file.destination, &file.source)
                .await
            {
                Ok(_) => {
                    self.emit(UploadEvent::FileUploaded {
                        destination: file.destination.clone(),
                    });
                    uploaded.push(file.destination.clone());
                }
                Err(e) => {
                    warn!(destination = %file.destination, error = %e, "file upload failed");
                    self.emit(UploadEvent::FileFailed {
                        destination: file.destination.clone(),
                        error: e.to_string(),
                    });
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(UploadError::Upload {
                failed,
                total: prepared.len(),
            });
        }

        // The run only counts once the new deploy has gone live.
        self.await_ready(site_id, deploy).await?;
        Ok(uploaded)
    }

    /// Cancels and deletes a deploy created by this run. Failures are
    /// logged and swallowed so the original error keeps propagating.
    async fn destroy_deploy(&self, deploy_id: &str) {
        if deploy_id.is_empty() {
            return;
        }

        if let Err(e) = self.api.cancel_deploy(deploy_id).await {
            warn!(deploy = %deploy_id, error = %e, "failed to cancel deploy");
            return;
        }
        if let Err(e) = self.api.delete_deploy(deploy_id).await {
            warn!(deploy = %deploy_id, error = %e, "failed to delete deploy");
        }
    }

    fn check_cancelled(&self) -> Result<(), UploadError> {
        if self.cancel.is_cancelled() {
            Err(UploadError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn emit(&self, event: UploadEvent) {
        let _ = self.events_tx.try_send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiFuture;
    use crate::types::FileSpec;
    use netlify_upload_api::models::{Site, SiteFile};
    use std::collections::{HashMap, VecDeque};
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;

    fn deploy(id: &str, state: DeployState) -> Deploy {
        Deploy {
            id: id.into(),
            state,
            locked: false,
            created_at: None,
        }
    }

    /// In-memory fake with scripted deploy states.
    struct FakeApi {
        sites: Vec<Site>,
        deploys: Vec<Deploy>,
        files: Vec<SiteFile>,
        create_response: Deploy,
        /// Scripted `get_site_deploy` responses per deploy id; the last
        /// entry repeats once the script is exhausted.
        states: Mutex<HashMap<String, VecDeque<Deploy>>>,
        get_calls: Mutex<HashMap<String, u32>>,
        created: Mutex<Option<DeployFiles>>,
        uploads: Mutex<Vec<(String, String)>>,
        fail_upload_for: Option<String>,
        cancelled: Mutex<Vec<String>>,
        deleted: Mutex<Vec<String>>,
    }

    impl FakeApi {
        fn new() -> Self {
            let mut states = HashMap::new();
            states.insert(
                "d-current".to_string(),
                VecDeque::from([deploy("d-current", DeployState::Ready)]),
            );
            states.insert(
                "d-new".to_string(),
                VecDeque::from([deploy("d-new", DeployState::Ready)]),
            );

            Self {
                sites: vec![Site {
                    site_id: "example-id".into(),
                    name: "example-site".into(),
                    url: String::new(),
                }],
                deploys: vec![deploy("d-current", DeployState::Ready)],
                files: vec![
                    SiteFile {
                        id: "/index.html".into(),
                        sha: "abc".into(),
                    },
                    SiteFile {
                        id: "/asset.pdf".into(),
                        sha: "def".into(),
                    },
                ],
                create_response: deploy("d-new", DeployState::Uploading),
                states: Mutex::new(states),
                get_calls: Mutex::new(HashMap::new()),
                created: Mutex::new(None),
                uploads: Mutex::new(Vec::new()),
                fail_upload_for: None,
                cancelled: Mutex::new(Vec::new()),
                deleted: Mutex::new(Vec::new()),
            }
        }

        fn script_states(&self, deploy_id: &str, script: Vec<Deploy>) {
            self.states
                .lock()
                .unwrap()
                .insert(deploy_id.to_string(), VecDeque::from(script));
        }

        fn calls_for(&self, deploy_id: &str) -> u32 {
            self.get_calls
                .lock()
                .unwrap()
                .get(deploy_id)
                .copied()
                .unwrap_or(0)
        }
    }

    impl DeployApi for FakeApi {
        fn list_sites<'a>(&'a self, _name: &'a str) -> ApiFuture<'a, Vec<Site>> {
            Box::pin(async move { Ok(self.sites.clone()) })
        }

        fn list_site_deploys<'a>(&'a self, _site_id: &'a str) -> ApiFuture<'a, Vec<Deploy>> {
            Box::pin(async move { Ok(self.deploys.clone()) })
        }

        fn get_site_deploy<'a>(
            &'a self,
            _site_id: &'a str,
            deploy_id: &'a str,
        ) -> ApiFuture<'a, Deploy> {
            Box::pin(async move {
                *self
                    .get_calls
                    .lock()
                    .unwrap()
                    .entry(deploy_id.to_string())
                    .or_insert(0) += 1;

                let mut states = self.states.lock().unwrap();
                let queue = states.get_mut(deploy_id).expect("unscripted deploy id");
                let next = if queue.len() > 1 {
                    queue.pop_front().unwrap()
                } else {
                    queue.front().cloned().expect("empty state script")
                };
                Ok(next)
            })
        }

        fn list_site_files<'a>(&'a self, _site_id: &'a str) -> ApiFuture<'a, Vec<SiteFile>> {
            Box::pin(async move { Ok(self.files.clone()) })
        }

        fn create_site_deploy<'a>(
            &'a self,
            _site_id: &'a str,
            files: &'a DeployFiles,
        ) -> ApiFuture<'a, Deploy> {
            Box::pin(async move {
                *self.created.lock().unwrap() = Some(files.clone());
                Ok(self.create_response.clone())
            })
        }

        fn upload_deploy_file<'a>(
            &'a self,
            deploy_id: &'a str,
            path: &'a str,
            _source: &'a Path,
        ) -> ApiFuture<'a, SiteFile> {
            Box::pin(async move {
                if self.fail_upload_for.as_deref() == Some(path) {
                    return Err(UploadError::Api(netlify_upload_api::Error::Api {
                        status: 500,
                        body: "upload rejected".into(),
                    }));
                }
                self.uploads
                    .lock()
                    .unwrap()
                    .push((deploy_id.to_string(), path.to_string()));
                Ok(SiteFile {
                    id: format!("/{path}"),
                    sha: String::new(),
                })
            })
        }

        fn cancel_deploy<'a>(&'a self, deploy_id: &'a str) -> ApiFuture<'a, ()> {
            Box::pin(async move {
                self.cancelled.lock().unwrap().push(deploy_id.to_string());
                Ok(())
            })
        }

        fn delete_deploy<'a>(&'a self, deploy_id: &'a str) -> ApiFuture<'a, ()> {
            Box::pin(async move {
                self.deleted.lock().unwrap().push(deploy_id.to_string());
                Ok(())
            })
        }
    }

    fn plan_for(dir: &Path, destination: &str) -> UploadPlan {
        UploadPlan {
            site_name: "example-site".into(),
            files: vec![FileSpec {
                source: dir.join("asset.pdf"),
                destination: destination.into(),
            }],
            branch: None,
        }
    }

    fn write_source(dir: &Path) {
        std::fs::write(dir.join("asset.pdf"), b"hello, world!").unwrap();
    }

    #[tokio::test]
    async fn happy_path_uploads_and_completes() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path());

        let api = FakeApi::new();
        let uploader = Uploader::new(&api);
        let outcome = uploader.run(&plan_for(dir.path(), "/asset.pdf")).await.unwrap();

        assert_eq!(outcome.site_id, "example-id");
        assert_eq!(outcome.deploy_id, "d-new");
        assert_eq!(outcome.uploaded, vec!["asset.pdf"]);

        let uploads = api.uploads.lock().unwrap();
        assert_eq!(
            *uploads,
            vec![("d-new".to_string(), "asset.pdf".to_string())]
        );
    }

    #[tokio::test]
    async fn manifest_merges_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path());

        let api = FakeApi::new();
        let uploader = Uploader::new(&api);
        uploader.run(&plan_for(dir.path(), "/asset.pdf")).await.unwrap();

        let created = api.created.lock().unwrap().clone().unwrap();
        assert_eq!(created.files.len(), 2);
        assert_eq!(created.files["/index.html"], "abc");
        // The colliding entry carries the new file's digest.
        assert_eq!(
            created.files["/asset.pdf"],
            "1f09d30c707d53f3d16c530dd73d70a6ce7596a9"
        );
    }

    #[tokio::test]
    async fn ready_deploy_needs_a_single_poll() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path());

        let api = FakeApi::new();
        let uploader = Uploader::new(&api);
        uploader.run(&plan_for(dir.path(), "/asset.pdf")).await.unwrap();

        assert_eq!(api.calls_for("d-current"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_deploy_is_polled_until_ready() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path());

        let api = FakeApi::new();
        api.script_states(
            "d-current",
            vec![
                deploy("d-current", DeployState::Building),
                deploy("d-current", DeployState::Building),
                deploy("d-current", DeployState::Ready),
            ],
        );

        let uploader = Uploader::new(&api);
        uploader.run(&plan_for(dir.path(), "/asset.pdf")).await.unwrap();

        assert_eq!(api.calls_for("d-current"), 3);
    }

    #[tokio::test]
    async fn errored_deploy_fails_without_further_polling() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path());

        let api = FakeApi::new();
        api.script_states("d-current", vec![deploy("d-current", DeployState::Error)]);

        let uploader = Uploader::new(&api);
        let err = uploader
            .run(&plan_for(dir.path(), "/asset.pdf"))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::DeployFailed));
        assert_eq!(
            err.to_string(),
            "Existing build failed. Terminating upload..."
        );
        assert_eq!(api.calls_for("d-current"), 1);
        assert!(api.created.lock().unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_deploy_times_out() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path());

        let api = FakeApi::new();
        api.script_states("d-current", vec![deploy("d-current", DeployState::Building)]);

        let uploader = Uploader::new(&api).with_poll_config(PollConfig {
            interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(12),
        });
        let err = uploader
            .run(&plan_for(dir.path(), "/asset.pdf"))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Timeout(_)));
    }

    #[tokio::test]
    async fn locked_deploy_is_settled_without_polling() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path());

        let mut api = FakeApi::new();
        api.deploys = vec![Deploy {
            locked: true,
            ..deploy("d-current", DeployState::Building)
        }];

        let uploader = Uploader::new(&api);
        uploader.run(&plan_for(dir.path(), "/asset.pdf")).await.unwrap();

        assert_eq!(api.calls_for("d-current"), 0);
    }

    #[tokio::test]
    async fn deploy_without_id_is_settled_without_polling() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path());

        let mut api = FakeApi::new();
        api.deploys = vec![deploy("", DeployState::Building)];

        let uploader = Uploader::new(&api);
        uploader.run(&plan_for(dir.path(), "/asset.pdf")).await.unwrap();

        assert!(api.get_calls.lock().unwrap().get("").is_none());
    }

    #[tokio::test]
    async fn unknown_site_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path());

        let mut api = FakeApi::new();
        api.sites = Vec::new();

        let uploader = Uploader::new(&api);
        let err = uploader
            .run(&plan_for(dir.path(), "/asset.pdf"))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::SiteNotFound(name) if name == "example-site"));
    }

    #[tokio::test]
    async fn site_without_deploys_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path());

        let mut api = FakeApi::new();
        api.deploys = Vec::new();

        let uploader = Uploader::new(&api);
        let err = uploader
            .run(&plan_for(dir.path(), "/asset.pdf"))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::NoDeploys(_)));
    }

    #[tokio::test]
    async fn illegal_destination_aborts_before_deploy_creation() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path());

        let api = FakeApi::new();
        let uploader = Uploader::new(&api);
        let err = uploader
            .run(&plan_for(dir.path(), "asset#1.pdf"))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::InvalidPath { .. }));
        assert!(api.created.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn upload_failure_destroys_the_created_deploy() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path());

        let mut api = FakeApi::new();
        api.fail_upload_for = Some("asset.pdf".into());

        let uploader = Uploader::new(&api);
        let err = uploader
            .run(&plan_for(dir.path(), "/asset.pdf"))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Upload { failed: 1, total: 1 }));
        assert_eq!(api.cancelled.lock().unwrap().as_slice(), &["d-new"]);
        assert_eq!(api.deleted.lock().unwrap().as_slice(), &["d-new"]);
    }

    #[tokio::test]
    async fn partial_upload_failure_reports_totals() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path());
        std::fs::write(dir.path().join("notes.txt"), b"notes").unwrap();

        let mut api = FakeApi::new();
        api.fail_upload_for = Some("notes.txt".into());

        let plan = UploadPlan {
            site_name: "example-site".into(),
            files: vec![
                FileSpec {
                    source: dir.path().join("asset.pdf"),
                    destination: "/asset.pdf".into(),
                },
                FileSpec {
                    source: dir.path().join("notes.txt"),
                    destination: "notes.txt".into(),
                },
            ],
            branch: None,
        };

        let uploader = Uploader::new(&api);
        let err = uploader.run(&plan).await.unwrap_err();

        assert!(matches!(err, UploadError::Upload { failed: 1, total: 2 }));
        // The file that made it through was still recorded.
        assert_eq!(
            *api.uploads.lock().unwrap(),
            vec![("d-new".to_string(), "asset.pdf".to_string())]
        );
    }

    #[tokio::test]
    async fn cancellation_aborts_the_run() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path());

        let api = FakeApi::new();
        let uploader = Uploader::new(&api);
        uploader.cancel_token().cancel();

        let err = uploader
            .run(&plan_for(dir.path(), "/asset.pdf"))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Cancelled));
        assert!(api.created.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn events_trace_the_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path());

        let api = FakeApi::new();
        let mut uploader = Uploader::new(&api);
        let mut events_rx = uploader.take_events().unwrap();

        uploader.run(&plan_for(dir.path(), "/asset.pdf")).await.unwrap();
        drop(uploader);

        let mut events = Vec::new();
        while let Some(event) = events_rx.recv().await {
            events.push(event);
        }

        assert!(events
            .iter()
            .any(|e| matches!(e, UploadEvent::SiteResolved { site_id } if site_id == "example-id")));
        assert!(events
            .iter()
            .any(|e| matches!(e, UploadEvent::DeployCreated { deploy_id } if deploy_id == "d-new")));
        assert!(events
            .iter()
            .any(|e| matches!(e, UploadEvent::FileUploaded { destination } if destination == "asset.pdf")));
        assert!(events
            .iter()
            .any(|e| matches!(e, UploadEvent::Completed { .. })));
    }

    #[test]
    fn take_events_once() {
        let api = FakeApi::new();
        let mut uploader = Uploader::new(&api);
        assert!(uploader.take_events().is_some());
        assert!(uploader.take_events().is_none());
    }
}
