//! Upload-to-Netlify action entry point.

mod bridge;
mod config;

use anyhow::Context;
use netlify_upload_actions::{Inputs, Logger};
use netlify_upload_api::Client;
use netlify_upload_deploy::{UploadEvent, UploadPlan, Uploader};
use tracing_subscriber::EnvFilter;

use crate::bridge::NetlifyApi;
use crate::config::RunConfig;

fn main() {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        "starting netlify-upload action"
    );

    let mut logger = Logger::stdout();

    let config = match RunConfig::from_inputs(&Inputs::from_env()) {
        Ok(config) => config,
        Err(e) => {
            logger.error(&capitalize(&format!("{e:#}")));
            std::process::exit(1);
        }
    };

    // Keep the token out of everything the runner captures.
    logger.set_secret(&config.token);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            logger.error(&format!("Could not start async runtime: {e}"));
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(run(config, &mut logger)) {
        logger.error(&capitalize(&format!("{e:#}")));
        std::process::exit(1);
    }
}

async fn run(config: RunConfig, logger: &mut Logger<std::io::Stdout>) -> anyhow::Result<()> {
    let client = Client::new(&config.token)?;
    let api = NetlifyApi::new(client);

    let mut uploader = Uploader::new(&api);
    let mut events_rx = uploader
        .take_events()
        .context("event receiver already taken")?;

    // The runner sends SIGINT when a workflow is cancelled.
    let cancel = uploader.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let names: Vec<String> = config
        .files
        .iter()
        .map(|file| file.source.display().to_string())
        .collect();
    logger.info(&format!(
        "Beginning upload of the following files: {}.",
        names.join(", ")
    ));

    let plan = UploadPlan {
        site_name: config.site_name.clone(),
        files: config.files.clone(),
        branch: None,
    };

    let run_fut = uploader.run(&plan);
    tokio::pin!(run_fut);

    // Render progress while the pipeline runs.
    let outcome = loop {
        tokio::select! {
            result = &mut run_fut => break result,
            Some(event) = events_rx.recv() => render_event(logger, &event),
        }
    };

    // Pick up whatever was emitted after the last await point.
    while let Ok(event) = events_rx.try_recv() {
        render_event(logger, &event);
    }

    outcome?;
    logger.info("Files successfully uploaded to Netlify!");
    Ok(())
}

fn render_event(logger: &mut Logger<std::io::Stdout>, event: &UploadEvent) {
    match event {
        UploadEvent::SiteResolved { site_id } => {
            logger.debug(&format!("Got site ID {site_id}"));
        }
        UploadEvent::WaitingForDeploy { deploy_id, attempt } => {
            logger.debug(&format!(
                "Waiting for deploy {deploy_id} to become ready (attempt {attempt})"
            ));
        }
        UploadEvent::FileHashed {
            destination,
            sha1,
            size,
        } => {
            logger.debug(&format!(
                "Registered file {destination} ({size} bytes, sha1 {sha1})"
            ));
        }
        UploadEvent::DeployCreated { deploy_id } => {
            logger.debug(&format!("Started new deploy with ID {deploy_id}"));
        }
        UploadEvent::FileUploaded { destination } => {
            logger.info(&format!("Uploaded file {destination}"));
        }
        UploadEvent::FileFailed { destination, error } => {
            logger.error(&format!("Could not upload {destination}: {error}"));
        }
        // Terminal events are reported through the run result.
        UploadEvent::Completed { .. } | UploadEvent::Failed { .. } => {}
    }
}

/// Uppercases the first letter of an error message for the annotation.
fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
