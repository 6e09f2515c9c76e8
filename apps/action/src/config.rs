//! Action run configuration.
//!
//! All four step inputs are resolved once at startup into a plain
//! struct, so nothing downstream reads ambient process state.

use std::path::PathBuf;

use anyhow::{Context, ensure};
use netlify_upload_actions::{InputOptions, Inputs};
use netlify_upload_deploy::FileSpec;

/// Everything a run needs, straight from the workflow inputs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub token: String,
    pub site_name: String,
    pub files: Vec<FileSpec>,
}

impl RunConfig {
    /// Builds the configuration from workflow inputs.
    ///
    /// `source-file` and `destination-path` are multiline and must pair
    /// up line by line.
    pub fn from_inputs(inputs: &Inputs) -> anyhow::Result<Self> {
        let opts = InputOptions {
            required: true,
            trim_whitespace: true,
        };

        let token = inputs
            .get("netlify-token", opts)
            .context("a Netlify API token is required")?;
        let site_name = inputs
            .get("site-name", opts)
            .context("the name of the Netlify site is required")?;
        let sources = inputs
            .get_multiline("source-file", opts)
            .context("at least one source file must be given")?;
        let destinations = inputs
            .get_multiline("destination-path", opts)
            .context("at least one destination path must be given")?;

        ensure!(
            sources.len() == destinations.len(),
            "got {} source file(s) but {} destination path(s)",
            sources.len(),
            destinations.len()
        );

        let files = sources
            .into_iter()
            .zip(destinations)
            .map(|(source, destination)| FileSpec {
                source: PathBuf::from(source),
                destination,
            })
            .collect();

        Ok(Self {
            token,
            site_name,
            files,
        })
    }
}
