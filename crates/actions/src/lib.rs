//! GitHub Actions host layer.
//!
//! Everything the runner environment provides to an action lives here:
//! step inputs exposed as `INPUT_*` environment variables, and workflow
//! commands written to stdout (`::debug::`, `::error::`, `::add-mask::`
//! and friends). Keeping this in its own crate means the upload logic
//! never touches ambient process state.

pub mod input;
pub mod logger;

pub use input::{InputOptions, Inputs};
pub use logger::Logger;

/// Errors produced while resolving workflow inputs.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("input {0} is required but was not given")]
    Missing(String),
}
