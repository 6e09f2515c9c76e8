//! Workflow input resolution.
//!
//! The runner exposes each step input as an `INPUT_<NAME>` environment
//! variable, with the name uppercased and whitespace replaced by
//! underscores. [`Inputs`] snapshots the environment once at startup so
//! the rest of the program works from plain values instead of ambient
//! process state.

use std::collections::HashMap;

use crate::InputError;

/// Options controlling how an input is resolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputOptions {
    /// Fail with [`InputError::Missing`] when the variable is unset or empty.
    pub required: bool,
    /// Trim surrounding whitespace from the value (each line for multiline).
    pub trim_whitespace: bool,
}

/// A snapshot of the workflow inputs available to this run.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    vars: HashMap<String, String>,
}

impl Inputs {
    /// Captures the current process environment.
    pub fn from_env() -> Self {
        Self {
            vars: std::env::vars()
                .filter(|(key, _)| key.starts_with("INPUT_"))
                .collect(),
        }
    }

    /// Builds an input set from explicit pairs of input name and value.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(name, value)| (env_key(name.as_ref()), value.into()))
                .collect(),
        }
    }

    /// Resolves a single-line input.
    pub fn get(&self, name: &str, options: InputOptions) -> Result<String, InputError> {
        let mut value = self.vars.get(&env_key(name)).cloned().unwrap_or_default();

        if options.required && value.is_empty() {
            return Err(InputError::Missing(name.to_string()));
        }

        if options.trim_whitespace {
            value = value.trim().to_string();
        }

        Ok(value)
    }

    /// Resolves a multiline input, one entry per non-empty line.
    pub fn get_multiline(
        &self,
        name: &str,
        options: InputOptions,
    ) -> Result<Vec<String>, InputError> {
        let value = self.get(
            name,
            InputOptions {
                required: options.required,
                trim_whitespace: false,
            },
        )?;

        let mut lines: Vec<String> = value.split('\n').map(str::to_string).collect();

        if options.trim_whitespace {
            for line in &mut lines {
                *line = line.trim().to_string();
            }
        }

        lines.retain(|line| !line.is_empty());
        Ok(lines)
    }
}

/// Returns the environment variable key for an input name.
fn env_key(name: &str) -> String {
    let normalized: String = name
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    format!("INPUT_{}", normalized.to_uppercase())
}
