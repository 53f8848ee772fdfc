//! Fatal error categories reported by the CLI.

use thiserror::Error;

/// A failure that aborts the run with a nonzero exit code.
///
/// Agent failures are not represented here: they are reported per iteration
/// and the loop keeps going.
#[derive(Debug, Error)]
pub enum RunError {
    /// Bad tool name, bad arguments, or an invalid `ralf.toml`.
    #[error("{0:#}")]
    Configuration(anyhow::Error),
    /// Missing or malformed `prd.json`.
    #[error("{0:#}")]
    TaskSpec(anyhow::Error),
    /// Pointer, archive or journal update failed.
    #[error("{0:#}")]
    Lifecycle(anyhow::Error),
}

impl RunError {
    pub fn label(&self) -> &'static str {
        match self {
            RunError::Configuration(_) => "configuration",
            RunError::TaskSpec(_) => "task-spec",
            RunError::Lifecycle(_) => "lifecycle",
        }
    }
}
