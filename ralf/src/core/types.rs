//! Shared deterministic types for the loop core.
//!
//! These types are the contract between the loop, the agent invoker and the
//! presentation layer. They carry data only and never touch the filesystem.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Supported agent CLIs. Each has a fixed command line and guidance file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolVariant {
    #[default]
    Claude,
    Amp,
}

impl ToolVariant {
    pub const ALL: [ToolVariant; 2] = [ToolVariant::Claude, ToolVariant::Amp];

    pub fn name(self) -> &'static str {
        match self {
            ToolVariant::Claude => "claude",
            ToolVariant::Amp => "amp",
        }
    }
}

impl fmt::Display for ToolVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A tool name outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid tool '{0}': must be 'amp' or 'claude'")]
pub struct UnknownTool(pub String);

impl FromStr for ToolVariant {
    type Err = UnknownTool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolVariant::ALL
            .into_iter()
            .find(|variant| variant.name() == s)
            .ok_or_else(|| UnknownTool(s.to_string()))
    }
}

/// How a single agent invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
    /// The process exited with status zero.
    Success,
    /// Nonzero exit, spawn failure, stdin I/O error, or deadline expiry.
    Failed(String),
}

/// Captured output and outcome of one agent invocation.
///
/// `output` holds whatever was captured, even for failed invocations: an agent
/// may print the completion marker before crashing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub output: String,
    pub outcome: ToolOutcome,
}

/// Status events emitted while a run progresses.
///
/// The presentation layer decides how (and whether) to render each event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    /// The previous run's artifacts were copied to `dir`.
    Archived { previous_branch: String, dir: PathBuf },
    /// Startup reconciliation finished; the loop is about to begin.
    Started {
        tool: String,
        project: String,
        branch: String,
        stories_passing: usize,
        stories_total: usize,
        max_iterations: u32,
    },
    IterationStarted { iteration: u32, max_iterations: u32 },
    IterationFinished {
        iteration: u32,
        elapsed: Duration,
        outcome: ToolOutcome,
    },
    /// The loop is about to sleep before the next iteration.
    WaitStarted { delay: Duration },
    WaitFinished,
    /// The completion marker was seen.
    Completed { iterations: u32, elapsed: Duration },
    /// Every iteration ran without the completion marker.
    Exhausted { max_iterations: u32, elapsed: Duration },
}
