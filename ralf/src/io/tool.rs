//! Agent invocation behind the [`ToolInvoker`] seam.
//!
//! [`AgentTool`] spawns one of the supported agent CLIs. Tests use scripted
//! invokers that return predetermined output without spawning processes.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process::Command;

use tracing::{debug, info, instrument, warn};

use super::init::guidance_file;
use super::process::{CaptureSettings, CapturedOutput, run_captured};
use crate::core::types::{Invocation, ToolOutcome, ToolVariant};

/// Runs an agent once against a run directory.
pub trait ToolInvoker {
    /// Name shown in status output.
    fn name(&self) -> &str;

    /// Run the agent in `run_dir` and return everything it printed.
    ///
    /// Never fails: problems are reported through [`ToolOutcome::Failed`].
    fn invoke(&self, run_dir: &Path) -> Invocation;
}

/// Fixed command line and guidance file of one agent CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// File in the run directory piped to the agent's stdin.
    pub guidance_file: String,
}

impl CommandSpec {
    pub fn for_variant(variant: ToolVariant) -> Self {
        let (program, args): (&str, &[&str]) = match variant {
            ToolVariant::Claude => ("claude", &["--dangerously-skip-permissions", "--print"]),
            ToolVariant::Amp => ("amp", &["--dangerously-allow-all"]),
        };
        Self {
            program: program.to_string(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
            guidance_file: guidance_file(variant).to_string(),
        }
    }
}

/// Production invoker: spawns the agent CLI for a [`ToolVariant`], forwarding
/// its output to this process's stderr.
#[derive(Debug, Clone)]
pub struct AgentTool {
    variant: ToolVariant,
    spec: CommandSpec,
    settings: CaptureSettings,
}

impl AgentTool {
    pub fn new(variant: ToolVariant, settings: CaptureSettings) -> Self {
        Self {
            variant,
            spec: CommandSpec::for_variant(variant),
            settings,
        }
    }
}

impl ToolInvoker for AgentTool {
    fn name(&self) -> &str {
        self.variant.name()
    }

    fn invoke(&self, run_dir: &Path) -> Invocation {
        let mut stderr = io::stderr().lock();
        invoke_command(&self.spec, run_dir, &self.settings, &mut stderr)
    }
}

/// Spawn `spec` in `run_dir` with its guidance file on stdin.
#[instrument(skip_all, fields(program = %spec.program, run_dir = %run_dir.display()))]
pub fn invoke_command<W: Write>(
    spec: &CommandSpec,
    run_dir: &Path,
    settings: &CaptureSettings,
    echo: &mut W,
) -> Invocation {
    let guidance_path = run_dir.join(&spec.guidance_file);
    let input = match fs::read(&guidance_path) {
        Ok(input) => input,
        Err(e) => {
            warn!(path = %guidance_path.display(), err = %e, "cannot read guidance file");
            return Invocation {
                output: String::new(),
                outcome: ToolOutcome::Failed(format!(
                    "failed to read {}: {e}",
                    spec.guidance_file
                )),
            };
        }
    };

    info!(input_bytes = input.len(), "starting agent");
    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args).current_dir(run_dir);

    match run_captured(cmd, input, settings, echo) {
        Ok(captured) => {
            let outcome = classify(&spec.program, &captured, settings);
            debug!(?outcome, "agent finished");
            Invocation {
                output: String::from_utf8_lossy(&captured.output).into_owned(),
                outcome,
            }
        }
        Err(e) => Invocation {
            output: String::new(),
            outcome: ToolOutcome::Failed(format!("failed to run {}: {e:#}", spec.program)),
        },
    }
}

fn classify(program: &str, captured: &CapturedOutput, settings: &CaptureSettings) -> ToolOutcome {
    if captured.timed_out {
        let secs = settings.timeout.map(|t| t.as_secs()).unwrap_or_default();
        return ToolOutcome::Failed(format!("{program} timed out after {secs}s"));
    }
    if let Some(err) = &captured.stdin_error {
        return ToolOutcome::Failed(format!("{program}: {err}"));
    }
    if !captured.status.success() {
        return ToolOutcome::Failed(format!("{program} exited with {}", captured.status));
    }
    ToolOutcome::Success
}
