//! Configuration: built-in defaults, optional `ralf.toml`, then CLI overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::budget::{DEFAULT_MAX_ITERATIONS, resolve_iteration_budget};
use crate::core::types::ToolVariant;

/// Default bound on captured agent output kept in memory per iteration.
pub const DEFAULT_OUTPUT_LIMIT_BYTES: usize = 8 * 1024 * 1024;

/// Run-directory configuration (`ralf.toml`).
///
/// Missing fields default to the values the CLI uses without a config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RalfConfig {
    /// Agent CLI to drive: `claude` or `amp`.
    pub tool: String,

    /// Iterations to attempt before giving up.
    pub max_iterations: u32,

    /// Keep at most this many trailing bytes of agent output per iteration.
    pub output_limit_bytes: usize,

    /// Kill the agent after this many seconds. Unset means wait indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_timeout_secs: Option<u64>,
}

impl Default for RalfConfig {
    fn default() -> Self {
        Self {
            tool: ToolVariant::default().name().to_string(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            output_limit_bytes: DEFAULT_OUTPUT_LIMIT_BYTES,
            agent_timeout_secs: None,
        }
    }
}

impl RalfConfig {
    pub fn validate(&self) -> Result<()> {
        self.tool.parse::<ToolVariant>()?;
        if self.max_iterations == 0 {
            return Err(anyhow!("max_iterations must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.agent_timeout_secs == Some(0) {
            return Err(anyhow!("agent_timeout_secs must be > 0 when set"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `RalfConfig::default()`.
pub fn load_config(path: &Path) -> Result<RalfConfig> {
    if !path.exists() {
        return Ok(RalfConfig::default());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RalfConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid {}", path.display()))?;
    Ok(cfg)
}

/// Serialize config to TOML with trailing newline.
pub fn render_config(cfg: &RalfConfig) -> Result<String> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    if !buf.ends_with('\n') {
        buf.push('\n');
    }
    Ok(buf)
}

/// Command-line values layered over the config file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides<'a> {
    /// `--tool` value, if given.
    pub tool: Option<&'a str>,
    /// Positional budget arguments; invalid ones are ignored.
    pub max_iterations: &'a [String],
}

/// Configuration consumed by the run orchestration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub tool: ToolVariant,
    pub max_iterations: u32,
    pub run_dir: PathBuf,
    pub output_limit_bytes: usize,
    pub agent_timeout: Option<Duration>,
}

impl ResolvedConfig {
    /// Merge `file` and `overrides`. Unknown tool names are rejected here, before
    /// anything in the run directory is touched.
    pub fn resolve(
        run_dir: PathBuf,
        file: &RalfConfig,
        overrides: &CliOverrides<'_>,
    ) -> Result<Self> {
        let tool_name = overrides.tool.unwrap_or(&file.tool);
        let tool = tool_name.parse::<ToolVariant>()?;
        Ok(Self {
            tool,
            max_iterations: resolve_iteration_budget(overrides.max_iterations, file.max_iterations),
            run_dir,
            output_limit_bytes: file.output_limit_bytes,
            agent_timeout: file.agent_timeout_secs.map(Duration::from_secs),
        })
    }
}
