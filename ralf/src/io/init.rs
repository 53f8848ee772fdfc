//! Run-directory layout and `ralf init` scaffolding.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::config::{RalfConfig, render_config};
use super::prompt::TemplateEngine;
use super::task_spec::{TaskSpec, render_task_spec};
use crate::core::types::ToolVariant;

pub const TASK_SPEC_FILE: &str = "prd.json";
pub const POINTER_FILE: &str = ".last-branch";
pub const JOURNAL_FILE: &str = "progress.txt";
pub const ARCHIVE_DIR: &str = "archive";
pub const CONFIG_FILE: &str = "ralf.toml";
pub const AGENTS_FILE: &str = "AGENTS.md";

/// Canonical paths within a run directory.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub task_spec_path: PathBuf,
    pub pointer_path: PathBuf,
    pub journal_path: PathBuf,
    pub archive_dir: PathBuf,
    pub config_path: PathBuf,
    pub agents_path: PathBuf,
}

impl RunPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            task_spec_path: root.join(TASK_SPEC_FILE),
            pointer_path: root.join(POINTER_FILE),
            journal_path: root.join(JOURNAL_FILE),
            archive_dir: root.join(ARCHIVE_DIR),
            config_path: root.join(CONFIG_FILE),
            agents_path: root.join(AGENTS_FILE),
            root,
        }
    }

    /// Guidance file piped to `variant` on every iteration.
    pub fn guidance_path(&self, variant: ToolVariant) -> PathBuf {
        self.root.join(guidance_file(variant))
    }
}

/// File name of the guidance file for `variant`.
pub fn guidance_file(variant: ToolVariant) -> &'static str {
    match variant {
        ToolVariant::Claude => "CLAUDE.md",
        ToolVariant::Amp => "prompt.md",
    }
}

/// Options for `init_run_dir`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite existing files.
    pub force: bool,
    /// Project name written to a new task spec.
    pub project: String,
    /// Branch name written to a new task spec.
    pub branch: String,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            force: false,
            project: "MyProject".to_string(),
            branch: "ralph/feature".to_string(),
        }
    }
}

/// Files touched by `init_run_dir`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

/// Scaffold the task spec, guidance files, agent notes and config in `root`.
///
/// Existing files are kept unless `options.force` is set. The run pointer,
/// journal and archive are never touched.
pub fn init_run_dir(root: &Path, options: &InitOptions) -> Result<InitReport> {
    let paths = RunPaths::new(root);
    fs::create_dir_all(&paths.root)
        .with_context(|| format!("create directory {}", paths.root.display()))?;

    let engine = TemplateEngine::new()?;
    let mut files = vec![(
        paths.task_spec_path.clone(),
        render_task_spec(&TaskSpec::template(&options.project, &options.branch))?,
    )];
    for variant in ToolVariant::ALL {
        files.push((
            paths.guidance_path(variant),
            engine.render_guidance(variant)?,
        ));
    }
    files.push((paths.agents_path.clone(), engine.render_agents()?));
    files.push((paths.config_path.clone(), render_config(&RalfConfig::default())?));

    let mut report = InitReport::default();
    for (path, contents) in files {
        if path.exists() && !options.force {
            debug!(path = %path.display(), "keeping existing file");
            report.skipped.push(path);
            continue;
        }
        fs::write(&path, contents).with_context(|| format!("write file {}", path.display()))?;
        info!(path = %path.display(), "initialized");
        report.written.push(path);
    }
    Ok(report)
}
