//! Test doubles and fixtures shared by unit and integration tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::core::types::{Invocation, ToolOutcome};
use crate::io::init::RunPaths;
use crate::io::run_pointer::PointerStore;
use crate::io::task_spec::{TaskSpec, render_task_spec};
use crate::io::tool::ToolInvoker;

/// Successful invocation that printed `output`.
pub fn succeeded(output: &str) -> Invocation {
    Invocation {
        output: output.to_string(),
        outcome: ToolOutcome::Success,
    }
}

/// Failed invocation that printed `output` before failing with `reason`.
pub fn failed(output: &str, reason: &str) -> Invocation {
    Invocation {
        output: output.to_string(),
        outcome: ToolOutcome::Failed(reason.to_string()),
    }
}

/// Tool that replays scripted invocations in order.
///
/// Once the script runs out every call succeeds with empty output.
pub struct ScriptedTool {
    script: RefCell<VecDeque<Invocation>>,
    calls: Cell<u32>,
}

impl ScriptedTool {
    pub fn new(script: Vec<Invocation>) -> Self {
        Self {
            script: RefCell::new(script.into()),
            calls: Cell::new(0),
        }
    }

    /// Successful invocations printing each of `outputs` in turn.
    pub fn printing(outputs: &[&str]) -> Self {
        Self::new(outputs.iter().map(|output| succeeded(output)).collect())
    }

    pub fn calls(&self) -> u32 {
        self.calls.get()
    }
}

impl ToolInvoker for ScriptedTool {
    fn name(&self) -> &str {
        "scripted"
    }

    fn invoke(&self, _run_dir: &Path) -> Invocation {
        self.calls.set(self.calls.get() + 1);
        self.script
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| succeeded(""))
    }
}

/// Run pointer held in memory.
#[derive(Debug, Default)]
pub struct MemoryPointerStore {
    branch: RefCell<String>,
    writes: Cell<u32>,
}

impl MemoryPointerStore {
    pub fn with_branch(branch: &str) -> Self {
        Self {
            branch: RefCell::new(branch.to_string()),
            writes: Cell::new(0),
        }
    }

    pub fn current(&self) -> String {
        self.branch.borrow().clone()
    }

    pub fn writes(&self) -> u32 {
        self.writes.get()
    }
}

impl PointerStore for MemoryPointerStore {
    fn read(&self) -> Result<String> {
        Ok(self.current())
    }

    fn write(&self, branch: &str) -> Result<()> {
        *self.branch.borrow_mut() = branch.to_string();
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

/// Scratch run directory removed on drop.
pub struct TestRunDir {
    _temp: TempDir,
    paths: RunPaths,
}

impl TestRunDir {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("create temp run dir")?;
        let paths = RunPaths::new(temp.path());
        Ok(Self { _temp: temp, paths })
    }

    /// Run directory holding a task spec template for `branch`.
    pub fn with_task_spec(branch: &str) -> Result<Self> {
        let dir = Self::new()?;
        dir.write_task_spec(&TaskSpec::template("TestProject", branch))?;
        Ok(dir)
    }

    pub fn paths(&self) -> &RunPaths {
        &self.paths
    }

    pub fn write_task_spec(&self, spec: &TaskSpec) -> Result<()> {
        self.write(&self.paths.task_spec_path, &render_task_spec(spec)?)
    }

    pub fn write_pointer(&self, branch: &str) -> Result<()> {
        self.write(&self.paths.pointer_path, &format!("{branch}\n"))
    }

    pub fn write_journal(&self, contents: &str) -> Result<()> {
        self.write(&self.paths.journal_path, contents)
    }

    pub fn read(&self, relative: &str) -> Result<String> {
        let path = self.paths.root.join(relative);
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        fs::write(path, contents).with_context(|| format!("write {}", path.display()))
    }
}
