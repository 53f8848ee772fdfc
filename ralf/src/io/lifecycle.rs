//! Startup reconciliation of the run pointer, archive and journal.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing::{debug, info, instrument};

use super::fs::copy_into;
use super::init::RunPaths;
use super::journal::{ensure_journal, reset_journal};
use super::run_pointer::PointerStore;
use crate::core::archive::{archive_dir_name, should_archive};

/// What [`reconcile_run`] did to the run directory.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReconcileOutcome {
    /// Branch recorded by the previous run, empty when none was recorded.
    pub previous_branch: String,
    /// Archive directory created for the previous run, if any.
    pub archive_dir: Option<PathBuf>,
    pub journal_created: bool,
}

/// Reconcile the run directory with the branch about to run.
///
/// Archives the previous run when its branch differs from `new_branch`, records
/// `new_branch` in the pointer when non-empty, and makes sure the journal exists.
/// Every failure is fatal; nothing here is retried.
#[instrument(skip_all, fields(run_dir = %paths.root.display(), new_branch = %new_branch))]
pub fn reconcile_run<S: PointerStore>(
    paths: &RunPaths,
    pointer: &S,
    new_branch: &str,
    now: DateTime<Local>,
) -> Result<ReconcileOutcome> {
    let previous_branch = pointer.read().context("read run pointer")?;
    let task_spec_exists = paths.task_spec_path.exists();
    debug!(previous_branch, task_spec_exists, "read run pointer");

    let archive_dir = if should_archive(&previous_branch, new_branch, task_spec_exists) {
        Some(archive_previous_run(paths, &previous_branch, &now)?)
    } else {
        None
    };

    if !new_branch.is_empty() {
        pointer.write(new_branch).context("write run pointer")?;
    }

    let journal_created = ensure_journal(&paths.journal_path, &now)
        .with_context(|| format!("initialize {}", paths.journal_path.display()))?;

    Ok(ReconcileOutcome {
        previous_branch,
        archive_dir,
        journal_created,
    })
}

fn archive_previous_run(
    paths: &RunPaths,
    previous_branch: &str,
    now: &DateTime<Local>,
) -> Result<PathBuf> {
    let name = archive_dir_name(now.date_naive(), previous_branch);
    let dir = create_fresh_dir(&paths.archive_dir, &name)?;
    info!(dir = %dir.display(), previous_branch, "archiving previous run");

    copy_into(&paths.task_spec_path, &dir)?;
    if paths.journal_path.exists() {
        copy_into(&paths.journal_path, &dir)?;
    }
    reset_journal(&paths.journal_path, now)
        .with_context(|| format!("reset {}", paths.journal_path.display()))?;
    Ok(dir)
}

/// Create `parent/name`, or `parent/name-2`, `-3`, ... when earlier archives
/// already took the name.
fn create_fresh_dir(parent: &Path, name: &str) -> Result<PathBuf> {
    fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    let mut attempt = 1u32;
    loop {
        let dir = if attempt == 1 {
            parent.join(name)
        } else {
            parent.join(format!("{name}-{attempt}"))
        };
        match fs::create_dir(&dir) {
            Ok(()) => return Ok(dir),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                debug!(dir = %dir.display(), "archive directory taken");
                attempt += 1;
            }
            Err(err) => return Err(err).with_context(|| format!("create {}", dir.display())),
        }
    }
}
