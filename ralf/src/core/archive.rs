//! Archive decision for branch transitions between runs.

use chrono::NaiveDate;

/// Branch prefix stripped from archive directory names.
pub const KNOWN_BRANCH_PREFIX: &str = "ralph/";

/// Decide whether the previous run's artifacts must be archived.
///
/// Archives only when a previous branch was recorded, it differs from the branch
/// about to run, and there is a task spec to preserve.
pub fn should_archive(persisted_branch: &str, new_branch: &str, task_spec_exists: bool) -> bool {
    !persisted_branch.is_empty() && persisted_branch != new_branch && task_spec_exists
}

/// Name of the archive directory for `previous_branch` on `date`
/// (`YYYY-MM-DD-<branch>`, known prefix removed).
///
/// Path separators in the branch become `-`, so the name is always a single
/// path component inside the archive directory.
pub fn archive_dir_name(date: NaiveDate, previous_branch: &str) -> String {
    let branch = previous_branch
        .strip_prefix(KNOWN_BRANCH_PREFIX)
        .unwrap_or(previous_branch)
        .replace(['/', '\\'], "-");
    format!("{}-{}", date.format("%Y-%m-%d"), branch)
}
