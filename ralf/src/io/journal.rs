//! Progress journal (`progress.txt`) creation and reset.
//!
//! The agent appends its own notes; this module only creates the file with a
//! header or replaces it with a fresh header after an archive.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use tracing::debug;

use super::fs::write_atomic;

pub const JOURNAL_TITLE: &str = "# Ralph Progress Log";

/// Header written to a new or reset journal. The timestamp is RFC 1123.
pub fn journal_header<Tz: TimeZone>(now: &DateTime<Tz>) -> String {
    let started = now
        .with_timezone(&Utc)
        .format("%a, %d %b %Y %H:%M:%S GMT");
    format!("{JOURNAL_TITLE}\nStarted: {started}\n---\n")
}

/// Create the journal if it is missing. Existing content is left untouched.
///
/// Returns `true` when the file was created.
pub fn ensure_journal<Tz: TimeZone>(path: &Path, now: &DateTime<Tz>) -> Result<bool> {
    if path.exists() {
        debug!(path = %path.display(), "journal already present");
        return Ok(false);
    }
    debug!(path = %path.display(), "creating journal");
    write_atomic(path, &journal_header(now))?;
    Ok(true)
}

/// Replace the journal with a fresh header.
pub fn reset_journal<Tz: TimeZone>(path: &Path, now: &DateTime<Tz>) -> Result<()> {
    debug!(path = %path.display(), "resetting journal");
    write_atomic(path, &journal_header(now))
}
