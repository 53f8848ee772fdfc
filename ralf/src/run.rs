//! `ralf run`: load the task spec, reconcile the run directory, then loop.

use anyhow::Context;
use chrono::Local;
use tracing::{info, instrument};

use crate::core::types::RunEvent;
use crate::error::RunError;
use crate::io::init::RunPaths;
use crate::io::lifecycle::reconcile_run;
use crate::io::run_pointer::PointerStore;
use crate::io::task_spec::load_task_spec;
use crate::io::tool::ToolInvoker;
use crate::looping::{LoopConfig, LoopOutcome, run_loop};

/// Run one full session against `paths`.
///
/// The task spec is loaded before anything in the run directory changes, so a
/// missing or malformed `prd.json` leaves the pointer, journal and archive alone.
#[instrument(skip_all, fields(run_dir = %paths.root.display(), tool = tool.name()))]
pub fn execute_run<T, S, F>(
    paths: &RunPaths,
    tool: &T,
    pointer: &S,
    config: &LoopConfig,
    mut on_event: F,
) -> Result<LoopOutcome, RunError>
where
    T: ToolInvoker,
    S: PointerStore,
    F: FnMut(&RunEvent),
{
    let spec = load_task_spec(&paths.task_spec_path).map_err(RunError::TaskSpec)?;

    let reconciled = reconcile_run(paths, pointer, &spec.branch_name, Local::now())
        .with_context(|| format!("prepare run directory {}", paths.root.display()))
        .map_err(RunError::Lifecycle)?;

    if let Some(dir) = reconciled.archive_dir {
        on_event(&RunEvent::Archived {
            previous_branch: reconciled.previous_branch,
            dir,
        });
    }

    info!(branch = %spec.branch_name, stories = spec.stories.len(), "starting loop");
    on_event(&RunEvent::Started {
        tool: tool.name().to_string(),
        project: spec.project.clone(),
        branch: spec.branch_name.clone(),
        stories_passing: spec.passing_stories(),
        stories_total: spec.stories.len(),
        max_iterations: config.max_iterations,
    });

    Ok(run_loop(tool, &paths.root, config, on_event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::completion::COMPLETION_MARKER;
    use crate::io::run_pointer::PointerStore;
    use crate::looping::LoopStop;
    use anyhow::{Result, anyhow};
    use crate::test_support::{MemoryPointerStore, ScriptedTool, TestRunDir};
    use std::fs;
    use std::time::Duration;

    fn config(max_iterations: u32) -> LoopConfig {
        LoopConfig {
            max_iterations,
            delay: Duration::ZERO,
        }
    }

    #[test]
    fn missing_task_spec_is_fatal_and_touches_nothing() {
        let dir = TestRunDir::new().expect("run dir");
        let tool = ScriptedTool::printing(&[]);
        let pointer = MemoryPointerStore::with_branch("ralph/old");

        let err = execute_run(dir.paths(), &tool, &pointer, &config(3), |_| {})
            .expect_err("missing prd.json");

        assert_eq!(err.label(), "task-spec");
        assert!(err.to_string().contains("ralf init"));
        assert_eq!(tool.calls(), 0);
        assert_eq!(pointer.writes(), 0);
        assert!(!dir.paths().journal_path.exists());
    }

    #[test]
    fn malformed_task_spec_is_fatal() {
        let dir = TestRunDir::new().expect("run dir");
        fs::write(&dir.paths().task_spec_path, "{\"userStories\": 3}").expect("write");
        let tool = ScriptedTool::printing(&[]);
        let pointer = MemoryPointerStore::default();

        let err = execute_run(dir.paths(), &tool, &pointer, &config(3), |_| {})
            .expect_err("malformed prd.json");

        assert_eq!(err.label(), "task-spec");
        assert_eq!(tool.calls(), 0);
    }

    #[test]
    fn branch_change_emits_archived_before_started() {
        let dir = TestRunDir::with_task_spec("ralph/new").expect("run dir");
        dir.write_journal("old progress\n").expect("journal");
        let tool = ScriptedTool::printing(&[COMPLETION_MARKER]);
        let pointer = MemoryPointerStore::with_branch("ralph/old");

        let mut events = Vec::new();
        let outcome = execute_run(dir.paths(), &tool, &pointer, &config(3), |event| {
            events.push(event.clone());
        })
        .expect("run");

        assert_eq!(outcome.stop, LoopStop::Complete);
        assert_eq!(pointer.current(), "ralph/new");
        match &events[0] {
            RunEvent::Archived {
                previous_branch,
                dir: archive,
            } => {
                assert_eq!(previous_branch, "ralph/old");
                assert!(archive.join("progress.txt").exists());
            }
            other => panic!("expected Archived, got {other:?}"),
        }
        assert!(matches!(
            &events[1],
            RunEvent::Started {
                stories_passing: 0,
                stories_total: 1,
                max_iterations: 3,
                ..
            }
        ));
    }

    struct ReadOnlyPointer;

    impl PointerStore for ReadOnlyPointer {
        fn read(&self) -> Result<String> {
            Ok(String::new())
        }

        fn write(&self, _branch: &str) -> Result<()> {
            Err(anyhow!("read-only file system"))
        }
    }

    #[test]
    fn pointer_write_failure_aborts_before_any_invocation() {
        let dir = TestRunDir::with_task_spec("ralph/new").expect("run dir");
        let tool = ScriptedTool::printing(&[COMPLETION_MARKER]);

        let err = execute_run(dir.paths(), &tool, &ReadOnlyPointer, &config(3), |_| {})
            .expect_err("pointer write fails");

        assert_eq!(err.label(), "lifecycle");
        assert!(err.to_string().contains("read-only file system"));
        assert_eq!(tool.calls(), 0);
    }

    #[test]
    fn archive_failure_aborts_before_any_invocation() {
        let dir = TestRunDir::with_task_spec("ralph/new").expect("run dir");
        fs::write(&dir.paths().archive_dir, "not a directory").expect("block archive dir");
        let tool = ScriptedTool::printing(&[COMPLETION_MARKER]);
        let pointer = MemoryPointerStore::with_branch("ralph/old");

        let mut events = Vec::new();
        let err = execute_run(dir.paths(), &tool, &pointer, &config(3), |event| {
            events.push(event.clone());
        })
        .expect_err("archive fails");

        assert_eq!(err.label(), "lifecycle");
        assert_eq!(tool.calls(), 0);
        assert!(events.is_empty());
        assert_eq!(pointer.current(), "ralph/old");
    }
}
