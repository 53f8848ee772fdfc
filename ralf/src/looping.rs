//! Bounded iteration loop: rerun the agent until it reports completion.

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use crate::core::budget::DEFAULT_MAX_ITERATIONS;
use crate::core::completion::contains_completion;
use crate::core::types::{RunEvent, ToolOutcome};
use crate::exit_codes;
use crate::io::tool::ToolInvoker;

/// Pause between two iterations.
pub const INTER_ITERATION_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopConfig {
    /// Upper bound on agent invocations. Always positive.
    pub max_iterations: u32,
    pub delay: Duration,
}

impl LoopConfig {
    pub fn new(max_iterations: u32) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
            delay: INTER_ITERATION_DELAY,
        }
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITERATIONS)
    }
}

/// Reason why `run_loop` stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStop {
    /// The agent printed the completion marker.
    Complete,
    /// Every iteration ran without the completion marker.
    Exhausted,
}

impl LoopStop {
    pub fn exit_code(self) -> i32 {
        match self {
            LoopStop::Complete => exit_codes::OK,
            LoopStop::Exhausted => exit_codes::INCOMPLETE,
        }
    }
}

/// Summary of a loop invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOutcome {
    /// Number of agent invocations performed.
    pub iterations: u32,
    pub elapsed: Duration,
    pub stop: LoopStop,
}

/// Invoke `tool` in `run_dir` until its output contains the completion marker
/// or `config.max_iterations` invocations have run.
///
/// Failed invocations are reported through `on_event` and do not stop the loop;
/// their output is still checked for the marker.
#[instrument(skip_all, fields(tool = tool.name(), max_iterations = config.max_iterations))]
pub fn run_loop<T: ToolInvoker, F: FnMut(&RunEvent)>(
    tool: &T,
    run_dir: &Path,
    config: &LoopConfig,
    mut on_event: F,
) -> LoopOutcome {
    let started = Instant::now();
    let max_iterations = config.max_iterations.max(1);

    for iteration in 1..=max_iterations {
        on_event(&RunEvent::IterationStarted {
            iteration,
            max_iterations,
        });

        let iteration_started = Instant::now();
        let invocation = tool.invoke(run_dir);
        let elapsed = iteration_started.elapsed();
        if let ToolOutcome::Failed(reason) = &invocation.outcome {
            warn!(iteration, reason = %reason, "agent invocation failed");
        }
        debug!(iteration, output_bytes = invocation.output.len(), "iteration finished");
        on_event(&RunEvent::IterationFinished {
            iteration,
            elapsed,
            outcome: invocation.outcome,
        });

        if contains_completion(&invocation.output) {
            let elapsed = started.elapsed();
            info!(iteration, "completion marker detected");
            on_event(&RunEvent::Completed {
                iterations: iteration,
                elapsed,
            });
            return LoopOutcome {
                iterations: iteration,
                elapsed,
                stop: LoopStop::Complete,
            };
        }

        if iteration < max_iterations {
            on_event(&RunEvent::WaitStarted {
                delay: config.delay,
            });
            if !config.delay.is_zero() {
                thread::sleep(config.delay);
            }
            on_event(&RunEvent::WaitFinished);
        }
    }

    let elapsed = started.elapsed();
    info!("iteration budget exhausted");
    on_event(&RunEvent::Exhausted {
        max_iterations,
        elapsed,
    });
    LoopOutcome {
        iterations: max_iterations,
        elapsed,
        stop: LoopStop::Exhausted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::completion::COMPLETION_MARKER;
    use crate::test_support::{ScriptedTool, failed};

    fn config(max_iterations: u32) -> LoopConfig {
        LoopConfig {
            max_iterations,
            delay: Duration::ZERO,
        }
    }

    fn collect(tool: &ScriptedTool, max_iterations: u32) -> (LoopOutcome, Vec<RunEvent>) {
        let mut events = Vec::new();
        let outcome = run_loop(tool, Path::new("."), &config(max_iterations), |event| {
            events.push(event.clone());
        });
        (outcome, events)
    }

    #[test]
    fn exhausts_budget_without_marker() {
        let tool = ScriptedTool::printing(&["working", "still working", "nearly"]);
        let (outcome, events) = collect(&tool, 3);

        assert_eq!(tool.calls(), 3);
        assert_eq!(outcome.stop, LoopStop::Exhausted);
        assert_eq!(outcome.iterations, 3);
        assert_eq!(outcome.stop.exit_code(), 1);
        let waits = events
            .iter()
            .filter(|event| matches!(event, RunEvent::WaitStarted { .. }))
            .count();
        assert_eq!(waits, 2);
        assert!(matches!(
            events.last(),
            Some(RunEvent::Exhausted {
                max_iterations: 3,
                ..
            })
        ));
    }

    #[test]
    fn stops_on_marker_without_waiting_after_it() {
        let done = format!("all stories pass\n{COMPLETION_MARKER}\n");
        let tool = ScriptedTool::printing(&["first pass", done.as_str(), "never used"]);
        let (outcome, events) = collect(&tool, 5);

        assert_eq!(tool.calls(), 2);
        assert_eq!(outcome.stop, LoopStop::Complete);
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.stop.exit_code(), 0);

        let tail: Vec<_> = events.iter().rev().take(2).collect();
        assert!(matches!(tail[0], RunEvent::Completed { iterations: 2, .. }));
        assert!(matches!(
            tail[1],
            RunEvent::IterationFinished { iteration: 2, .. }
        ));
    }

    #[test]
    fn failed_invocation_with_marker_completes() {
        let tool = ScriptedTool::new(vec![failed(COMPLETION_MARKER, "exit status: 1")]);
        let (outcome, events) = collect(&tool, 4);

        assert_eq!(tool.calls(), 1);
        assert_eq!(outcome.stop, LoopStop::Complete);
        assert!(events.iter().any(|event| matches!(
            event,
            RunEvent::IterationFinished {
                outcome: ToolOutcome::Failed(_),
                ..
            }
        )));
    }

    #[test]
    fn failed_invocations_do_not_stop_the_loop() {
        let tool = ScriptedTool::new(vec![
            failed("", "spawn failed"),
            failed("", "spawn failed"),
        ]);
        let (outcome, _) = collect(&tool, 2);

        assert_eq!(tool.calls(), 2);
        assert_eq!(outcome.stop, LoopStop::Exhausted);
    }

    #[test]
    fn single_iteration_budget_never_waits() {
        let tool = ScriptedTool::printing(&["nothing"]);
        let (_, events) = collect(&tool, 1);

        assert!(
            !events
                .iter()
                .any(|event| matches!(event, RunEvent::WaitStarted { .. }))
        );
    }

    #[test]
    fn events_follow_iteration_order() {
        let tool = ScriptedTool::printing(&["a", "b"]);
        let (_, events) = collect(&tool, 2);

        let kinds: Vec<&str> = events
            .iter()
            .map(|event| match event {
                RunEvent::IterationStarted { .. } => "start",
                RunEvent::IterationFinished { .. } => "finish",
                RunEvent::WaitStarted { .. } => "wait",
                RunEvent::WaitFinished => "resume",
                RunEvent::Exhausted { .. } => "exhausted",
                _ => "other",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["start", "finish", "wait", "resume", "start", "finish", "exhausted"]
        );
    }

    #[test]
    fn default_config_uses_fixed_delay() {
        let config = LoopConfig::default();
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.delay, Duration::from_secs(2));
        assert_eq!(LoopConfig::new(0).max_iterations, 1);
    }
}
