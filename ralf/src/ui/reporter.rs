//! Status lines, banner and summaries for `ralf run`.

use std::io::{self, Write};
use std::time::Duration;

use console::{Term, style};
use tracing::debug;

use super::indicator::ActivityIndicator;
use crate::core::types::{RunEvent, ToolOutcome};
use crate::io::init::JOURNAL_FILE;

const BAR_WIDTH: usize = 20;
const LABEL_WIDTH: usize = 12;

const BANNER: &str = r" ________  ________  ___       ________
|\   __  \|\   __  \|\  \     |\  _____\
\ \  \|\  \ \  \|\  \ \  \    \ \  \__/
 \ \   _  _\ \   __  \ \  \    \ \   __\
  \ \  \\  \\ \  \ \  \ \  \____\ \  \_|
   \ \__\\ _\\ \__\ \__\ \_______\ \__\
    \|__|\|__|\|__|\|__|\|_______|\|__|";

/// Renders [`RunEvent`]s as docker-build style status lines.
pub struct Reporter<W: Write> {
    out: W,
    animate: bool,
    indicator: Option<ActivityIndicator>,
}

impl Reporter<io::Stdout> {
    /// Reporter on stdout. The wait spinner only runs on a terminal.
    pub fn stdout() -> Self {
        Self::new(io::stdout(), Term::stdout().is_term())
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, animate: bool) -> Self {
        Self {
            out,
            animate,
            indicator: None,
        }
    }

    /// Render one event. Write errors are logged and otherwise ignored.
    pub fn handle(&mut self, event: &RunEvent) {
        if let Err(err) = self.render(event) {
            debug!(err = %err, "failed to render run event");
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn render(&mut self, event: &RunEvent) -> io::Result<()> {
        match event {
            RunEvent::Archived {
                previous_branch,
                dir,
            } => {
                writeln!(
                    self.out,
                    "{} Archived previous run {} to {}",
                    style("[+]").green(),
                    style(previous_branch).bold(),
                    dir.display()
                )
            }
            RunEvent::Started {
                tool,
                project,
                branch,
                stories_passing,
                stories_total,
                max_iterations,
            } => {
                writeln!(self.out, "\n{}\n", style(BANNER).cyan())?;
                self.field("Tool:", tool)?;
                self.field("Project:", project)?;
                self.field("Branch:", branch)?;
                self.field("Stories:", &format!("{stories_passing}/{stories_total} passing"))?;
                self.field("Max iter:", &max_iterations.to_string())?;
                writeln!(self.out)
            }
            RunEvent::IterationStarted {
                iteration,
                max_iterations,
            } => writeln!(
                self.out,
                "{} {} iteration {iteration}/{max_iterations}",
                style(format!("#{iteration}")).dim(),
                progress_bar(
                    (*iteration as usize).saturating_sub(1),
                    *max_iterations as usize,
                    BAR_WIDTH
                ),
            ),
            RunEvent::IterationFinished {
                iteration,
                elapsed,
                outcome,
            } => {
                let label = format!("iter-{iteration}");
                match outcome {
                    ToolOutcome::Success => self.status(true, &label, "done", Some(*elapsed)),
                    ToolOutcome::Failed(reason) => self.status(
                        false,
                        &label,
                        &format!("{} {reason}", style("warning").yellow()),
                        Some(*elapsed),
                    ),
                }
            }
            RunEvent::WaitStarted { delay } => {
                let message = format!("{} next iteration...", style("waiting").dim());
                if self.animate {
                    self.out.flush()?;
                    self.indicator = Some(ActivityIndicator::start(message));
                    Ok(())
                } else {
                    writeln!(self.out, "  {message} ({})", format_elapsed(*delay))
                }
            }
            RunEvent::WaitFinished => {
                if let Some(indicator) = self.indicator.take() {
                    indicator.stop();
                    writeln!(self.out)?;
                }
                Ok(())
            }
            RunEvent::Completed {
                iterations,
                elapsed,
            } => {
                writeln!(self.out)?;
                self.status(true, "complete", &style("COMPLETE").green().to_string(), None)?;
                writeln!(
                    self.out,
                    "\n {} {}",
                    style("=>").green(),
                    style(format!("finished in {iterations} iterations")).bold()
                )?;
                writeln!(
                    self.out,
                    "    {}\n",
                    style(format!("total time: {}", format_elapsed(*elapsed))).dim()
                )
            }
            RunEvent::Exhausted {
                max_iterations,
                elapsed,
            } => {
                writeln!(self.out)?;
                self.status(
                    false,
                    "incomplete",
                    &style("max iterations reached").yellow().to_string(),
                    None,
                )?;
                writeln!(
                    self.out,
                    "\n {} {}",
                    style("=>").yellow(),
                    style(format!("max iterations reached ({max_iterations})")).bold()
                )?;
                writeln!(
                    self.out,
                    "    {}",
                    style(format!("total time: {}", format_elapsed(*elapsed))).dim()
                )?;
                writeln!(
                    self.out,
                    "    {}\n",
                    style(format!("check {JOURNAL_FILE} for status")).dim()
                )
            }
        }
    }

    fn field(&mut self, name: &str, value: &str) -> io::Result<()> {
        writeln!(self.out, "  {} {value}", style(format!("{name:<10}")).dim())
    }

    fn status(
        &mut self,
        done: bool,
        label: &str,
        status: &str,
        elapsed: Option<Duration>,
    ) -> io::Result<()> {
        let mark = if done {
            style("+").green()
        } else {
            style(">").cyan()
        };
        let elapsed = elapsed
            .map(|elapsed| format!(" {}", style(format_elapsed(elapsed)).dim()))
            .unwrap_or_default();
        writeln!(
            self.out,
            " {mark} {} {status}{elapsed}",
            style(format!("{label:<LABEL_WIDTH$}")).bold()
        )
    }
}

/// Docker-style progress bar, e.g. `[=====>              ]  25%`.
///
/// Returns an empty string when `total` is zero.
pub fn progress_bar(current: usize, total: usize, width: usize) -> String {
    if total == 0 {
        return String::new();
    }
    let filled = (current * width / total).min(width);
    let mut bar = "=".repeat(filled);
    let mut empty = width - filled;
    if filled < width {
        bar.push('>');
        empty -= 1;
    }
    bar.push_str(&" ".repeat(empty));
    format!("[{bar}] {:>3}%", current * 100 / total)
}

/// Duration rounded to whole seconds, e.g. `0s`, `42s`, `1m5s`, `2h0m3s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let mut secs = elapsed.as_secs();
    if elapsed.subsec_millis() >= 500 {
        secs += 1;
    }
    let (hours, minutes, seconds) = (secs / 3600, secs % 3600 / 60, secs % 60);
    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn render(events: &[RunEvent]) -> String {
        let mut reporter = Reporter::new(Vec::new(), false);
        for event in events {
            reporter.handle(event);
        }
        let raw = String::from_utf8(reporter.into_inner()).expect("utf8");
        console::strip_ansi_codes(&raw).into_owned()
    }

    #[test]
    fn progress_bar_matches_docker_style() {
        assert_eq!(progress_bar(0, 4, 8), "[>       ]   0%");
        assert_eq!(progress_bar(2, 4, 8), "[====>   ]  50%");
        assert_eq!(progress_bar(4, 4, 8), "[========] 100%");
        assert_eq!(progress_bar(1, 0, 8), "");
    }

    #[test]
    fn progress_bar_clamps_overflow() {
        assert_eq!(progress_bar(9, 4, 4), "[====] 225%");
    }

    #[test]
    fn elapsed_rounds_to_seconds() {
        assert_eq!(format_elapsed(Duration::from_millis(400)), "0s");
        assert_eq!(format_elapsed(Duration::from_millis(1500)), "2s");
        assert_eq!(format_elapsed(Duration::from_secs(65)), "1m5s");
        assert_eq!(format_elapsed(Duration::from_secs(7203)), "2h0m3s");
    }

    #[test]
    fn banner_lists_run_details() {
        let out = render(&[RunEvent::Started {
            tool: "amp".to_string(),
            project: "Shop".to_string(),
            branch: "ralph/cart".to_string(),
            stories_passing: 2,
            stories_total: 5,
            max_iterations: 7,
        }]);

        assert!(out.contains("Tool:      amp"));
        assert!(out.contains("Project:   Shop"));
        assert!(out.contains("Branch:    ralph/cart"));
        assert!(out.contains("Stories:   2/5 passing"));
        assert!(out.contains("Max iter:  7"));
    }

    #[test]
    fn failed_iteration_is_a_warning_line() {
        let out = render(&[
            RunEvent::IterationStarted {
                iteration: 1,
                max_iterations: 2,
            },
            RunEvent::IterationFinished {
                iteration: 1,
                elapsed: Duration::from_secs(3),
                outcome: ToolOutcome::Failed("claude exited with exit status: 1".to_string()),
            },
        ]);

        assert!(out.contains("#1 [>                   ]   0% iteration 1/2"));
        assert!(out.contains(" > iter-1       warning claude exited with exit status: 1 3s"));
    }

    #[test]
    fn exhaustion_points_at_the_journal() {
        let out = render(&[RunEvent::Exhausted {
            max_iterations: 3,
            elapsed: Duration::from_secs(61),
        }]);

        assert!(out.contains("max iterations reached (3)"));
        assert!(out.contains("total time: 1m1s"));
        assert!(out.contains("check progress.txt for status"));
    }

    #[test]
    fn completion_and_archive_lines() {
        let out = render(&[
            RunEvent::Archived {
                previous_branch: "ralph/old".to_string(),
                dir: PathBuf::from("archive/2026-01-02-old"),
            },
            RunEvent::Completed {
                iterations: 2,
                elapsed: Duration::from_secs(5),
            },
        ]);

        assert!(out.contains("Archived previous run ralph/old to archive/2026-01-02-old"));
        assert!(out.contains(" + complete     COMPLETE"));
        assert!(out.contains("finished in 2 iterations"));
    }

    #[test]
    fn wait_without_terminal_prints_a_plain_line() {
        let out = render(&[
            RunEvent::WaitStarted {
                delay: Duration::from_secs(2),
            },
            RunEvent::WaitFinished,
        ]);

        assert_eq!(out, "  waiting next iteration... (2s)\n");
    }
}
