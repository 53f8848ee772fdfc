//! Spinner shown while the loop waits between iterations.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const TICK: Duration = Duration::from_millis(80);
const FRAMES: [&str; 11] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", " "];

/// A spinner redrawn every 80 ms by `indicatif`'s ticker thread.
///
/// The control thread talks to it only through [`update`](Self::update) and
/// [`stop`](Self::stop); `stop` clears the line and joins the ticker so no frame
/// is drawn after it returns. Dropping the indicator stops it as well.
pub struct ActivityIndicator {
    bar: ProgressBar,
}

impl ActivityIndicator {
    /// Start a spinner on stdout.
    pub fn start(message: impl Into<String>) -> Self {
        Self::start_with(ProgressDrawTarget::stdout(), message)
    }

    pub fn start_with(target: ProgressDrawTarget, message: impl Into<String>) -> Self {
        let bar = ProgressBar::with_draw_target(None, target);
        bar.set_style(spinner_style());
        bar.set_message(message.into());
        bar.enable_steady_tick(TICK);
        Self { bar }
    }

    /// Replace the message shown next to the spinner.
    pub fn update(&self, message: impl Into<String>) {
        self.bar.set_message(message.into());
    }

    /// Clear the spinner line and wait for the ticker to exit.
    pub fn stop(self) {
        self.shutdown();
    }

    fn shutdown(&self) {
        if self.bar.is_finished() {
            return;
        }
        self.bar.disable_steady_tick();
        self.bar.finish_and_clear();
    }
}

impl Drop for ActivityIndicator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&FRAMES)
}
