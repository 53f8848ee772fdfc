//! Child process execution with live forwarding and bounded combined capture.

use std::io::{ErrorKind, Read, Write};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// How long output is still drained after a timed-out child was killed.
const KILL_GRACE: Duration = Duration::from_millis(500);

/// Limits applied to a captured child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSettings {
    /// Keep at most this many trailing bytes of combined output.
    pub output_limit_bytes: usize,
    /// Kill the child once this much time has passed. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

/// Combined stdout/stderr of a finished child process.
#[derive(Debug)]
pub struct CapturedOutput {
    pub status: ExitStatus,
    /// Trailing bytes of stdout and stderr, interleaved in arrival order.
    pub output: Vec<u8>,
    /// Bytes dropped from the front of `output` to respect the limit.
    pub truncated: usize,
    pub timed_out: bool,
    /// Set when the input could not be fully written to the child's stdin.
    pub stdin_error: Option<String>,
}

/// Run `cmd`, write `input` to its stdin once and close it, and collect stdout and
/// stderr into one buffer while forwarding every chunk to `echo` as it arrives.
///
/// Each pipe is drained by its own reader thread so the child never blocks on a
/// full pipe; the calling thread merges chunks in arrival order. Only spawn and
/// wait failures are errors: stdin failures and timeouts are reported in the
/// returned [`CapturedOutput`]. After a timeout kill, output is drained for a
/// short grace period and then abandoned, so descendants that inherited the
/// pipes cannot hold the call open.
#[instrument(skip_all, fields(output_limit_bytes = settings.output_limit_bytes, timeout_secs = settings.timeout.map(|t| t.as_secs())))]
pub fn run_captured<W: Write>(
    mut cmd: Command,
    input: Vec<u8>,
    settings: &CaptureSettings,
    echo: &mut W,
) -> Result<CapturedOutput> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };
    let deadline = settings.timeout.map(|timeout| Instant::now() + timeout);

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;
    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("stdin was not piped"))?;

    let (tx, rx) = mpsc::channel::<Vec<u8>>();
    let stdout_handle = spawn_reader(stdout, tx.clone());
    let stderr_handle = spawn_reader(stderr, tx);
    let stdin_handle = thread::spawn(move || feed_stdin(stdin, &input));

    let mut capture = TailBuffer::new(settings.output_limit_bytes);
    let mut timed_out = false;
    let mut drain_deadline = None;
    loop {
        let wait_until = match (deadline, drain_deadline) {
            (_, Some(drain)) => Some(drain),
            (Some(deadline), None) => Some(deadline),
            (None, None) => None,
        };
        let chunk = match wait_until {
            Some(until) => {
                let remaining = until.saturating_duration_since(Instant::now());
                match rx.recv_timeout(remaining) {
                    Ok(chunk) => chunk,
                    Err(RecvTimeoutError::Timeout) if timed_out => {
                        warn!("output pipes still open after kill, detaching readers");
                        break;
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        timed_out = true;
                        kill_on_timeout(&mut child, settings.timeout);
                        drain_deadline = Some(Instant::now() + KILL_GRACE);
                        continue;
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match rx.recv() {
                Ok(chunk) => chunk,
                Err(_) => break,
            },
        };
        if let Err(e) = echo.write_all(&chunk).and_then(|()| echo.flush()) {
            warn!(err = %e, "failed to forward child output");
        }
        capture.push(&chunk);
    }

    // Processes started by a killed child may keep the pipes open; their
    // reader and writer threads are left behind instead of joined.
    if !timed_out || stdout_handle.is_finished() {
        join_reader(stdout_handle).context("join stdout")?;
    }
    if !timed_out || stderr_handle.is_finished() {
        join_reader(stderr_handle).context("join stderr")?;
    }
    let stdin_error = if !timed_out || stdin_handle.is_finished() {
        match stdin_handle.join() {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(format!("{e:#}")),
            Err(_) => Some("stdin writer thread panicked".to_string()),
        }
    } else {
        None
    };
    if let Some(err) = &stdin_error {
        warn!(err = %err, "failed to feed child stdin");
    }

    let status = match deadline {
        Some(deadline) if !timed_out => {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match child.wait_timeout(remaining).context("wait for command")? {
                Some(status) => status,
                None => {
                    timed_out = true;
                    kill_on_timeout(&mut child, settings.timeout);
                    child.wait().context("wait command after kill")?
                }
            }
        }
        _ => child.wait().context("wait for command")?,
    };

    let (output, truncated) = capture.finish();
    if truncated > 0 {
        warn!(truncated, "captured output truncated");
    }
    debug!(exit_code = ?status.code(), timed_out, bytes = output.len(), "command finished");
    Ok(CapturedOutput {
        status,
        output,
        truncated,
        timed_out,
        stdin_error,
    })
}

fn kill_on_timeout(child: &mut Child, timeout: Option<Duration>) {
    warn!(
        timeout_secs = timeout.map(|t| t.as_secs()),
        "command timed out, killing"
    );
    if let Err(e) = child.kill() {
        warn!(err = %e, "failed to kill command");
    }
}

/// Write the whole input, then drop the pipe to signal end-of-input.
fn feed_stdin(mut stdin: ChildStdin, input: &[u8]) -> Result<()> {
    stdin.write_all(input).context("write stdin")?;
    stdin.flush().context("flush stdin")?;
    Ok(())
}

fn spawn_reader<R: Read + Send + 'static>(
    mut reader: R,
    tx: Sender<Vec<u8>>,
) -> JoinHandle<Result<()>> {
    thread::spawn(move || {
        let mut chunk = [0u8; 8192];
        loop {
            let n = match reader.read(&mut chunk) {
                Ok(0) => return Ok(()),
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).context("read output"),
            };
            if tx.send(chunk[..n].to_vec()).is_err() {
                return Ok(());
            }
        }
    })
}

fn join_reader(handle: JoinHandle<Result<()>>) -> Result<()> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

/// Byte buffer that keeps only the most recent `limit` bytes.
///
/// Compaction is deferred until the buffer holds twice the limit so appends
/// stay amortized O(1).
struct TailBuffer {
    buf: Vec<u8>,
    limit: usize,
    dropped: usize,
}

impl TailBuffer {
    fn new(limit: usize) -> Self {
        Self {
            buf: Vec::new(),
            limit,
            dropped: 0,
        }
    }

    fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
        if self.buf.len() > self.limit.saturating_mul(2) {
            self.compact();
        }
    }

    fn compact(&mut self) {
        if self.buf.len() > self.limit {
            let excess = self.buf.len() - self.limit;
            self.buf.drain(..excess);
            self.dropped += excess;
        }
    }

    fn finish(mut self) -> (Vec<u8>, usize) {
        self.compact();
        (self.buf, self.dropped)
    }
}
