//! Child process execution with timeouts and bounded output.
//!
//! [`CommandRunner`] is the seam between the tool pipeline and real process
//! spawning. Tests substitute scripted runners that return canned output.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// One external command to run to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory for the child process.
    pub workdir: PathBuf,
    /// Kill the child if it runs longer than this.
    pub timeout: Duration,
    /// Keep at most this many bytes of each of stdout and stderr.
    pub output_limit_bytes: usize,
}

impl CommandRequest {
    /// `program arg1 arg2`, for messages.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Captured child process output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the child was terminated by a signal.
    pub exit_code: Option<i32>,
    pub success: bool,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    pub fn stderr_truncated_notice(&self, label: &str) -> String {
        if self.stderr_truncated > 0 {
            format!(
                "\n[{label} stderr truncated {} bytes]\n",
                self.stderr_truncated
            )
        } else {
            String::new()
        }
    }
}

/// Abstraction over "run an external command, return exit code and streams".
pub trait CommandRunner {
    /// `Err` means the command could not be run at all (e.g. spawn failure).
    /// A non-zero exit or a timeout is reported through [`CommandOutput`].
    fn run(&self, request: &CommandRequest) -> Result<CommandOutput>;
}

/// Runner that spawns real processes.
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, request: &CommandRequest) -> Result<CommandOutput> {
        let mut cmd = Command::new(&request.program);
        cmd.args(&request.args).current_dir(&request.workdir);
        run_command_with_timeout(cmd, request.timeout, request.output_limit_bytes)
            .with_context(|| format!("run `{}`", request.command_line()))
    }
}

/// Describe why `output` counts as a failed run of `request`.
///
/// Includes the exit code (or timeout) and the trimmed stderr, if any.
pub fn describe_failure(request: &CommandRequest, output: &CommandOutput) -> String {
    let mut reason = if output.timed_out {
        format!(
            "`{}` timed out after {}s",
            request.command_line(),
            request.timeout.as_secs()
        )
    } else {
        match output.exit_code {
            Some(code) => format!("`{}` exited with status {code}", request.command_line()),
            None => format!("`{}` was terminated by a signal", request.command_line()),
        }
    };
    let stderr = output.stderr_text();
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        reason.push_str(": ");
        reason.push_str(stderr);
        reason.push_str(output.stderr_truncated_notice(&request.program).trim_end());
    }
    reason
}

/// How long to keep waiting for output readers once the child has exited and the
/// command deadline has passed.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_millis(500);

type StreamResult = Result<(Vec<u8>, usize)>;

/// Run a command with a timeout and capture stdout/stderr without risking pipe deadlocks.
///
/// Output is read concurrently while the child runs. `output_limit_bytes` bounds the amount of
/// stdout/stderr stored in memory (bytes beyond this are discarded while still draining the pipe).
///
/// Processes started by the child can keep its pipes open after the child itself exits or is
/// killed. Reader results are therefore awaited only until the command deadline plus
/// [`OUTPUT_DRAIN_GRACE`]; a stream still open by then is returned empty.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

    debug!("spawning child process");
    let started = Instant::now();
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdout_rx = spawn_reader(stdout, output_limit_bytes);
    let stderr_rx = spawn_reader(stderr, output_limit_bytes);

    let mut timed_out = false;
    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing"
            );
            timed_out = true;
            child.kill().context("kill command")?;
            child.wait().context("wait command after kill")?
        }
    };

    let drain_deadline = (started + timeout).max(Instant::now()) + OUTPUT_DRAIN_GRACE;
    let (stdout, stdout_truncated) = collect_output(&stdout_rx, drain_deadline, "stdout")?;
    let (stderr, stderr_truncated) = collect_output(&stderr_rx, drain_deadline, "stderr")?;

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        exit_code: status.code(),
        success: status.success() && !timed_out,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
        timed_out,
    })
}

fn spawn_reader<R: Read + Send + 'static>(reader: R, limit: usize) -> Receiver<StreamResult> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        // The receiver is gone once the caller stopped waiting for this stream.
        let _ = tx.send(read_stream_limited(reader, limit));
    });
    rx
}

fn collect_output(rx: &Receiver<StreamResult>, deadline: Instant, stream: &str) -> StreamResult {
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(result) => result.with_context(|| format!("read {stream}")),
        Err(RecvTimeoutError::Timeout) => {
            warn!(stream, "output pipe still held open by a descendant process, giving up");
            Ok((Vec::new(), 0))
        }
        Err(RecvTimeoutError::Disconnected) => Err(anyhow!("{stream} reader thread panicked")),
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(program: &str, args: &[&str], workdir: PathBuf) -> CommandRequest {
        CommandRequest {
            program: program.to_string(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
            workdir,
            timeout: Duration::from_secs(5),
            output_limit_bytes: 1024,
        }
    }

    #[test]
    fn read_stream_limited_counts_truncated_bytes() {
        let input: &[u8] = b"0123456789";
        let (kept, truncated) = read_stream_limited(input, 4).expect("read");
        assert_eq!(kept, b"0123");
        assert_eq!(truncated, 6);
    }

    #[test]
    fn command_line_joins_program_and_args() {
        let req = request("npm", &["install", "--no-audit"], PathBuf::from("."));
        assert_eq!(req.command_line(), "npm install --no-audit");
    }

    #[test]
    fn describe_failure_includes_exit_code_and_stderr() {
        let req = request("npm", &["install"], PathBuf::from("."));
        let output = CommandOutput {
            exit_code: Some(1),
            success: false,
            stdout: b"added 10 packages".to_vec(),
            stderr: b"  ERR! network  \n".to_vec(),
            stdout_truncated: 0,
            stderr_truncated: 0,
            timed_out: false,
        };
        assert_eq!(
            describe_failure(&req, &output),
            "`npm install` exited with status 1: ERR! network"
        );
    }

    #[test]
    fn spawn_failure_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let req = request(
            "scaffold-test-no-such-program",
            &["--version"],
            temp.path().to_path_buf(),
        );
        let err = SystemCommandRunner.run(&req).unwrap_err();
        assert!(format!("{err:#}").contains("scaffold-test-no-such-program"));
    }

    #[cfg(unix)]
    #[test]
    fn captures_streams_separately_in_workdir() {
        let temp = tempfile::tempdir().expect("tempdir");
        let req = request(
            "sh",
            &["-c", "pwd; echo warn >&2"],
            temp.path().to_path_buf(),
        );
        let output = SystemCommandRunner.run(&req).expect("run");

        assert!(output.success);
        assert_eq!(output.exit_code, Some(0));
        let cwd = std::fs::canonicalize(temp.path()).expect("canonicalize");
        assert_eq!(output.stdout_text().trim(), cwd.display().to_string());
        assert_eq!(output.stderr_text().trim(), "warn");
    }

    #[cfg(unix)]
    #[test]
    fn kills_command_after_timeout() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut req = request("sleep", &["5"], temp.path().to_path_buf());
        req.timeout = Duration::from_millis(200);

        let output = SystemCommandRunner.run(&req).expect("run");

        assert!(output.timed_out);
        assert!(!output.success);
    }

    #[cfg(unix)]
    #[test]
    fn timeout_is_not_held_up_by_background_descendants() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut req = request("sh", &["-c", "sleep 6 & sleep 6"], temp.path().to_path_buf());
        req.timeout = Duration::from_millis(300);

        let started = Instant::now();
        let output = SystemCommandRunner.run(&req).expect("run");

        assert!(output.timed_out);
        assert!(!output.success);
        assert!(started.elapsed() < Duration::from_secs(3), "{:?}", started.elapsed());
    }

    #[cfg(unix)]
    #[test]
    fn exited_command_returns_once_descendant_outlives_deadline() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut req = request("sh", &["-c", "sleep 6 &"], temp.path().to_path_buf());
        req.timeout = Duration::from_millis(300);

        let started = Instant::now();
        let output = SystemCommandRunner.run(&req).expect("run");

        assert!(!output.timed_out);
        assert_eq!(output.exit_code, Some(0));
        assert!(started.elapsed() < Duration::from_secs(3), "{:?}", started.elapsed());
    }
}
