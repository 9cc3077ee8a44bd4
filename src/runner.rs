/// External command execution: spawn a child process, capture stdout+stderr
/// interleaved into one buffer, and fail loudly on non-zero exit.
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::ffi::OsString;
use std::fmt;
use std::fs::File;
use std::future::Future;
use std::io::{Read, Seek, SeekFrom};
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;
use tokio::process::{Child, Command};

/// A program plus its arguments, ready to spawn.
///
/// Arguments are kept as `OsString` so paths reach the child byte for byte,
/// UTF-8 or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<OsString>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append a single argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arg_list(&self) -> &[OsString] {
        &self.args
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Split a command string on whitespace (e.g. `"ccache --show-stats"`).
impl FromStr for CommandLine {
    type Err = RunError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let program = parts.next().ok_or(RunError::Empty)?;
        Ok(CommandLine::new(program).args(parts))
    }
}

/// Pre-tokenized form: the first element is the program.
impl TryFrom<Vec<String>> for CommandLine {
    type Error = RunError;

    fn try_from(tokens: Vec<String>) -> Result<Self, Self::Error> {
        let mut tokens = tokens.into_iter();
        let program = tokens.next().ok_or(RunError::Empty)?;
        Ok(CommandLine::new(program).args(tokens))
    }
}

/// Errors that can occur while running an external command.
#[derive(Debug)]
pub enum RunError {
    /// The command line had no program in it.
    Empty,
    /// Failed to spawn the child process (not installed, not executable, ...).
    Spawn {
        program: String,
        source: std::io::Error,
    },
    /// I/O failure while waiting on the child or reading its output.
    Io { source: std::io::Error },
    /// The child outlived the configured timeout; its process group was killed.
    Timeout {
        command: String,
        limit: Duration,
        output: String,
    },
    /// The child exited unsuccessfully (code is None if killed by signal).
    Failed {
        command: String,
        code: Option<i32>,
        output: String,
    },
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Empty => write!(f, "empty command line"),
            RunError::Spawn { program, source } => {
                write!(f, "failed to spawn {program}: {source}")
            }
            RunError::Io { source } => write!(f, "I/O error while running command: {source}"),
            RunError::Timeout { command, limit, .. } => {
                write!(
                    f,
                    "external command timed out after {}s: {command}",
                    limit.as_secs()
                )
            }
            RunError::Failed { command, code, .. } => match code {
                Some(code) => write!(f, "external command failed with exit code {code}: {command}"),
                None => write!(f, "external command killed by signal: {command}"),
            },
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Spawn { source, .. } => Some(source),
            RunError::Io { source } => Some(source),
            RunError::Empty | RunError::Timeout { .. } | RunError::Failed { .. } => None,
        }
    }
}

/// Runs external commands to completion, one at a time.
pub trait CommandRunner {
    /// Run `command` and return its combined stdout+stderr on success.
    fn run(&mut self, command: &CommandLine) -> impl Future<Output = Result<String, RunError>>;
}

/// Runs commands as real child processes.
#[derive(Debug, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    /// `timeout: None` waits on every child indefinitely.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl CommandRunner for ProcessRunner {
    async fn run(&mut self, command: &CommandLine) -> Result<String, RunError> {
        tracing::info!("Executing: {command}");

        // Both streams share one file so the output keeps its write order.
        let mut capture = tempfile::tempfile().map_err(|e| RunError::Io { source: e })?;
        let capture_stdout = capture
            .try_clone()
            .map_err(|e| RunError::Io { source: e })?;
        let capture_stderr = capture
            .try_clone()
            .map_err(|e| RunError::Io { source: e })?;

        let mut builder = Command::new(command.program());
        builder
            .args(command.arg_list())
            .stdout(Stdio::from(capture_stdout))
            .stderr(Stdio::from(capture_stderr))
            .kill_on_drop(true);
        if self.timeout.is_some() {
            // New process group so a timeout can kill the whole build tree.
            // Without a timeout the child stays in ours and still sees Ctrl-C.
            builder.process_group(0);
        }
        let mut child = builder.spawn().map_err(|e| RunError::Spawn {
            program: command.program().to_string(),
            source: e,
        })?;

        tracing::debug!(pid = child.id().unwrap_or(0), "child process started");

        let status = match self.timeout {
            Some(limit) => {
                let waited = tokio::time::timeout(limit, child.wait()).await;
                match waited {
                    Ok(status) => status,
                    Err(_) => {
                        tracing::warn!(limit_secs = limit.as_secs(), "killing timed out command");
                        kill_process_group(&mut child).await;
                        let output = read_capture(&mut capture)?;
                        println!("{output}");
                        return Err(RunError::Timeout {
                            command: command.to_string(),
                            limit,
                            output,
                        });
                    }
                }
            }
            None => child.wait().await,
        }
        .map_err(|e| RunError::Io { source: e })?;

        let output = read_capture(&mut capture)?;

        if !status.success() {
            println!("{output}");
            return Err(RunError::Failed {
                command: command.to_string(),
                code: status.code(),
                output,
            });
        }

        tracing::debug!(bytes = output.len(), "command output:\n{output}");
        Ok(output)
    }
}

/// SIGKILL the child's process group (the child leads it), then reap the
/// child itself.
async fn kill_process_group(child: &mut Child) {
    if let Some(pid) = child.id() {
        if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            tracing::warn!(error = %e, pid, "failed to kill process group");
        }
    }
    if let Err(e) = child.kill().await {
        tracing::warn!(error = %e, "failed to kill timed out command");
    }
}

fn read_capture(file: &mut File) -> Result<String, RunError> {
    let mut bytes = Vec::new();
    file.seek(SeekFrom::Start(0))
        .and_then(|_| file.read_to_end(&mut bytes))
        .map_err(|e| RunError::Io { source: e })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
