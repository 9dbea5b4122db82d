//! External command execution
//!
//! Every pipeline step that shells out goes through a [`CommandRunner`].
//! [`ShellRunner`] runs the command with `sh -c` in the target directory and
//! streams stdout and stderr line by line while keeping the last lines for
//! the error report. There is no timeout.

use crate::error::{InstallerError, Result};
use async_trait::async_trait;
use colored::Colorize;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command as TokioCommand;

/// Lines of output kept for an error report
pub const DEFAULT_TAIL_LINES: usize = 20;

/// Runs one external step to completion
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` in `cwd`; a spawn error or non-zero exit is `ExternalCommandFailed`
    async fn run(&self, step: &str, command: &str, cwd: &Path) -> Result<()>;
}

/// Bounded buffer of the most recent output lines
#[derive(Debug, Default)]
struct OutputTail {
    lines: VecDeque<String>,
    limit: usize,
}

impl OutputTail {
    fn new(limit: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(limit),
            limit,
        }
    }

    fn push(&mut self, line: String) {
        if self.limit == 0 {
            return;
        }
        if self.lines.len() == self.limit {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    fn into_vec(self) -> Vec<String> {
        self.lines.into()
    }
}

/// Runs commands through `sh -c`, streaming their output to the terminal
#[derive(Debug, Clone)]
pub struct ShellRunner {
    extra_path: Vec<PathBuf>,
    tail_lines: usize,
    echo: bool,
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self {
            extra_path: Vec::new(),
            tail_lines: DEFAULT_TAIL_LINES,
            echo: true,
        }
    }
}

impl ShellRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner with the global Composer bin directory appended to `PATH`
    pub fn for_home(home: &str) -> Self {
        Self::new().with_path_entry(Path::new(home).join(".composer/vendor/ensphere/installer/bin"))
    }

    /// Append a directory to `PATH` for every command
    pub fn with_path_entry(mut self, dir: impl Into<PathBuf>) -> Self {
        self.extra_path.push(dir.into());
        self
    }

    pub fn with_tail_lines(mut self, lines: usize) -> Self {
        self.tail_lines = lines;
        self
    }

    /// Disable terminal echo (output is still captured for errors)
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    fn search_path(&self) -> Option<std::ffi::OsString> {
        if self.extra_path.is_empty() {
            return None;
        }
        let current = std::env::var_os("PATH").unwrap_or_default();
        let entries = std::env::split_paths(&current).chain(self.extra_path.iter().cloned());
        std::env::join_paths(entries).ok()
    }

    fn failure(step: &str, command: &str, code: Option<i32>, output: Vec<String>) -> InstallerError {
        InstallerError::ExternalCommandFailed {
            step: step.to_string(),
            command: command.to_string(),
            code,
            output,
        }
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, step: &str, command: &str, cwd: &Path) -> Result<()> {
        tracing::info!(step, command, cwd = %cwd.display(), "running external command");
        if self.echo {
            println!();
            println!("{} {}", "Running:".dimmed(), command.yellow());
            println!();
        }

        let mut cmd = TokioCommand::new("sh");
        cmd.arg("-c")
            .arg(command)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(path) = self.search_path() {
            cmd.env("PATH", path);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| Self::failure(step, command, None, vec![e.to_string()]))?;

        let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(out), Some(err)) => (out, err),
            _ => {
                return Err(Self::failure(
                    step,
                    command,
                    None,
                    vec!["failed to capture process output".to_string()],
                ))
            }
        };

        let mut stdout_reader = BufReader::new(stdout).lines();
        let mut stderr_reader = BufReader::new(stderr).lines();
        let mut tail = OutputTail::new(self.tail_lines);
        let mut stdout_open = true;
        let mut stderr_open = true;

        while stdout_open || stderr_open {
            tokio::select! {
                line = stdout_reader.next_line(), if stdout_open => {
                    match line {
                        Ok(Some(line)) => {
                            if self.echo {
                                println!("  {}", line);
                            }
                            tail.push(line);
                        }
                        Ok(None) => stdout_open = false,
                        Err(e) => {
                            tracing::warn!(error = %e, "error reading stdout");
                            stdout_open = false;
                        }
                    }
                }
                line = stderr_reader.next_line(), if stderr_open => {
                    match line {
                        Ok(Some(line)) => {
                            if self.echo {
                                eprintln!("  {}", line.yellow());
                            }
                            tail.push(line);
                        }
                        Ok(None) => stderr_open = false,
                        Err(e) => {
                            tracing::warn!(error = %e, "error reading stderr");
                            stderr_open = false;
                        }
                    }
                }
            }
        }

        let status = child.wait().await.map_err(|e| {
            let mut output = tail_snapshot(&tail);
            output.push(e.to_string());
            Self::failure(step, command, None, output)
        })?;

        if status.success() {
            tracing::debug!(step, "external command finished");
            Ok(())
        } else {
            tracing::error!(step, code = ?status.code(), "external command failed");
            Err(Self::failure(step, command, status.code(), tail.into_vec()))
        }
    }
}

fn tail_snapshot(tail: &OutputTail) -> Vec<String> {
    tail.lines.iter().cloned().collect()
}

/// One command seen by a [`RecordingRunner`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommand {
    pub step: String,
    pub command: String,
    pub cwd: PathBuf,
}

/// Runner that records commands instead of executing them.
///
/// Optionally fails a named step, which lets callers exercise the abort path
/// without a PHP toolchain.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<RecordedCommand>>,
    fail_step: Option<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first command of `step` with exit code 1
    pub fn failing_at(step: impl Into<String>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_step: Some(step.into()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCommand> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, step: &str, command: &str, cwd: &Path) -> Result<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCommand {
                step: step.to_string(),
                command: command.to_string(),
                cwd: cwd.to_path_buf(),
            });
        }
        if self.fail_step.as_deref() == Some(step) {
            return Err(ShellRunner::failure(
                step,
                command,
                Some(1),
                vec![format!("{} failed", command)],
            ));
        }
        Ok(())
    }
}
