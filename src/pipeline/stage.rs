//! Running one stage as a child process
//!
//! Stdout and stderr are read concurrently and forwarded line by line, so a
//! chatty stage never blocks on a full pipe.

use crate::output::ManifestError;
use crate::pipeline::{LogSink, StageKind, StreamKind};
use crate::state::StageStatus;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Errors raised while running pipeline stages
#[derive(Debug, Error)]
pub enum StageError {
    #[error("failed to start {stage} stage ({program}): {source}")]
    Spawn {
        stage: StageKind,
        program: String,
        source: std::io::Error,
    },

    #[error("IO error while running {stage} stage: {source}")]
    Io {
        stage: StageKind,
        source: std::io::Error,
    },

    #[error("{stage} stage cannot move from {from} to {to}")]
    InvalidTransition {
        stage: StageKind,
        from: StageStatus,
        to: StageStatus,
    },

    #[error("{stage} stage is blocked: {reason}")]
    Blocked { stage: StageKind, reason: String },

    #[error("crawl manifest at {} is unusable: {source}", .path.display())]
    Manifest {
        path: PathBuf,
        source: ManifestError,
    },
}

/// A program and its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl StageCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Replaces every occurrence of `placeholder` in the arguments
    ///
    /// If no argument contains it, `value` is appended as a final argument.
    pub fn substitute(&self, placeholder: &str, value: &str) -> Self {
        let mut found = false;
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|a| {
                if a.contains(placeholder) {
                    found = true;
                    a.replace(placeholder, value)
                } else {
                    a.clone()
                }
            })
            .collect();

        if !found {
            args.push(value.to_string());
        }

        Self {
            program: self.program.clone(),
            args,
        }
    }
}

/// Runs a stage to completion, streaming its output to `sink` and `log`
///
/// # Returns
///
/// The exit status once both output streams have closed and the process has
/// exited. Spawn and read failures are errors; a non-zero exit is not.
pub async fn run_stage(
    stage: StageKind,
    command: &StageCommand,
    sink: &mut dyn LogSink,
    log: &mut String,
) -> Result<ExitStatus, StageError> {
    tracing::info!(
        "Starting {} stage: {} {}",
        stage,
        command.program.display(),
        command.args.join(" ")
    );

    let mut child = Command::new(&command.program)
        .args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| StageError::Spawn {
            stage,
            program: command.program.display().to_string(),
            source,
        })?;

    let io_err = |source: std::io::Error| StageError::Io { stage, source };
    let missing = |name: &str| {
        io_err(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("{} was not captured", name),
        ))
    };

    let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;
    let stderr = child.stderr.take().ok_or_else(|| missing("stderr"))?;

    let mut out = BufReader::new(stdout).split(b'\n');
    let mut err = BufReader::new(stderr).split(b'\n');
    let mut out_open = true;
    let mut err_open = true;

    while out_open || err_open {
        let (stream, segment) = tokio::select! {
            segment = out.next_segment(), if out_open => (StreamKind::Stdout, segment),
            segment = err.next_segment(), if err_open => (StreamKind::Stderr, segment),
        };

        match segment.map_err(io_err)? {
            Some(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                let line = text.trim_end_matches('\r');
                sink.line(stage, stream, line);
                log.push_str(line);
                log.push('\n');
            }
            None => match stream {
                StreamKind::Stdout => out_open = false,
                StreamKind::Stderr => err_open = false,
            },
        }
    }

    let status = child.wait().await.map_err(io_err)?;
    tracing::info!("{} stage exited with {}", stage, status);
    Ok(status)
}
