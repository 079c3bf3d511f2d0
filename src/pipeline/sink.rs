//! Destinations for streamed stage output

use crate::pipeline::{StageKind, StreamKind};

/// Receives stage output one line at a time, as it is produced
pub trait LogSink: Send {
    fn line(&mut self, stage: StageKind, stream: StreamKind, line: &str);
}

impl<F> LogSink for F
where
    F: FnMut(StageKind, StreamKind, &str) + Send,
{
    fn line(&mut self, stage: StageKind, stream: StreamKind, line: &str) {
        self(stage, stream, line)
    }
}

/// Keeps every line in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub lines: Vec<(StageKind, StreamKind, String)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines from one stage, in arrival order
    pub fn stage_lines(&self, stage: StageKind) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|(s, _, _)| *s == stage)
            .map(|(_, _, l)| l.as_str())
            .collect()
    }
}

impl LogSink for MemorySink {
    fn line(&mut self, stage: StageKind, stream: StreamKind, line: &str) {
        self.lines.push((stage, stream, line.to_string()));
    }
}

/// Echoes lines to the terminal, prefixed with the stage name
///
/// Stage stdout goes to stdout and stage stderr to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn line(&mut self, stage: StageKind, stream: StreamKind, line: &str) {
        match stream {
            StreamKind::Stdout => println!("[{}] {}", stage, line),
            StreamKind::Stderr => eprintln!("[{}] {}", stage, line),
        }
    }
}
