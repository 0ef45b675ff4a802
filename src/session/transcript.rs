//! Chat transcript: the displayed conversation, also used as reply context.

use std::sync::Mutex;

/// Append-only chat log.
pub trait Transcript: Send + Sync {
    /// Add one displayed line.
    fn append(&self, line: &str);

    /// Full log text, lines joined with `\n`.
    fn current(&self) -> String;
}

/// In-memory transcript.
#[derive(Debug, Default)]
pub struct MemoryTranscript {
    lines: Mutex<Vec<String>>,
}

impl MemoryTranscript {
    /// Create an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lines recorded.
    pub fn len(&self) -> usize {
        self.with_lines(|lines| lines.len())
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_lines<T>(&self, f: impl FnOnce(&mut Vec<String>) -> T) -> T {
        let mut guard = match self.lines.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

impl Transcript for MemoryTranscript {
    fn append(&self, line: &str) {
        self.with_lines(|lines| lines.push(line.to_owned()));
    }

    fn current(&self) -> String {
        self.with_lines(|lines| lines.join("\n"))
    }
}

/// Prints each line to stdout as it is appended and keeps the log in memory.
#[derive(Debug, Default)]
pub struct ConsoleTranscript {
    inner: MemoryTranscript,
}

impl ConsoleTranscript {
    /// Create an empty console transcript.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transcript for ConsoleTranscript {
    fn append(&self, line: &str) {
        println!("{line}");
        self.inner.append(line);
    }

    fn current(&self) -> String {
        self.inner.current()
    }
}
