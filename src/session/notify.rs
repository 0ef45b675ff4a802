//! User-visible notices (save confirmations, prompt-file warnings, turn failures).

use std::fmt;
use std::sync::Mutex;

use tracing::info;

/// Severity of a user-visible notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeKind {
    /// Informational confirmation.
    Info,
    /// Recoverable problem; the turn continues.
    Warning,
    /// The current turn was aborted.
    Error,
}

impl fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

/// Channel for messages the user must see.
pub trait Notifier: Send + Sync {
    /// Surface `message` to the user.
    fn notify(&self, kind: NoticeKind, message: &str);
}

/// Writes notices to stderr and records them in the log file.
///
/// The log record is emitted at `info` so it stays below the stderr log
/// layers and the user sees each notice exactly once.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        info!(notice = %kind, "{message}");
        eprintln!("[{kind}] {message}");
    }
}

/// Keeps every notice in memory; useful for embedding and tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<(NoticeKind, String)>>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded notices, oldest first.
    pub fn notices(&self) -> Vec<(NoticeKind, String)> {
        match self.notices.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Recorded notices of one kind.
    pub fn of_kind(&self, kind: NoticeKind) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, message)| message)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        let mut guard = match self.notices.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push((kind, message.to_owned()));
    }
}
