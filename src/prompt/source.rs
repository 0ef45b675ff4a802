//! Steering-fragment loading for the analysis and reply stages.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::session::notify::{NoticeKind, Notifier};

/// Which stage a steering fragment is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptRole {
    /// Spliced into the analysis prompt's worked example.
    Analysis,
    /// Embedded verbatim in the reply prompt.
    Reply,
}

impl fmt::Display for PromptRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Analysis => f.write_str("analysis"),
            Self::Reply => f.write_str("reply"),
        }
    }
}

/// Supplies steering fragments. Implementations never fail: an unavailable
/// fragment is replaced by [`default_fragment`].
pub trait PromptSource: Send + Sync {
    /// Steering fragment for `role`.
    fn load(&self, role: PromptRole) -> String;
}

/// Persona line used when no fragment file is configured or readable.
pub fn default_fragment(role: PromptRole, bot_name: &str) -> String {
    match role {
        PromptRole::Analysis => format!(
            "{bot_name}, you are an emotion-analysis assistant. Analyze the user's emotions."
        ),
        PromptRole::Reply => {
            format!("{bot_name}, you are a reply assistant. Reply to the user in a friendly way.")
        }
    }
}

// ---------------------------------------------------------------------------
// File-backed source
// ---------------------------------------------------------------------------

/// Reads fragments from text files in a prompts directory.
pub struct FilePromptSource {
    dir: PathBuf,
    analysis_file: Option<String>,
    reply_file: Option<String>,
    bot_name: String,
    notifier: Arc<dyn Notifier>,
}

impl fmt::Debug for FilePromptSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePromptSource")
            .field("dir", &self.dir)
            .field("analysis_file", &self.analysis_file)
            .field("reply_file", &self.reply_file)
            .finish_non_exhaustive()
    }
}

impl FilePromptSource {
    /// Create a source reading `analysis_file` / `reply_file` under `dir`.
    ///
    /// `None` means no file is selected for that role.
    pub fn new(
        dir: PathBuf,
        analysis_file: Option<String>,
        reply_file: Option<String>,
        bot_name: String,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            dir,
            analysis_file,
            reply_file,
            bot_name,
            notifier,
        }
    }

    fn file_for(&self, role: PromptRole) -> Option<&str> {
        match role {
            PromptRole::Analysis => self.analysis_file.as_deref(),
            PromptRole::Reply => self.reply_file.as_deref(),
        }
    }
}

impl PromptSource for FilePromptSource {
    fn load(&self, role: PromptRole) -> String {
        let Some(name) = self.file_for(role) else {
            return default_fragment(role, &self.bot_name);
        };

        let path = self.dir.join(name);
        match std::fs::read_to_string(&path) {
            Ok(contents) => {
                debug!(%role, path = %path.display(), "loaded steering fragment");
                contents.trim().to_owned()
            }
            Err(e) => {
                let message = if e.kind() == std::io::ErrorKind::NotFound {
                    format!("Prompt file {name} was not found, using the default prompt.")
                } else {
                    format!("Prompt file {name} could not be read ({e}), using the default prompt.")
                };
                self.notifier.notify(NoticeKind::Warning, &message);
                default_fragment(role, &self.bot_name)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Fixed source
// ---------------------------------------------------------------------------

/// Returns fixed fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticPromptSource {
    /// Analysis-stage fragment.
    pub analysis: String,
    /// Reply-stage fragment.
    pub reply: String,
}

impl StaticPromptSource {
    /// Source returning the default persona lines for `bot_name`.
    pub fn defaults(bot_name: &str) -> Self {
        Self {
            analysis: default_fragment(PromptRole::Analysis, bot_name),
            reply: default_fragment(PromptRole::Reply, bot_name),
        }
    }
}

impl PromptSource for StaticPromptSource {
    fn load(&self, role: PromptRole) -> String {
        match role {
            PromptRole::Analysis => self.analysis.clone(),
            PromptRole::Reply => self.reply.clone(),
        }
    }
}
