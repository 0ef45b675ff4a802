//! Two-stage turn pipeline: analysis call, directive parsing, reply call.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::directive::{parse_directives, DirectiveBundle, DirectiveError};
use crate::prompt::{
    analysis_system_prompt, analysis_user_payload, PromptRole, PromptSource, ReplyPrompt,
};
use crate::providers::{LlmProvider, ProviderError};

use super::generate;
use super::notify::{NoticeKind, Notifier};
use super::transcript::Transcript;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Where the orchestrator is within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStage {
    /// No turn in flight.
    Idle,
    /// Waiting for the analysis call.
    AwaitingAnalysis,
    /// Waiting for the reply call.
    AwaitingReply,
}

/// Which generation call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStage {
    /// The directive-producing call.
    Analysis,
    /// The user-facing reply call.
    Reply,
}

impl fmt::Display for CallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Analysis => f.write_str("analysis"),
            Self::Reply => f.write_str("reply"),
        }
    }
}

/// Why a turn ended without a reply. None of these are fatal to the session.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    /// Nothing to send.
    #[error("message is empty")]
    EmptyMessage,
    /// The analysis output did not follow the directive grammar.
    #[error(transparent)]
    Format(#[from] DirectiveError),
    /// A generation call failed.
    #[error("{stage} request failed: {source}")]
    Transport {
        /// Failing call.
        stage: CallStage,
        /// Underlying provider error.
        #[source]
        source: ProviderError,
    },
}

/// Display names used in prompts and transcript labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Personas {
    /// The human's display name.
    pub user_name: String,
    /// The bot's display name.
    pub bot_name: String,
}

/// External collaborators, bundled to keep the constructor short.
pub struct Collaborators {
    /// Generation service.
    pub provider: Arc<dyn LlmProvider>,
    /// Steering fragment source.
    pub prompts: Arc<dyn PromptSource>,
    /// Displayed chat log, also the context source.
    pub transcript: Arc<dyn Transcript>,
    /// User-visible notices.
    pub notifier: Arc<dyn Notifier>,
}

/// Outcome of a successful turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    /// Directives decoded from the analysis call.
    pub directives: DirectiveBundle,
    /// Line appended to the transcript (always carries the bot label).
    pub reply_line: String,
    /// Trimmed reply text as generated, remembered for the next turn.
    pub reply_text: String,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Runs turns one at a time and owns the session state.
pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    prompts: Arc<dyn PromptSource>,
    transcript: Arc<dyn Transcript>,
    notifier: Arc<dyn Notifier>,
    personas: Personas,
    last_reply: Option<String>,
    context_enabled: bool,
    stage: TurnStage,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("model", &self.provider.model_id())
            .field("personas", &self.personas)
            .field("context_enabled", &self.context_enabled)
            .field("stage", &self.stage)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create an idle orchestrator with no previous reply.
    pub fn new(collaborators: Collaborators, personas: Personas, context_enabled: bool) -> Self {
        Self {
            provider: collaborators.provider,
            prompts: collaborators.prompts,
            transcript: collaborators.transcript,
            notifier: collaborators.notifier,
            personas,
            last_reply: None,
            context_enabled,
            stage: TurnStage::Idle,
        }
    }

    /// Current pipeline stage. Always [`TurnStage::Idle`] between turns.
    pub fn stage(&self) -> TurnStage {
        self.stage
    }

    /// Reply text of the last successful turn.
    pub fn last_reply(&self) -> Option<&str> {
        self.last_reply.as_deref()
    }

    /// Whether the transcript is appended to the reply prompt.
    pub fn context_enabled(&self) -> bool {
        self.context_enabled
    }

    /// Toggle the context section for subsequent turns.
    pub fn set_context_enabled(&mut self, enabled: bool) {
        self.context_enabled = enabled;
    }

    /// Display names in use.
    pub fn personas(&self) -> &Personas {
        &self.personas
    }

    /// Run one turn for `message`.
    ///
    /// Failures are reported through the notifier and returned; the session
    /// stays usable and `last_reply` is only updated on success.
    ///
    /// # Errors
    ///
    /// Returns [`TurnError::EmptyMessage`] for an empty message (no notice),
    /// [`TurnError::Format`] when the analysis output lacks a directive tag
    /// (no reply call is made), and [`TurnError::Transport`] when either
    /// generation call fails.
    pub async fn submit(&mut self, message: &str) -> Result<TurnReport, TurnError> {
        if message.is_empty() {
            return Err(TurnError::EmptyMessage);
        }

        let span = info_span!("turn", turn_id = %Uuid::new_v4());
        let result = self.run_turn(message).instrument(span).await;
        self.stage = TurnStage::Idle;

        if let Err(e) = &result {
            self.report_failure(e);
        }
        result
    }

    async fn run_turn(&mut self, message: &str) -> Result<TurnReport, TurnError> {
        self.transcript
            .append(&format!("{}: {message}", self.personas.user_name));

        let analysis_fragment = self.prompts.load(PromptRole::Analysis);
        let reply_fragment = self.prompts.load(PromptRole::Reply);
        let payload = analysis_user_payload(
            message,
            self.last_reply.as_deref(),
            &self.personas.user_name,
        );

        let directives = self.analyze(&analysis_fragment, &payload).await?;
        let reply_text = self.reply(&directives, &reply_fragment, &payload).await?;

        let reply_line = label_reply(&self.personas.bot_name, &reply_text);
        self.transcript.append(&reply_line);
        self.last_reply = Some(reply_text.clone());
        info!("turn complete");

        Ok(TurnReport {
            directives,
            reply_line,
            reply_text,
        })
    }

    async fn analyze(
        &mut self,
        steering_fragment: &str,
        payload: &str,
    ) -> Result<DirectiveBundle, TurnError> {
        self.stage = TurnStage::AwaitingAnalysis;
        let system_prompt = analysis_system_prompt(&self.personas.bot_name, steering_fragment);

        let raw = generate(self.provider.as_ref(), &system_prompt, payload, None)
            .await
            .map_err(|source| TurnError::Transport {
                stage: CallStage::Analysis,
                source,
            })?;
        debug!(raw = %raw, "analysis output received");

        let directives = parse_directives(&raw)?;
        if !directives.sampling.is_within_bounds() {
            warn!(
                temperature = directives.sampling.temperature,
                top_p = directives.sampling.top_p,
                "sampling parameters outside advertised range, passing through"
            );
        }
        info!(
            temperature = directives.sampling.temperature,
            top_p = directives.sampling.top_p,
            emotions = directives.emotions.len(),
            "directives parsed"
        );
        Ok(directives)
    }

    async fn reply(
        &mut self,
        directives: &DirectiveBundle,
        reply_fragment: &str,
        payload: &str,
    ) -> Result<String, TurnError> {
        self.stage = TurnStage::AwaitingReply;
        let context = self.context_enabled.then(|| self.transcript.current());
        let system_prompt = ReplyPrompt {
            bot_name: &self.personas.bot_name,
            user_name: &self.personas.user_name,
            emotions: &directives.emotions,
            steering_prompt: &directives.steering_prompt,
            reply_fragment,
            context: context.as_deref(),
        }
        .render();

        let raw = generate(
            self.provider.as_ref(),
            &system_prompt,
            payload,
            Some(directives.sampling),
        )
        .await
        .map_err(|source| TurnError::Transport {
            stage: CallStage::Reply,
            source,
        })?;
        Ok(raw.trim().to_owned())
    }

    fn report_failure(&self, error: &TurnError) {
        let message = match error {
            TurnError::EmptyMessage => return,
            TurnError::Format(e) => {
                format!("The analysis output is not in the required format: {e}")
            }
            TurnError::Transport { stage, source } => {
                format!("The {stage} request failed: {source}")
            }
        };
        debug!(error = %error, "turn aborted");
        self.notifier.notify(NoticeKind::Error, &message);
    }
}

/// Prefix `reply` with `"<bot_name>: "` unless it already starts with
/// `"<bot_name>:"`.
pub fn label_reply(bot_name: &str, reply: &str) -> String {
    if reply.starts_with(&format!("{bot_name}:")) {
        reply.to_owned()
    } else {
        format!("{bot_name}: {reply}")
    }
}
