//! Turn orchestration and the collaborators it talks to.
//!
//! The [`Orchestrator`] drives one user message through the analysis call,
//! directive parsing and the reply call, and owns the only session state
//! (last reply, context toggle).

use tracing::debug;

use crate::directive::SamplingParams;
use crate::providers::{CompletionRequest, LlmProvider, Message, ProviderError};

pub mod notify;
pub mod orchestrator;
pub mod transcript;

pub use notify::{ConsoleNotifier, NoticeKind, Notifier, RecordingNotifier};
pub use orchestrator::{
    label_reply, CallStage, Collaborators, Orchestrator, Personas, TurnError, TurnReport,
    TurnStage,
};
pub use transcript::{ConsoleTranscript, MemoryTranscript, Transcript};

/// One generation call: system prompt plus a single user message.
///
/// `None` sampling leaves temperature and top-p to the service defaults.
///
/// # Errors
///
/// Returns the provider's [`ProviderError`] unchanged.
pub async fn generate(
    provider: &dyn LlmProvider,
    system_prompt: &str,
    user_message: &str,
    sampling: Option<SamplingParams>,
) -> Result<String, ProviderError> {
    let request = CompletionRequest {
        messages: vec![Message::user(user_message)],
        system: Some(system_prompt.to_owned()),
        temperature: sampling.map(|s| s.temperature),
        top_p: sampling.map(|s| s.top_p),
    };
    let response = provider.complete(request).await?;
    debug!(
        model = %response.model,
        input_tokens = response.usage.input_tokens,
        output_tokens = response.usage.output_tokens,
        "generation complete"
    );
    Ok(response.text)
}
