//! Two-stage turn behavior with a scripted provider.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use heartchat::prompt::StaticPromptSource;
use heartchat::providers::{
    CompletionRequest, CompletionResponse, LlmProvider, ProviderError, UsageStats,
};
use heartchat::session::{
    CallStage, Collaborators, MemoryTranscript, NoticeKind, Orchestrator, Personas,
    RecordingNotifier, Transcript, TurnError, TurnStage,
};

const SAD_DIRECTIVES: &str = "~!modelparam:{temperature:[0.3],topp:[0.8]}!~\n\
~!emoweight:{sadness:[0.9];happiness:[0.0]}!~\n\
~!prompt:[be gentle]!~";

/// Replays queued outcomes and records every request it receives.
struct ScriptedProvider {
    outcomes: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    fn new(outcomes: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn push(&self, outcome: Result<String, ProviderError>) {
        self.outcomes
            .lock()
            .expect("outcomes lock should not be poisoned")
            .push_back(outcome);
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .expect("requests lock should not be poisoned")
            .clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.requests
            .lock()
            .expect("requests lock should not be poisoned")
            .push(request);
        let next = self
            .outcomes
            .lock()
            .expect("outcomes lock should not be poisoned")
            .pop_front();
        match next {
            Some(Ok(text)) => Ok(CompletionResponse {
                text,
                usage: UsageStats::default(),
                model: "scripted".to_owned(),
            }),
            Some(Err(err)) => Err(err),
            None => Err(ProviderError::Parse("script exhausted".to_owned())),
        }
    }

    fn model_id(&self) -> &str {
        "test/scripted"
    }
}

struct Harness {
    orchestrator: Orchestrator,
    provider: Arc<ScriptedProvider>,
    transcript: Arc<MemoryTranscript>,
    notifier: Arc<RecordingNotifier>,
}

fn harness(outcomes: Vec<Result<String, ProviderError>>, context_enabled: bool) -> Harness {
    let provider = Arc::new(ScriptedProvider::new(outcomes));
    let transcript = Arc::new(MemoryTranscript::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let mut prompts = StaticPromptSource::defaults("AI");
    prompts.reply = "Reply to the user in a friendly way.".to_owned();

    let collaborators = Collaborators {
        provider: provider.clone(),
        prompts: Arc::new(prompts),
        transcript: transcript.clone(),
        notifier: notifier.clone(),
    };
    let personas = Personas {
        user_name: "User".to_owned(),
        bot_name: "AI".to_owned(),
    };
    Harness {
        orchestrator: Orchestrator::new(collaborators, personas, context_enabled),
        provider,
        transcript,
        notifier,
    }
}

fn http_500() -> ProviderError {
    ProviderError::HttpStatus {
        status: 500,
        body: "upstream exploded".to_owned(),
    }
}

#[tokio::test]
async fn sad_message_steers_reply_call() {
    let mut h = harness(
        vec![
            Ok(SAD_DIRECTIVES.to_owned()),
            Ok("I'm sorry to hear that.".to_owned()),
        ],
        false,
    );

    let report = match h.orchestrator.submit("I failed my exam").await {
        Ok(report) => report,
        Err(err) => panic!("turn should succeed: {err}"),
    };
    assert_eq!(report.reply_line, "AI: I'm sorry to hear that.");
    assert_eq!(report.directives.steering_prompt, "be gentle");

    let requests = h.provider.requests();
    assert_eq!(requests.len(), 2);

    let analysis = &requests[0];
    assert_eq!(analysis.temperature, None);
    assert_eq!(analysis.top_p, None);
    assert_eq!(analysis.messages.len(), 1);
    assert!(analysis.messages[0].content.contains("I failed my exam"));

    let reply = &requests[1];
    assert_eq!(reply.temperature, Some(0.3));
    assert_eq!(reply.top_p, Some(0.8));
    let system = reply.system.clone().unwrap_or_default();
    assert!(system.contains("sadness: 0.9"));
    assert!(system.contains("happiness: 0"));
    assert!(system.contains("be gentle"));
    assert!(!system.contains("Context:"));

    assert_eq!(
        h.transcript.current(),
        "User: I failed my exam\nAI: I'm sorry to hear that."
    );
    assert_eq!(h.orchestrator.last_reply(), Some("I'm sorry to hear that."));
    assert_eq!(h.orchestrator.stage(), TurnStage::Idle);
    assert!(h.notifier.notices().is_empty());
}

#[tokio::test]
async fn prose_analysis_aborts_before_reply_call() {
    let mut h = harness(
        vec![
            Ok("The user seems sad.".to_owned()),
            Ok("should never be requested".to_owned()),
        ],
        false,
    );

    let result = h.orchestrator.submit("hello").await;
    assert!(matches!(result, Err(TurnError::Format(_))));
    assert_eq!(h.provider.requests().len(), 1);
    assert_eq!(h.orchestrator.last_reply(), None);
    assert_eq!(h.orchestrator.stage(), TurnStage::Idle);

    let errors = h.notifier.of_kind(NoticeKind::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("The analysis output is not in the required format"));
}

#[tokio::test]
async fn analysis_transport_failure_is_reported() {
    let mut h = harness(vec![Err(http_500())], false);

    let result = h.orchestrator.submit("hello").await;
    assert!(matches!(
        result,
        Err(TurnError::Transport {
            stage: CallStage::Analysis,
            ..
        })
    ));
    let errors = h.notifier.of_kind(NoticeKind::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("The analysis request failed"));
    assert!(errors[0].contains("upstream exploded"));
}

#[tokio::test]
async fn reply_failure_keeps_previous_reply() {
    let mut h = harness(
        vec![
            Ok(SAD_DIRECTIVES.to_owned()),
            Ok("first answer".to_owned()),
            Ok(SAD_DIRECTIVES.to_owned()),
            Err(http_500()),
        ],
        false,
    );

    assert!(h.orchestrator.submit("one").await.is_ok());
    let result = h.orchestrator.submit("two").await;
    assert!(matches!(
        result,
        Err(TurnError::Transport {
            stage: CallStage::Reply,
            ..
        })
    ));
    assert_eq!(h.orchestrator.last_reply(), Some("first answer"));
    assert_eq!(h.orchestrator.stage(), TurnStage::Idle);

    let errors = h.notifier.of_kind(NoticeKind::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("The reply request failed"));
}

#[tokio::test]
async fn session_recovers_after_failed_turn() {
    let mut h = harness(vec![Ok("garbage".to_owned())], false);
    assert!(h.orchestrator.submit("first").await.is_err());

    h.provider.push(Ok(SAD_DIRECTIVES.to_owned()));
    h.provider.push(Ok("still here".to_owned()));
    let report = h.orchestrator.submit("second").await;
    assert!(report.is_ok());
    assert_eq!(h.orchestrator.last_reply(), Some("still here"));
}

#[tokio::test]
async fn empty_message_makes_no_calls() {
    let mut h = harness(vec![], false);
    let result = h.orchestrator.submit("").await;
    assert!(matches!(result, Err(TurnError::EmptyMessage)));
    assert!(h.provider.requests().is_empty());
    assert!(h.notifier.notices().is_empty());
    assert!(h.transcript.is_empty());
}

#[tokio::test]
async fn previous_reply_feeds_next_analysis() {
    let mut h = harness(
        vec![
            Ok(SAD_DIRECTIVES.to_owned()),
            Ok("  Take a deep breath.  ".to_owned()),
            Ok(SAD_DIRECTIVES.to_owned()),
            Ok("You can retake it.".to_owned()),
        ],
        false,
    );

    assert!(h.orchestrator.submit("I failed my exam").await.is_ok());
    assert_eq!(h.orchestrator.last_reply(), Some("Take a deep breath."));
    assert!(h.orchestrator.submit("What now?").await.is_ok());

    let requests = h.provider.requests();
    let first_payload = &requests[0].messages[0].content;
    let second_payload = &requests[2].messages[0].content;
    assert!(!first_payload.contains("Previous reply"));
    assert!(second_payload.contains("Previous reply: Take a deep breath."));
}

#[tokio::test]
async fn context_toggle_controls_transcript_section() {
    let mut h = harness(
        vec![
            Ok(SAD_DIRECTIVES.to_owned()),
            Ok("first".to_owned()),
            Ok(SAD_DIRECTIVES.to_owned()),
            Ok("second".to_owned()),
        ],
        false,
    );

    assert!(h.orchestrator.submit("one").await.is_ok());
    h.orchestrator.set_context_enabled(true);
    assert!(h.orchestrator.context_enabled());
    assert!(h.orchestrator.submit("two").await.is_ok());

    let requests = h.provider.requests();
    let without = requests[1].system.clone().unwrap_or_default();
    let with = requests[3].system.clone().unwrap_or_default();
    assert!(!without.contains("Context:"));
    assert!(with.contains("Context:\nUser: one\nAI: first\nUser: two\n"));
}

#[tokio::test]
async fn already_labeled_reply_is_not_relabeled() {
    let mut h = harness(
        vec![Ok(SAD_DIRECTIVES.to_owned()), Ok("AI: hello there".to_owned())],
        false,
    );

    let report = match h.orchestrator.submit("hi").await {
        Ok(report) => report,
        Err(err) => panic!("turn should succeed: {err}"),
    };
    assert_eq!(report.reply_line, "AI: hello there");
    assert!(h.transcript.current().ends_with("\nAI: hello there"));
}

#[tokio::test]
async fn unterminated_blocks_still_produce_a_reply() {
    let mut h = harness(
        vec![
            Ok("~!modelparam:{temperature:[0.3]~!emoweight:{}!~~!prompt:[cut off".to_owned()),
            Ok("ok".to_owned()),
        ],
        false,
    );

    let report = match h.orchestrator.submit("hi").await {
        Ok(report) => report,
        Err(err) => panic!("turn should succeed: {err}"),
    };
    assert_eq!(report.directives.steering_prompt, "");
    let requests = h.provider.requests();
    assert_eq!(requests.len(), 2);
}
