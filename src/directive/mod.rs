//! Directive protocol emitted by the analysis stage.
//!
//! The analysis stage must answer with three tagged blocks:
//!
//! ```text
//! ~!modelparam:{temperature:[<float>],topp:[<float>]}!~
//! ~!emoweight:{<name>:[<float>];<name>:[<float>];...}!~
//! ~!prompt:[<free text>]!~
//! ```
//!
//! A missing marker rejects the whole bundle. A marker whose terminator is
//! missing degrades to the default value for that block only.

use tracing::debug;

pub mod emotion;
pub mod sampling;

pub use emotion::EmotionVector;
pub use sampling::SamplingParams;

// ---------------------------------------------------------------------------
// Grammar
// ---------------------------------------------------------------------------

/// One tagged block of the directive grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagRule {
    /// Tag name reported in format errors.
    pub name: &'static str,
    /// Opening marker.
    pub marker: &'static str,
    /// Closing sequence, first occurrence after the marker.
    pub terminator: &'static str,
}

/// Sampling parameter block.
pub const MODEL_PARAM: TagRule = TagRule {
    name: "modelparam",
    marker: "~!modelparam:",
    terminator: "!~",
};

/// Emotion weight block.
pub const EMOTION_WEIGHT: TagRule = TagRule {
    name: "emoweight",
    marker: "~!emoweight:",
    terminator: "!~",
};

/// Steering prompt block.
pub const STEERING_PROMPT: TagRule = TagRule {
    name: "prompt",
    marker: "~!prompt:[",
    terminator: "]!~",
};

/// All blocks a valid analysis response must contain.
pub const REQUIRED_TAGS: [TagRule; 3] = [MODEL_PARAM, EMOTION_WEIGHT, STEERING_PROMPT];

/// Result of applying a [`TagRule`] to raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagCapture<'a> {
    /// The marker does not occur.
    Missing,
    /// The marker occurs but no terminator follows it.
    Unterminated,
    /// Text between the marker and its terminator.
    Payload(&'a str),
}

impl TagRule {
    /// Capture this block's payload from `raw`.
    pub fn capture<'a>(&self, raw: &'a str) -> TagCapture<'a> {
        let Some(start) = raw.find(self.marker) else {
            return TagCapture::Missing;
        };
        let body = raw
            .get(start.saturating_add(self.marker.len())..)
            .unwrap_or_default();
        match body.find(self.terminator) {
            Some(end) => TagCapture::Payload(body.get(..end).unwrap_or_default()),
            None => TagCapture::Unterminated,
        }
    }
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// Parsed directives driving one reply-stage call.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveBundle {
    /// Sampling parameters for the reply call.
    pub sampling: SamplingParams,
    /// Emotion weights to render into the reply prompt.
    pub emotions: EmotionVector,
    /// Steering text chosen by the analysis stage, brackets removed.
    pub steering_prompt: String,
}

/// Analysis output that cannot be turned into a [`DirectiveBundle`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectiveError {
    /// One or more required markers are absent.
    #[error("analysis output is missing required directive tags: {}", .missing.join(", "))]
    MissingMarkers {
        /// Names of the absent tags, in grammar order.
        missing: Vec<&'static str>,
    },
}

/// Parse raw analysis-stage output into a directive bundle.
///
/// # Errors
///
/// Returns [`DirectiveError::MissingMarkers`] if any of the three markers is
/// absent. Unterminated blocks are not errors; they decode to defaults.
pub fn parse_directives(raw: &str) -> Result<DirectiveBundle, DirectiveError> {
    let missing: Vec<&'static str> = REQUIRED_TAGS
        .iter()
        .filter(|rule| matches!(rule.capture(raw), TagCapture::Missing))
        .map(|rule| rule.name)
        .collect();
    if !missing.is_empty() {
        return Err(DirectiveError::MissingMarkers { missing });
    }

    let sampling = match MODEL_PARAM.capture(raw) {
        TagCapture::Payload(body) => SamplingParams::decode(body),
        _ => {
            debug!(tag = MODEL_PARAM.name, "unterminated tag, using default sampling");
            SamplingParams::default()
        }
    };

    let emotions = match EMOTION_WEIGHT.capture(raw) {
        TagCapture::Payload(body) => EmotionVector::decode(body),
        _ => {
            debug!(tag = EMOTION_WEIGHT.name, "unterminated tag, using neutral emotions");
            EmotionVector::neutral()
        }
    };

    let steering_prompt = match STEERING_PROMPT.capture(raw) {
        TagCapture::Payload(body) => strip_brackets(body),
        _ => {
            debug!(tag = STEERING_PROMPT.name, "unterminated tag, using empty prompt");
            String::new()
        }
    };

    Ok(DirectiveBundle {
        sampling,
        emotions,
        steering_prompt,
    })
}

fn strip_brackets(text: &str) -> String {
    text.chars().filter(|c| *c != '[' && *c != ']').collect()
}
