//! Analysis-stage prompt: instructs the model to answer in the directive grammar.

use crate::directive::emotion::CANONICAL_EMOTIONS;
use crate::directive::sampling::{TEMPERATURE_RANGE, TOP_P_RANGE};
use crate::directive::{EmotionVector, SamplingParams};

/// Emotion weights used in the worked example.
const EXAMPLE_WEIGHTS: [f64; 6] = [0.5, 0.1, 0.2, 0.1, 0.0, 0.1];

/// Build the analysis-stage system prompt.
///
/// The grammar template and the discard warning are contract text: the
/// directive parser accepts exactly what this prompt describes. The steering
/// fragment is spliced into the worked example's prompt tag.
pub fn analysis_system_prompt(bot_name: &str, steering_fragment: &str) -> String {
    let (t_low, t_high) = TEMPERATURE_RANGE;
    let (p_low, p_high) = TOP_P_RANGE;

    let mut prompt = String::new();
    prompt.push_str(&format!(
        "You are an emotion-analysis bot named {bot_name}. Based on the user's message, \
decide which emotions the bot should express and write a prompt that controls the bot's behavior.\n"
    ));
    prompt.push_str(
        "Return the model parameters (temperature and topp), the emotion weights the bot \
should express, and the prompt.\n",
    );
    prompt.push_str(&format!(
        "temperature ranges from {t_low:.1} to {t_high:.1}, topp ranges from {p_low:.1} to {p_high:.1}.\n"
    ));
    prompt.push_str(
        "Return content strictly in the following format, otherwise your output will be \
ignored and will not be shown or sent to the bot:\n",
    );
    prompt.push_str(&grammar_template());
    prompt.push_str("For example:\n");
    prompt.push_str(&worked_example(steering_fragment));
    prompt.push_str("Follow the format above strictly and do not return anything else!\n");
    prompt
}

/// Build the user-turn payload sent alongside the analysis prompt.
///
/// The same payload is reused as the reply-stage user message.
pub fn analysis_user_payload(message: &str, last_reply: Option<&str>, user_name: &str) -> String {
    match last_reply {
        Some(reply) => {
            format!("User message: {message}\nPrevious reply: {reply}\nUser name: {user_name}")
        }
        None => format!("User message: {message}\nUser name: {user_name}"),
    }
}

fn grammar_template() -> String {
    let emotions = CANONICAL_EMOTIONS
        .iter()
        .map(|name| format!("{name}:[<value>]"))
        .collect::<Vec<_>>()
        .join(";");
    format!(
        "~!modelparam:{{temperature:[<value>],topp:[<value>]}}!~\n\
~!emoweight:{{{emotions}}}!~\n\
~!prompt:[<prompt text>]!~\n"
    )
}

fn worked_example(steering_fragment: &str) -> String {
    let mut emotions = EmotionVector::new();
    for (name, weight) in CANONICAL_EMOTIONS.iter().zip(EXAMPLE_WEIGHTS) {
        emotions.insert(name, weight);
    }
    format!(
        "{}\n{}\n~!prompt:[{steering_fragment}]!~\n",
        SamplingParams::default().encode(),
        emotions.encode()
    )
}
