//! Directive bundle parsing against realistic analysis output.

use heartchat::directive::{
    parse_directives, DirectiveError, EmotionVector, SamplingParams, TagCapture, EMOTION_WEIGHT,
    MODEL_PARAM, STEERING_PROMPT,
};

const COMPLIANT: &str = "~!modelparam:{temperature:[0.3],topp:[0.8]}!~\
~!emoweight:{sadness:[0.9];happiness:[0.0]}!~\
~!prompt:[be gentle]!~";

fn parse_ok(raw: &str) -> heartchat::directive::DirectiveBundle {
    match parse_directives(raw) {
        Ok(bundle) => bundle,
        Err(err) => panic!("analysis output should parse: {err}"),
    }
}

#[test]
fn tags_may_be_surrounded_by_prose_and_newlines() {
    let raw = format!("Sure! Here is my analysis:\n\n{COMPLIANT}\n\nHope this helps.");
    let bundle = parse_ok(&raw);
    assert_eq!(bundle.sampling.temperature, 0.3);
    assert_eq!(bundle.sampling.top_p, 0.8);
    assert_eq!(bundle.emotions.get("sadness"), Some(0.9));
    assert_eq!(bundle.steering_prompt, "be gentle");
}

#[test]
fn tag_order_does_not_matter() {
    let raw = "~!prompt:[cheer them up]!~\n\
~!emoweight:{happiness:[0.8]}!~\n\
~!modelparam:{temperature:[1.1],topp:[0.95]}!~";
    let bundle = parse_ok(raw);
    assert_eq!(bundle.sampling.temperature, 1.1);
    assert_eq!(bundle.emotions.get("happiness"), Some(0.8));
    assert_eq!(bundle.steering_prompt, "cheer them up");
}

#[test]
fn missing_prompt_tag_is_a_format_error() {
    let raw = "~!modelparam:{temperature:[0.3],topp:[0.8]}!~~!emoweight:{sadness:[0.9]}!~";
    let result = parse_directives(raw);
    assert_eq!(
        result,
        Err(DirectiveError::MissingMarkers {
            missing: vec!["prompt"],
        })
    );
}

#[test]
fn format_error_message_names_missing_tags() {
    let err = match parse_directives("no tags at all") {
        Ok(bundle) => panic!("prose should not parse, got {bundle:?}"),
        Err(err) => err,
    };
    assert_eq!(
        err.to_string(),
        "analysis output is missing required directive tags: modelparam, emoweight, prompt"
    );
}

#[test]
fn modelparam_without_own_terminator_borrows_the_next_one() {
    let raw = "~!modelparam:{temperature:[0.3],topp:[0.8]}\
~!emoweight:{sadness:[0.9]}!~~!prompt:[x]!~";
    // The first "!~" after the modelparam marker closes the emoweight block,
    // so the modelparam payload swallows the emoweight marker text.
    let bundle = parse_ok(raw);
    assert_eq!(bundle.sampling.temperature, 0.3);
    assert_eq!(bundle.sampling.top_p, 0.8);
}

#[test]
fn truncated_output_degrades_each_block() {
    let raw = "~!emoweight:{sadness:[0.9]}!~~!prompt:[be gentle~!modelparam:{temperature:[0.3]";
    let bundle = parse_ok(raw);
    assert_eq!(bundle.sampling, SamplingParams::default());
    assert_eq!(bundle.emotions.get("sadness"), Some(0.9));
    assert_eq!(bundle.steering_prompt, "");
}

#[test]
fn unterminated_emotions_become_neutral() {
    let raw = "~!modelparam:{temperature:[0.3],topp:[0.8]}!~~!prompt:[x]!~~!emoweight:{sadness:[0.9]";
    let bundle = parse_ok(raw);
    assert_eq!(bundle.emotions, EmotionVector::neutral());
    assert_eq!(bundle.sampling.temperature, 0.3);
}

#[test]
fn steering_prompt_has_inner_brackets_removed() {
    let raw = "~!modelparam:{}!~~!emoweight:{}!~~!prompt:[say [hello] softly]!~";
    let bundle = parse_ok(raw);
    assert_eq!(bundle.steering_prompt, "say hello softly");
    assert!(bundle.emotions.is_empty());
    assert_eq!(bundle.sampling, SamplingParams::default());
}

#[test]
fn out_of_range_values_are_passed_through() {
    let raw = "~!modelparam:{temperature:[3.5],topp:[1.4]}!~~!emoweight:{}!~~!prompt:[]!~";
    let bundle = parse_ok(raw);
    assert_eq!(bundle.sampling.temperature, 3.5);
    assert_eq!(bundle.sampling.top_p, 1.4);
    assert!(!bundle.sampling.is_within_bounds());
}

#[test]
fn tag_rules_capture_first_terminator() {
    assert_eq!(
        MODEL_PARAM.capture("~!modelparam:{a}!~ tail !~"),
        TagCapture::Payload("{a}")
    );
    assert_eq!(EMOTION_WEIGHT.capture("nothing here"), TagCapture::Missing);
    assert_eq!(
        STEERING_PROMPT.capture("~!prompt:[open ended"),
        TagCapture::Unterminated
    );
}
