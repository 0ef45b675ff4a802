//! Reply-stage prompt rendered from a parsed directive bundle.

use crate::directive::EmotionVector;

/// Inputs for the reply-stage system prompt.
#[derive(Debug, Clone)]
pub struct ReplyPrompt<'a> {
    /// Bot display name.
    pub bot_name: &'a str,
    /// User display name.
    pub user_name: &'a str,
    /// Emotion weights from the analysis stage.
    pub emotions: &'a EmotionVector,
    /// Steering prompt chosen by the analysis stage.
    pub steering_prompt: &'a str,
    /// Reply steering fragment from the prompt source, embedded verbatim.
    pub reply_fragment: &'a str,
    /// Full transcript; `None` leaves the context section out.
    pub context: Option<&'a str>,
}

impl ReplyPrompt<'_> {
    /// Render the system prompt.
    ///
    /// Emotions are listed one `name: value` line each, in decode order.
    /// Context is appended untruncated.
    pub fn render(&self) -> String {
        let mut prompt = format!(
            "You are a bot named {}. The user's name is {}. Adjust your tone according to \
the emotion weights and prompts below.\n",
            self.bot_name, self.user_name
        );

        prompt.push_str("Emotion weights:\n");
        if self.emotions.is_empty() {
            prompt.push_str("(none)\n");
        }
        for (name, weight) in self.emotions.iter() {
            prompt.push_str(&format!("{name}: {weight}\n"));
        }

        if !self.steering_prompt.is_empty() {
            prompt.push_str(&format!("Steering prompt:\n{}\n", self.steering_prompt));
        }
        prompt.push_str(&format!("Prompt:\n{}\n", self.reply_fragment));
        prompt.push_str("Adjust the tone of your reply based on this information.\n");

        if let Some(context) = self.context {
            prompt.push_str(&format!("Context:\n{context}\n"));
        }
        prompt
    }
}
