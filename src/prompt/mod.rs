//! System prompt builders for both stages and the steering-fragment source.

pub mod analysis;
pub mod reply;
pub mod source;

pub use analysis::{analysis_system_prompt, analysis_user_payload};
pub use reply::ReplyPrompt;
pub use source::{FilePromptSource, PromptRole, PromptSource, StaticPromptSource};
