//! Chat model trait.
//!
//! Hosted chat backends (OpenAI chat completions, Gemini `generateContent`)
//! implement [`ChatModel`] in the `docqa` app crate. Both the answer chain
//! and the interactive chat session talk to models only through this trait.

use anyhow::Result;
use async_trait::async_trait;

use crate::transcript::Turn;

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o"`).
    fn model_name(&self) -> &str;

    /// Generate the next assistant message for `turns`, which are sent in
    /// order and unmodified.
    async fn complete(&self, turns: &[Turn]) -> Result<String>;
}
