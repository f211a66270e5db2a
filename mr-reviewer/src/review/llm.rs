//! Review generation capability.

use std::future::Future;

use ai_llm_service::OpenAiService;
use tracing::debug;

use crate::errors::MrResult;

/// Turns a prompt into review text.
pub trait ReviewGenerator: Sync {
    /// Text of the first completion choice for `prompt`.
    fn generate(&self, prompt: &str) -> impl Future<Output = MrResult<String>> + Send;
}

impl ReviewGenerator for OpenAiService {
    async fn generate(&self, prompt: &str) -> MrResult<String> {
        debug!(model = self.model(), prompt_chars = prompt.len(), "requesting completion");
        Ok(self.complete(prompt).await?)
    }
}
