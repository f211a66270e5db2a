use std::str::FromStr;

use crate::error_handler::{AiLlmError, ConfigError};

/// Which OpenAI endpoint family is used to produce the review text.
///
/// - `Completions` → `POST /v1/completions` with a plain `prompt`,
///   reading `choices[0].text`.
/// - `Chat` → `POST /v1/chat/completions` with a single user message,
///   reading `choices[0].message.content`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionApi {
    #[default]
    Completions,
    Chat,
}

impl FromStr for CompletionApi {
    type Err = AiLlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "completions" | "completion" | "text" => Ok(Self::Completions),
            "chat" | "chat_completions" => Ok(Self::Chat),
            _ => Err(ConfigError::InvalidFormat {
                var: "OPENAI_API_STYLE",
                reason: "expected `completions` or `chat`",
            }
            .into()),
        }
    }
}
