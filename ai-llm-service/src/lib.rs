//! Completion client used by the merge request reviewer.
//!
//! - [`config`]: model configuration and env-driven defaults
//! - [`services::open_ai_service`]: OpenAI REST client (text or chat completions)
//! - [`error_handler`]: unified [`AiLlmError`] and env/validation helpers

pub mod config;
pub mod error_handler;
pub mod services;

pub use config::{completion_api::CompletionApi, llm_model_config::LlmModelConfig};
pub use error_handler::{AiLlmError, Result};
pub use services::open_ai_service::OpenAiService;
