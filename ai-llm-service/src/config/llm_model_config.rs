use crate::config::completion_api::CompletionApi;

/// Configuration for a completion model invocation.
///
/// # Fields
///
/// - `api`: Endpoint family (text completions or chat completions).
/// - `model`: The model identifier (e.g., `"gpt-3.5-turbo-instruct"`).
/// - `endpoint`: API base without the `/v1/...` suffix.
/// - `api_key`: API key sent as a bearer token.
/// - `max_tokens`: Maximum number of tokens to generate.
/// - `temperature`: Controls randomness (0.0 = deterministic).
/// - `top_p`: Nucleus sampling cutoff (alternative to temperature).
/// - `timeout_secs`: Optional request timeout in seconds.
///
/// # Examples
///
/// ```
/// use ai_llm_service::{CompletionApi, LlmModelConfig};
///
/// let cfg = LlmModelConfig {
///     api: CompletionApi::Completions,
///     model: "gpt-3.5-turbo-instruct".to_string(),
///     endpoint: "https://api.openai.com".to_string(),
///     api_key: Some("sk-...".to_string()),
///     max_tokens: Some(512),
///     temperature: None,
///     top_p: None,
///     timeout_secs: Some(60),
/// };
/// assert_eq!(cfg.model, "gpt-3.5-turbo-instruct");
/// ```
#[derive(Debug, Clone)]
pub struct LlmModelConfig {
    pub api: CompletionApi,

    /// Model identifier string.
    pub model: String,

    /// API base (e.g., `https://api.openai.com`).
    pub endpoint: String,

    /// API key for authentication.
    pub api_key: Option<String>,

    /// Maximum number of tokens to generate.
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    pub temperature: Option<f32>,

    /// Nucleus sampling parameter.
    pub top_p: Option<f32>,

    /// Optional request timeout (in seconds).
    pub timeout_secs: Option<u64>,
}
