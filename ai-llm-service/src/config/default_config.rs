//! Default OpenAI config loaded from environment variables.
//!
//! # Environment variables
//!
//! - `OPENAI_API_KEY`     = API key (mandatory)
//! - `OPENAI_API_BASE`    = endpoint base, default `https://api.openai.com`
//! - `OPENAI_MODEL`       = model, default `gpt-3.5-turbo-instruct`
//! - `OPENAI_API_STYLE`   = `completions` (default) or `chat`
//! - `OPENAI_MAX_TOKENS`  = max tokens (u32), default 512
//! - `OPENAI_TEMPERATURE` = optional sampling temperature in `0.0..=2.0`
//! - `OPENAI_TOP_P`       = optional nucleus sampling cutoff in `0.0..=1.0`

use crate::{
    config::{completion_api::CompletionApi, llm_model_config::LlmModelConfig},
    error_handler::{
        Result, lookup_opt_f32, lookup_opt_u32, must_lookup, validate_http_endpoint,
        validate_range_f32,
    },
};

pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo-instruct";
pub const DEFAULT_MAX_TOKENS: u32 = 512;

/// Constructs the review model config, reading variables through `lookup`
/// (usually `std::env::var`).
///
/// # Errors
/// - `MissingVar("OPENAI_API_KEY")` if the key is absent or blank
/// - `InvalidFormat` for a non-http endpoint or unknown API style
/// - `InvalidNumber` / `OutOfRange` for bad numeric values
pub fn config_openai_from_lookup<F>(lookup: F, timeout_secs: u64) -> Result<LlmModelConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let api_key = must_lookup(&lookup, "OPENAI_API_KEY")?;

    let endpoint = non_blank(&lookup, "OPENAI_API_BASE")
        .unwrap_or_else(|| DEFAULT_OPENAI_ENDPOINT.to_string());
    validate_http_endpoint("OPENAI_API_BASE", &endpoint)?;

    let model =
        non_blank(&lookup, "OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());

    let api = match non_blank(&lookup, "OPENAI_API_STYLE") {
        Some(v) => v.parse::<CompletionApi>()?,
        None => CompletionApi::default(),
    };

    let max_tokens = lookup_opt_u32(&lookup, "OPENAI_MAX_TOKENS")?.unwrap_or(DEFAULT_MAX_TOKENS);

    let temperature = lookup_opt_f32(&lookup, "OPENAI_TEMPERATURE")?;
    if let Some(t) = temperature {
        validate_range_f32("temperature", t, 0.0, 2.0)?;
    }

    let top_p = lookup_opt_f32(&lookup, "OPENAI_TOP_P")?;
    if let Some(p) = top_p {
        validate_range_f32("top_p", p, 0.0, 1.0)?;
    }

    Ok(LlmModelConfig {
        api,
        model,
        endpoint,
        api_key: Some(api_key),
        max_tokens: Some(max_tokens),
        temperature,
        top_p,
        timeout_secs: Some(timeout_secs),
    })
}

fn non_blank<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|v| !v.trim().is_empty())
}
