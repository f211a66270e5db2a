//! OpenAI service for review text generation.
//!
//! Minimal, non-streaming client around the OpenAI REST API.
//! Endpoints are derived from `LlmModelConfig::endpoint`:
//! - POST {endpoint}/v1/completions      : legacy text completion (`choices[0].text`)
//! - POST {endpoint}/v1/chat/completions : chat completion (`choices[0].message.content`)
//!
//! Constructor validation:
//! - `cfg.api_key` must be present
//! - `cfg.model` must not be blank
//! - `cfg.endpoint` must start with http:// or https://
//!
//! Errors are normalized via unified error types in `error_handler`.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::{
    config::{completion_api::CompletionApi, llm_model_config::LlmModelConfig},
    error_handler::{AiLlmError, ConfigError, HttpError, ProviderError, make_snippet},
};

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Thin client for the OpenAI API.
///
/// Constructed from a complete [`LlmModelConfig`]. Internally keeps a
/// preconfigured `reqwest::Client` (with timeout and default headers).
#[derive(Debug)]
pub struct OpenAiService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url: String,
    timeout: Duration,
}

impl OpenAiService {
    /// Creates a new [`OpenAiService`] from the given config.
    ///
    /// Validates the API key, model and endpoint scheme. Builds an HTTP
    /// client with default headers and a configurable timeout.
    ///
    /// # Errors
    /// - [`ProviderError::MissingApiKey`] if `cfg.api_key` is `None`
    /// - [`ConfigError::EmptyModel`] if `cfg.model` is blank
    /// - [`ProviderError::InvalidEndpoint`] if `cfg.endpoint` is invalid
    /// - [`AiLlmError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        // 1) API key must be present.
        let api_key = cfg
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ProviderError::MissingApiKey)?;

        // 2) Model must be named.
        if cfg.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel.into());
        }

        // 3) Endpoint must use http/https.
        let endpoint = cfg.endpoint.trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(ProviderError::InvalidEndpoint(cfg.endpoint.clone()).into());
        }

        // 4) HTTP client: timeout + default headers.
        let timeout = Duration::from_secs(cfg.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", api_key.trim())).map_err(|e| {
                ProviderError::Decode(format!("invalid API key header: {e}"))
            })?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        // Accept bases with or without a trailing `/v1`.
        let base = endpoint.trim_end_matches('/');
        let base = base.strip_suffix("/v1").unwrap_or(base);
        let url = match cfg.api {
            CompletionApi::Completions => format!("{}/v1/completions", base),
            CompletionApi::Chat => format!("{}/v1/chat/completions", base),
        };

        info!(
            api = ?cfg.api,
            model = %cfg.model,
            endpoint = %cfg.endpoint,
            timeout_secs = timeout.as_secs(),
            "OpenAiService initialized"
        );

        Ok(Self {
            client,
            cfg,
            url,
            timeout,
        })
    }

    /// Model identifier requests are sent with.
    pub fn model(&self) -> &str {
        &self.cfg.model
    }

    /// Sends `prompt` and returns the text of the first completion choice.
    ///
    /// # Errors
    /// - [`ProviderError::HttpStatus`] for non-2xx responses
    /// - [`AiLlmError::Timeout`] when the request exceeds the client timeout
    /// - [`AiLlmError::HttpTransport`] for other client/network failures
    /// - [`ProviderError::Decode`] if the JSON cannot be parsed
    /// - [`ProviderError::EmptyChoices`] if no choices are returned
    pub async fn complete(&self, prompt: &str) -> Result<String, AiLlmError> {
        let started = Instant::now();

        debug!(
            api = ?self.cfg.api,
            model = %self.cfg.model,
            prompt_len = prompt.len(),
            "POST {}", self.url
        );

        let req = self.client.post(&self.url);
        let req = match self.cfg.api {
            CompletionApi::Completions => req.json(&CompletionRequest::from_cfg(&self.cfg, prompt)),
            CompletionApi::Chat => req.json(&ChatCompletionRequest::from_cfg(&self.cfg, prompt)),
        };

        let resp = req.send().await.map_err(|e| self.transport_error(e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url.clone();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);

            error!(
                %status,
                %url,
                %snippet,
                model = %self.cfg.model,
                latency_ms = started.elapsed().as_millis(),
                "OpenAI completion endpoint returned non-success status"
            );

            return Err(ProviderError::HttpStatus(HttpError {
                status,
                url,
                snippet,
            })
            .into());
        }

        let text = match self.cfg.api {
            CompletionApi::Completions => {
                let out: CompletionResponse = self.decode(resp, "choices[0].text", started).await?;
                out.choices.into_iter().next().map(|c| c.text)
            }
            CompletionApi::Chat => {
                let out: ChatCompletionResponse = self
                    .decode(resp, "choices[0].message.content", started)
                    .await?;
                out.choices
                    .into_iter()
                    .next()
                    .map(|c| c.message.content.unwrap_or_default())
            }
        }
        .ok_or(ProviderError::EmptyChoices)?;

        info!(
            model = %self.cfg.model,
            latency_ms = started.elapsed().as_millis(),
            completion_len = text.len(),
            "completion finished"
        );

        Ok(text)
    }

    fn transport_error(&self, e: reqwest::Error) -> AiLlmError {
        if e.is_timeout() {
            AiLlmError::Timeout(self.timeout)
        } else {
            AiLlmError::HttpTransport(e)
        }
    }

    async fn decode<T: for<'de> Deserialize<'de>>(
        &self,
        resp: reqwest::Response,
        expected: &str,
        started: Instant,
    ) -> Result<T, AiLlmError> {
        match resp.json::<T>().await {
            Ok(v) => Ok(v),
            Err(e) => {
                error!(
                    error = %e,
                    model = %self.cfg.model,
                    latency_ms = started.elapsed().as_millis(),
                    "failed to decode completion response"
                );
                Err(ProviderError::Decode(format!("serde error: {e}; expected `{expected}`")).into())
            }
        }
    }
}

/* ===========================================================================
HTTP payloads & options
======================================================================== */

/// Request body for `/v1/completions`.
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

impl<'a> CompletionRequest<'a> {
    fn from_cfg(cfg: &'a LlmModelConfig, prompt: &'a str) -> Self {
        Self {
            model: &cfg.model,
            prompt,
            temperature: cfg.temperature,
            top_p: cfg.top_p,
            max_tokens: cfg.max_tokens,
        }
    }
}

/// Minimal request body for `/v1/chat/completions` (non-streaming).
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

impl<'a> ChatCompletionRequest<'a> {
    /// Single user message carrying the whole review prompt.
    fn from_cfg(cfg: &'a LlmModelConfig, prompt: &'a str) -> Self {
        Self {
            model: &cfg.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: cfg.temperature,
            top_p: cfg.top_p,
            max_tokens: cfg.max_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageOut,
}

#[derive(Debug, Deserialize)]
struct ChatMessageOut {
    content: Option<String>,
}
