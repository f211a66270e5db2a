//! Crate-wide error hierarchy for mr-reviewer.
//!
//! Goals:
//! - Single root `Error` for all public functions.
//! - Provider and completion failures wrapped as-is, so their status mapping
//!   (401→Unauthorized, 429→RateLimited, 5xx→Server, etc.) survives.
//! - Transient/non-transient classification for the retry layer.

use std::time::Duration;

use ai_llm_service::AiLlmError;
use git_context_engine::GitContextEngineError;
use git_context_engine::errors::GitContextEngineProviderError;
use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type MrResult<T> = Result<T, Error>;

/// Root error type for the mr-reviewer crate.
#[derive(Debug, Error)]
pub enum Error {
    /// GitLab related failure.
    #[error(transparent)]
    Provider(#[from] GitContextEngineError),

    /// Completion API related failure.
    #[error(transparent)]
    Llm(#[from] AiLlmError),

    /// Configuration problems (missing variables, bad values).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Diff versions could not anchor a positioned comment.
    #[error("merge request !{iid} has no diff version to anchor a discussion")]
    MissingDiffVersion { iid: u64 },

    /// An external call did not finish within the per-call deadline.
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    /// The run was cancelled (Ctrl+C).
    #[error("cancelled")]
    Cancelled,

    /// Input validation errors.
    #[error("validation error: {0}")]
    Validation(String),
}

impl Error {
    /// True for failures that may succeed when the same call is repeated.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Provider(e) => e.is_transient(),
            Error::Llm(e) => e.is_transient(),
            Error::Timeout(_) => true,
            _ => false,
        }
    }

    /// True when the remote side refused a write without processing it.
    pub fn is_rejected(&self) -> bool {
        match self {
            Error::Provider(e) => e.is_rejected(),
            _ => false,
        }
    }

    /// Server-requested wait from a `Retry-After` header, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::Provider(GitContextEngineError::Provider(
                GitContextEngineProviderError::RateLimited {
                    retry_after_secs: Some(secs),
                },
            )) => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }
}

/// Configuration errors raised while reading the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },

    #[error("{0}")]
    Incompatible(&'static str),
}
