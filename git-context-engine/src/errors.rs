//! Crate-wide error hierarchy for git-context-engine.

use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type GitContextEngineResult<T> = Result<T, GitContextEngineError>;

/// Root error type for the git-context-engine crate.
#[derive(Debug, Error)]
pub enum GitContextEngineError {
    /// GitLab API related failure.
    #[error(transparent)]
    Provider(#[from] GitContextEngineProviderError),

    /// Configuration problems (bad/missing tokens, base URL, etc.).
    #[error(transparent)]
    Config(#[from] GitContextEngineConfigError),

    /// Input validation errors (bad IDs, unsupported values, etc.).
    #[error("validation error: {0}")]
    Validation(String),
}

impl GitContextEngineError {
    /// True for failures that may succeed when the same request is repeated.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_transient(),
            _ => false,
        }
    }

    /// True when the provider refused the request without processing it
    /// (429 / 503), so repeating a write cannot create a duplicate.
    pub fn is_rejected(&self) -> bool {
        matches!(
            self,
            Self::Provider(GitContextEngineProviderError::RateLimited { .. })
                | Self::Provider(GitContextEngineProviderError::Server(503))
        )
    }
}

/// Provider-specific error used inside the provider layer.
#[derive(Debug, Error)]
pub enum GitContextEngineProviderError {
    /// Unauthorized (HTTP 401).
    #[error("unauthorized")]
    Unauthorized,

    /// Forbidden (HTTP 403).
    #[error("forbidden")]
    Forbidden,

    /// Not found (HTTP 404).
    #[error("not found")]
    NotFound,

    /// Rate limited (HTTP 429).
    #[error("rate limited")]
    RateLimited {
        /// Optional `Retry-After` hint in seconds when available.
        retry_after_secs: Option<u64>,
    },

    /// Gateway / server error (HTTP 5xx).
    #[error("server error: status {0}")]
    Server(u16),

    /// Other HTTP status (non-2xx) not covered by specific variants.
    #[error("http status error: status {0}")]
    HttpStatus(u16),

    /// Timeout at transport level.
    #[error("timeout")]
    Timeout,

    /// Network/transport failure without HTTP status (DNS/connect/reset).
    #[error("network error: {0}")]
    Network(String),

    /// Unexpected/invalid shape of provider response.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl GitContextEngineProviderError {
    /// Maps a non-success HTTP status (plus an optional `Retry-After` value)
    /// onto a provider error.
    pub fn from_status(code: u16, retry_after_secs: Option<u64>) -> Self {
        match code {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            429 => Self::RateLimited { retry_after_secs },
            500..=599 => Self::Server(code),
            _ => Self::HttpStatus(code),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Server(_) | Self::Timeout | Self::Network(_)
        )
    }
}

/// Configuration and setup errors (base API URL, missing token, etc.).
#[derive(Debug, Error)]
pub enum GitContextEngineConfigError {
    /// Missing required provider access token.
    #[error("missing GitLab API token (GITLAB_API_TOKEN)")]
    MissingToken,

    /// Invalid base API URL.
    #[error("invalid base api url: {0}")]
    InvalidBaseUrl(String),
}

// ===== Conversions for `?` ergonomics at the crate root =====

impl From<reqwest::Error> for GitContextEngineError {
    fn from(e: reqwest::Error) -> Self {
        GitContextEngineError::Provider(GitContextEngineProviderError::from(e))
    }
}

// ===== Mapping from reqwest::Error into GitContextEngineProviderError =====

impl From<reqwest::Error> for GitContextEngineProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return GitContextEngineProviderError::Timeout;
        }

        if let Some(status) = e.status() {
            return GitContextEngineProviderError::from_status(status.as_u16(), None);
        }

        if e.is_decode() {
            return GitContextEngineProviderError::InvalidResponse(e.to_string());
        }

        GitContextEngineProviderError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(
            GitContextEngineProviderError::from_status(401, None),
            GitContextEngineProviderError::Unauthorized
        ));
        assert!(matches!(
            GitContextEngineProviderError::from_status(429, Some(3)),
            GitContextEngineProviderError::RateLimited {
                retry_after_secs: Some(3)
            }
        ));
        assert!(matches!(
            GitContextEngineProviderError::from_status(502, None),
            GitContextEngineProviderError::Server(502)
        ));
        assert!(matches!(
            GitContextEngineProviderError::from_status(422, None),
            GitContextEngineProviderError::HttpStatus(422)
        ));
    }

    #[test]
    fn transient_and_rejected_classes() {
        let limited: GitContextEngineError =
            GitContextEngineProviderError::from_status(429, None).into();
        assert!(limited.is_transient());
        assert!(limited.is_rejected());

        let gateway: GitContextEngineError = GitContextEngineProviderError::Server(502).into();
        assert!(gateway.is_transient());
        assert!(!gateway.is_rejected());

        let timeout: GitContextEngineError = GitContextEngineProviderError::Timeout.into();
        assert!(timeout.is_transient());
        assert!(!timeout.is_rejected());

        let missing: GitContextEngineError = GitContextEngineProviderError::NotFound.into();
        assert!(!missing.is_transient());
    }
}
