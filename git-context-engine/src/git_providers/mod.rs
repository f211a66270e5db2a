//! GitLab provider configuration and client.
//!
//! The client only speaks GitLab REST v4; the data model in [`types`] is
//! what the review pipeline consumes.

pub mod types;
pub use types::*;

pub mod gitlab;

use tracing::debug;

use crate::errors::{GitContextEngineConfigError, GitContextEngineResult};

/// Default public GitLab API base.
pub const DEFAULT_GITLAB_API_BASE: &str = "https://gitlab.com/api/v4";

/// Runtime configuration for the GitLab client.
///
/// This configuration is usually injected from environment or higher-level
/// application settings.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// API base, e.g. "https://gitlab.com/api/v4".
    pub base_api: String,
    /// Access token for the provider (PAT or project access token).
    pub token: String,
    /// Per-request timeout applied by the HTTP client.
    pub timeout_secs: u64,
}

impl ProviderConfig {
    /// Reads `GITLAB_API_TOKEN` (required) and `GITLAB_API_BASE` (optional)
    /// through `lookup`.
    ///
    /// `timeout_secs` is owned by the caller because it is shared with the
    /// completion client.
    pub fn from_lookup<F>(lookup: F, timeout_secs: u64) -> GitContextEngineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("GITLAB_API_TOKEN")
            .filter(|v| !v.trim().is_empty())
            .ok_or(GitContextEngineConfigError::MissingToken)?;

        let base_api = lookup("GITLAB_API_BASE")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GITLAB_API_BASE.to_string());

        let trimmed = base_api.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(GitContextEngineConfigError::InvalidBaseUrl(base_api).into());
        }

        debug!(base_api = %trimmed, "GitLab provider config loaded");

        Ok(Self {
            base_api: trimmed.to_string(),
            token,
            timeout_secs,
        })
    }
}
