//! Run configuration, read once from the environment.
//!
//! Everything the pipeline needs is collected into an immutable
//! [`AppConfig`] and passed down explicitly; no component reads the process
//! environment on its own.

use std::str::FromStr;
use std::time::Duration;

use ai_llm_service::LlmModelConfig;
use ai_llm_service::config::default_config::config_openai_from_lookup;
use git_context_engine::{GitContextEngineError, MergeRequestState, ProviderConfig};
use tracing::debug;

use crate::errors::{ConfigError, Error, MrResult};
use crate::retry::RetryConfig;

pub const DEFAULT_COMMENT_HEADER: &str = "Code review by ChatGPT:";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// How changes are grouped into prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    /// One prompt (and at most one comment) per changed file.
    #[default]
    PerFile,
    /// One prompt covering every change of a merge request.
    PerMergeRequest,
}

impl FromStr for Granularity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" | "per_file" => Ok(Self::PerFile),
            "merge_request" | "mr" | "per_merge_request" => Ok(Self::PerMergeRequest),
            other => Err(ConfigError::InvalidValue {
                var: "REVIEW_GRANULARITY",
                reason: format!("expected `file` or `merge_request`, got `{other}`"),
            }),
        }
    }
}

/// How review text is posted back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentMode {
    /// Discussion anchored on line 1 of the reviewed file.
    #[default]
    Discussion,
    /// Plain, unpositioned merge request note.
    Note,
}

impl FromStr for CommentMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discussion" | "inline" => Ok(Self::Discussion),
            "note" => Ok(Self::Note),
            other => Err(ConfigError::InvalidValue {
                var: "REVIEW_COMMENT_MODE",
                reason: format!("expected `discussion` or `note`, got `{other}`"),
            }),
        }
    }
}

/// Pipeline knobs.
#[derive(Debug, Clone)]
pub struct ReviewConfig {
    /// GitLab project ID or "group/project" path.
    pub project: String,
    pub state: MergeRequestState,
    pub granularity: Granularity,
    pub comment_mode: CommentMode,
    /// Attribution line placed above the generated text.
    pub comment_header: String,
    /// Log comments instead of posting them.
    pub dry_run: bool,
    /// Deadline for a single external call attempt.
    pub call_timeout: Duration,
    pub retry: RetryConfig,
}

impl ReviewConfig {
    /// Defaults for `project`; mostly useful for tests and embedding.
    pub fn for_project(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            state: MergeRequestState::default(),
            granularity: Granularity::default(),
            comment_mode: CommentMode::default(),
            comment_header: DEFAULT_COMMENT_HEADER.to_string(),
            dry_run: false,
            call_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryConfig::default(),
        }
    }

    /// Rejects combinations the pipeline cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.granularity == Granularity::PerMergeRequest
            && self.comment_mode == CommentMode::Discussion
        {
            return Err(ConfigError::Incompatible(
                "REVIEW_GRANULARITY=merge_request requires REVIEW_COMMENT_MODE=note \
                 (a positioned discussion anchors to a single file)",
            ));
        }
        Ok(())
    }
}

/// Complete configuration of one run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gitlab: ProviderConfig,
    pub llm: LlmModelConfig,
    pub review: ReviewConfig,
}

impl AppConfig {
    pub fn from_env() -> MrResult<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Builds the configuration from `lookup`.
    ///
    /// Credentials are checked first (GitLab token, then OpenAI key), so a
    /// missing credential is reported before anything else.
    pub fn from_lookup<F>(lookup: F) -> MrResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut gitlab = ProviderConfig::from_lookup(&lookup, DEFAULT_TIMEOUT_SECS)?;
        let mut llm = config_openai_from_lookup(&lookup, DEFAULT_TIMEOUT_SECS)?;

        let timeout_secs = parse_or(&lookup, "HTTP_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                var: "HTTP_TIMEOUT_SECS",
                reason: "must be greater than zero".into(),
            }
            .into());
        }
        gitlab.timeout_secs = timeout_secs;
        llm.timeout_secs = Some(timeout_secs);

        let project = value(&lookup, "GITLAB_PROJECT_ID")
            .ok_or(ConfigError::MissingVar("GITLAB_PROJECT_ID"))?;

        let state = match value(&lookup, "REVIEW_MR_STATE") {
            Some(v) => v.parse::<MergeRequestState>().map_err(|e| match e {
                GitContextEngineError::Validation(reason) => Error::from(ConfigError::InvalidValue {
                    var: "REVIEW_MR_STATE",
                    reason,
                }),
                other => Error::from(other),
            })?,
            None => MergeRequestState::default(),
        };

        let granularity = match value(&lookup, "REVIEW_GRANULARITY") {
            Some(v) => v.parse::<Granularity>()?,
            None => Granularity::default(),
        };

        let comment_mode = match value(&lookup, "REVIEW_COMMENT_MODE") {
            Some(v) => v.parse::<CommentMode>()?,
            None => CommentMode::default(),
        };

        let comment_header = value(&lookup, "REVIEW_COMMENT_HEADER")
            .unwrap_or_else(|| DEFAULT_COMMENT_HEADER.to_string());

        let dry_run = match value(&lookup, "REVIEW_DRY_RUN") {
            Some(v) => parse_bool("REVIEW_DRY_RUN", &v)?,
            None => false,
        };

        let defaults = RetryConfig::default();
        let retry = RetryConfig {
            max_retries: parse_or(&lookup, "RETRY_MAX_RETRIES", defaults.max_retries as u64)?
                as usize,
            min_delay: Duration::from_millis(parse_or(
                &lookup,
                "RETRY_MIN_DELAY_MS",
                defaults.min_delay.as_millis() as u64,
            )?),
            max_delay: defaults.max_delay,
        };

        let review = ReviewConfig {
            project,
            state,
            granularity,
            comment_mode,
            comment_header,
            dry_run,
            call_timeout: Duration::from_secs(timeout_secs),
            retry,
        };

        review.validate()?;

        debug!(
            project = %review.project,
            state = review.state.as_query(),
            granularity = ?review.granularity,
            comment_mode = ?review.comment_mode,
            model = %llm.model,
            api = ?llm.api,
            dry_run = review.dry_run,
            "configuration loaded"
        );

        Ok(Self {
            gitlab,
            llm,
            review,
        })
    }
}

fn value<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<F>(lookup: &F, name: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match value(lookup, name) {
        Some(v) => v.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
            var: name,
            reason: format!("expected a non-negative integer, got `{v}`"),
        }),
        None => Ok(default),
    }
}

fn parse_bool(name: &'static str, v: &str) -> Result<bool, ConfigError> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var: name,
            reason: format!("expected a boolean, got `{v}`"),
        }),
    }
}
