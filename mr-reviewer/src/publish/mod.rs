//! Publisher.
//!
//! Posts a rendered review comment back to the code host.
//!
//! - Positioned discussion when a [`DiffPosition`] is given, plain note otherwise.
//! - Dry-run: log what would be posted without calling the API.
//! - Retries only refusals (429/503), so a retry never duplicates a comment.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::ReviewConfig;
use crate::errors::MrResult;
use crate::git_providers::{ChangeRequestId, CodeHost, DiffPosition};
use crate::retry::{RetryConfig, RetryPolicy, guarded};

/// Configuration for the publishing step.
#[derive(Debug, Clone)]
pub struct PublishConfig {
    /// If true, do not send anything; just log what would be posted.
    pub dry_run: bool,
    pub call_timeout: Duration,
    pub retry: RetryConfig,
}

impl From<&ReviewConfig> for PublishConfig {
    fn from(cfg: &ReviewConfig) -> Self {
        Self {
            dry_run: cfg.dry_run,
            call_timeout: cfg.call_timeout,
            retry: cfg.retry.clone(),
        }
    }
}

/// What happened to a comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Published {
    Note { note_id: u64 },
    Discussion { discussion_id: String },
    DryRun,
}

/// Posts `body` on merge request `id`.
pub async fn publish<H: CodeHost>(
    host: &H,
    id: &ChangeRequestId,
    body: &str,
    position: Option<&DiffPosition>,
    cfg: &PublishConfig,
    cancel: &CancellationToken,
) -> MrResult<Published> {
    if cfg.dry_run {
        info!(
            mr = %id,
            path = position.map(|p| p.new_path.as_str()),
            "dry-run: would post comment:\n{body}"
        );
        return Ok(Published::DryRun);
    }

    let t0 = Instant::now();
    let published = match position {
        Some(pos) => {
            let discussion_id = guarded(
                "post_discussion",
                cancel,
                cfg.call_timeout,
                &cfg.retry,
                RetryPolicy::Write,
                || host.post_discussion(id, body, pos),
            )
            .await?;
            Published::Discussion { discussion_id }
        }
        None => {
            let note_id = guarded(
                "post_note",
                cancel,
                cfg.call_timeout,
                &cfg.retry,
                RetryPolicy::Write,
                || host.post_note(id, body),
            )
            .await?;
            Published::Note { note_id }
        }
    };

    info!(
        mr = %id,
        path = position.map(|p| p.new_path.as_str()),
        latency_ms = t0.elapsed().as_millis() as u64,
        "comment posted: {published:?}"
    );
    Ok(published)
}
