//! Public entry for the mr-reviewer pipeline.
//!
//! Single high-level function to review every matching merge request of a
//! project:
//!
//! 1) **List** merge requests for the configured project and state filter.
//! 2) **Fetch** the file-level changes of each merge request (plus the diff
//!    versions when comments are positioned).
//! 3) **Prompt** per file or per merge request, and **generate** review text.
//! 4) **Filter** "no issue" answers and **publish** the rest as a note or a
//!    positioned discussion.
//!
//! Only a listing failure aborts the run. Failures while fetching a merge
//! request skip that merge request; failures while generating or posting skip
//! that unit. Nothing crosses a merge request boundary.
//!
//! The pipeline is generic over the [`CodeHost`] and [`ReviewGenerator`]
//! capabilities and avoids `async-trait` and heap trait objects.

pub mod config;
pub mod errors;
pub mod git_providers;
pub mod publish;
pub mod retry;
pub mod review;


use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use config::{CommentMode, ReviewConfig};
use errors::{Error, MrResult};
use git_providers::{ChangeRequestId, CodeHost, DiffPosition, DiffVersion, MergeRequest};
use publish::{PublishConfig, Published, publish};
use retry::{RetryPolicy, guarded};
use review::llm::ReviewGenerator;
use review::policy::{Suppression, render_comment, suppression};
use review::{ReviewUnit, plan_units};

/// Comments are anchored on this line of the reviewed file.
pub const DISCUSSION_LINE: u32 = 1;

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Merge requests that passed the state filter.
    pub merge_requests: usize,
    /// Merge requests skipped because their changes or versions failed.
    pub merge_requests_failed: usize,
    /// Units for which the model produced text.
    pub units_reviewed: usize,
    pub comments_posted: usize,
    pub comments_dry_run: usize,
    pub comments_suppressed: usize,
    /// Units whose generation or posting failed.
    pub unit_failures: usize,
}

/// Outcome of one review unit.
#[derive(Debug, Clone, PartialEq, Eq)]
enum UnitOutcome {
    Published(Published),
    Suppressed(Suppression),
}

/// Reviews every merge request of `cfg.project` matching `cfg.state`.
///
/// # Errors
/// - listing failure (after retries) or an invalid `cfg`
/// - [`Error::Cancelled`] once `cancel` fires
pub async fn run_review<H, G>(
    host: &H,
    generator: &G,
    cfg: &ReviewConfig,
    cancel: &CancellationToken,
) -> MrResult<RunReport>
where
    H: CodeHost,
    G: ReviewGenerator,
{
    cfg.validate()?;
    let t0 = Instant::now();
    let mut report = RunReport::default();

    let listed = guarded(
        "list_merge_requests",
        cancel,
        cfg.call_timeout,
        &cfg.retry,
        RetryPolicy::Idempotent,
        || host.list_merge_requests(&cfg.project, cfg.state),
    )
    .await?;

    let total = listed.len();
    let merge_requests: Vec<MergeRequest> = listed
        .into_iter()
        .filter(|mr| cfg.state.accepts(&mr.state))
        .collect();
    info!(
        project = %cfg.project,
        state = cfg.state.as_query(),
        listed = total,
        matching = merge_requests.len(),
        "merge requests listed"
    );

    for mr in &merge_requests {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        report.merge_requests += 1;

        let id = ChangeRequestId {
            project: cfg.project.clone(),
            iid: mr.iid,
        };
        match review_merge_request(host, generator, cfg, cancel, &id, &mut report).await {
            Ok(()) => {}
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                report.merge_requests_failed += 1;
                error!(mr = %id, error = %e, "skipping merge request #{}", mr.iid);
            }
        }
    }

    info!(
        merge_requests = report.merge_requests,
        merge_requests_failed = report.merge_requests_failed,
        units_reviewed = report.units_reviewed,
        comments_posted = report.comments_posted,
        comments_dry_run = report.comments_dry_run,
        comments_suppressed = report.comments_suppressed,
        unit_failures = report.unit_failures,
        latency_ms = t0.elapsed().as_millis() as u64,
        "review run finished"
    );
    Ok(report)
}

/// Fetches one merge request and reviews each of its units.
///
/// Returns an error only for merge-request level failures; unit failures are
/// logged and counted in `report`.
async fn review_merge_request<H, G>(
    host: &H,
    generator: &G,
    cfg: &ReviewConfig,
    cancel: &CancellationToken,
    id: &ChangeRequestId,
    report: &mut RunReport,
) -> MrResult<()>
where
    H: CodeHost,
    G: ReviewGenerator,
{
    let changes = guarded(
        "fetch_changes",
        cancel,
        cfg.call_timeout,
        &cfg.retry,
        RetryPolicy::Idempotent,
        || host.fetch_changes(id),
    )
    .await?;
    debug!(iid = id.iid, changes = changes.len(), "changes fetched");

    if changes.is_empty() {
        info!(iid = id.iid, "Review for merge request #{}: no changes to review", id.iid);
        return Ok(());
    }
    let units = plan_units(&changes, cfg.granularity);

    let version = match cfg.comment_mode {
        CommentMode::Discussion => Some(latest_version(host, cfg, cancel, id).await?),
        CommentMode::Note => None,
    };

    let publish_cfg = PublishConfig::from(cfg);
    for unit in &units {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match review_unit(
            host,
            generator,
            cfg,
            &publish_cfg,
            cancel,
            id,
            unit,
            version.as_ref(),
        )
        .await
        {
            Ok(UnitOutcome::Published(Published::DryRun)) => {
                report.units_reviewed += 1;
                report.comments_dry_run += 1;
            }
            Ok(UnitOutcome::Published(_)) => {
                report.units_reviewed += 1;
                report.comments_posted += 1;
            }
            Ok(UnitOutcome::Suppressed(_)) => {
                report.units_reviewed += 1;
                report.comments_suppressed += 1;
            }
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                report.unit_failures += 1;
                error!(iid = id.iid, path = unit.label(), error = %e, "review unit failed");
            }
        }
    }
    Ok(())
}

/// First (newest) diff version, with usable commit SHAs.
async fn latest_version<H: CodeHost>(
    host: &H,
    cfg: &ReviewConfig,
    cancel: &CancellationToken,
    id: &ChangeRequestId,
) -> MrResult<DiffVersion> {
    let versions = guarded(
        "fetch_diff_versions",
        cancel,
        cfg.call_timeout,
        &cfg.retry,
        RetryPolicy::Idempotent,
        || host.fetch_diff_versions(id),
    )
    .await?;

    versions
        .into_iter()
        .next()
        .filter(DiffVersion::has_all_commits)
        .ok_or(Error::MissingDiffVersion { iid: id.iid })
}

#[allow(clippy::too_many_arguments)]
async fn review_unit<H, G>(
    host: &H,
    generator: &G,
    cfg: &ReviewConfig,
    publish_cfg: &PublishConfig,
    cancel: &CancellationToken,
    id: &ChangeRequestId,
    unit: &ReviewUnit,
    version: Option<&DiffVersion>,
) -> MrResult<UnitOutcome>
where
    H: CodeHost,
    G: ReviewGenerator,
{
    let text = guarded(
        "generate",
        cancel,
        cfg.call_timeout,
        &cfg.retry,
        RetryPolicy::Idempotent,
        || generator.generate(&unit.prompt.text),
    )
    .await?;

    let comment = render_comment(&cfg.comment_header, &text);
    info!(iid = id.iid, path = unit.label(), "Review for merge request #{}:\n{}", id.iid, comment);

    if let Some(reason) = suppression(&text) {
        info!(iid = id.iid, path = unit.label(), ?reason, "comment suppressed");
        return Ok(UnitOutcome::Suppressed(reason));
    }

    let position = match (version, &unit.anchor) {
        (Some(v), Some(change)) => Some(DiffPosition::for_change(v, change, DISCUSSION_LINE)),
        (Some(_), None) => {
            warn!(iid = id.iid, "no file to anchor a discussion to");
            return Err(Error::Validation(
                "positioned discussion requires a per-file review unit".into(),
            ));
        }
        (None, _) => None,
    };

    let published = publish(host, id, &comment, position.as_ref(), publish_cfg, cancel).await?;
    Ok(UnitOutcome::Published(published))
}
