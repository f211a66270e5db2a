//! Deadline, cancellation and bounded retry around single external calls.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::errors::{Error, MrResult};

/// Backoff knobs for transient failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt; `0` disables retrying.
    pub max_retries: usize,
    /// Delay before the first retry; doubled on each further retry.
    pub min_delay: Duration,
    /// Upper bound for a single backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

/// Which failures a call may be repeated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Reads and completions: any transient failure.
    Idempotent,
    /// Comment creation: only refusals (429/503) that created nothing.
    Write,
}

impl RetryPolicy {
    fn should_retry(self, err: &Error) -> bool {
        match self {
            RetryPolicy::Idempotent => err.is_transient(),
            RetryPolicy::Write => err.is_rejected(),
        }
    }
}

/// Runs `op` with a per-attempt deadline and bounded exponential backoff,
/// racing the whole thing against `cancel`.
///
/// A `Retry-After` hint on a failed attempt holds the next attempt back by
/// that long, capped at `retry.max_delay`.
pub async fn guarded<T, F, Fut>(
    what: &str,
    cancel: &CancellationToken,
    deadline: Duration,
    retry: &RetryConfig,
    policy: RetryPolicy,
    mut op: F,
) -> MrResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = MrResult<T>>,
{
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let hold_off_ms = AtomicU64::new(0);
    let max_hold_off = retry.max_delay;

    let attempt = || {
        let hold_off = Duration::from_millis(hold_off_ms.swap(0, Ordering::Relaxed));
        let hold_off_ms = &hold_off_ms;
        let fut = op();
        async move {
            if !hold_off.is_zero() {
                tokio::time::sleep(hold_off).await;
            }
            let res = match tokio::time::timeout(deadline, fut).await {
                Ok(res) => res,
                Err(_) => Err(Error::Timeout(deadline)),
            };
            if let Some(wait) = res.as_ref().err().and_then(Error::retry_after) {
                let wait = wait.min(max_hold_off);
                hold_off_ms.store(wait.as_millis() as u64, Ordering::Relaxed);
            }
            res
        }
    };

    let backoff = ExponentialBuilder::default()
        .with_min_delay(retry.min_delay)
        .with_max_delay(retry.max_delay)
        .with_max_times(retry.max_retries)
        .with_jitter();

    let retried = attempt
        .retry(backoff)
        .when(|e: &Error| policy.should_retry(e))
        .notify(|e: &Error, dur: Duration| {
            warn!(call = what, error = %e, retry_in_ms = dur.as_millis(), "transient failure, retrying");
        });

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        res = retried => res,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use git_context_engine::GitContextEngineError;
    use git_context_engine::errors::GitContextEngineProviderError;

    use super::*;

    fn fast_retry(max_retries: usize) -> RetryConfig {
        RetryConfig {
            max_retries,
            min_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    fn provider(e: GitContextEngineProviderError) -> Error {
        Error::Provider(GitContextEngineError::Provider(e))
    }

    #[tokio::test]
    async fn retries_transient_until_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();

        let c = calls.clone();
        let out = guarded(
            "test",
            &token,
            Duration::from_secs(1),
            &fast_retry(3),
            RetryPolicy::Idempotent,
            move || {
                let c = c.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(provider(GitContextEngineProviderError::Server(502)))
                    } else {
                        Ok(7)
                    }
                }
            },
        )
        .await;

        assert_eq!(out.ok(), Some(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_permanent_errors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();

        let c = calls.clone();
        let out: MrResult<()> = guarded(
            "test",
            &token,
            Duration::from_secs(1),
            &fast_retry(3),
            RetryPolicy::Idempotent,
            move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(provider(GitContextEngineProviderError::NotFound))
                }
            },
        )
        .await;

        assert!(out.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn writes_retry_only_when_rejected() {
        let token = CancellationToken::new();

        let timeouts = Arc::new(AtomicUsize::new(0));
        let c = timeouts.clone();
        let _: MrResult<()> = guarded(
            "post",
            &token,
            Duration::from_secs(1),
            &fast_retry(3),
            RetryPolicy::Write,
            move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(provider(GitContextEngineProviderError::Timeout))
                }
            },
        )
        .await;
        assert_eq!(timeouts.load(Ordering::SeqCst), 1);

        let limited = Arc::new(AtomicUsize::new(0));
        let c = limited.clone();
        let _: MrResult<()> = guarded(
            "post",
            &token,
            Duration::from_secs(1),
            &fast_retry(2),
            RetryPolicy::Write,
            move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(provider(GitContextEngineProviderError::RateLimited {
                        retry_after_secs: None,
                    }))
                }
            },
        )
        .await;
        assert_eq!(limited.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_after_hint_delays_next_attempt() {
        let token = CancellationToken::new();
        let retry = RetryConfig {
            max_retries: 1,
            min_delay: Duration::from_millis(1),
            max_delay: Duration::from_secs(5),
        };

        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let started = std::time::Instant::now();
        let out = guarded(
            "post",
            &token,
            Duration::from_secs(5),
            &retry,
            RetryPolicy::Write,
            move || {
                let c = c.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(provider(GitContextEngineProviderError::RateLimited {
                            retry_after_secs: Some(1),
                        }))
                    } else {
                        Ok("posted")
                    }
                }
            },
        )
        .await;

        assert_eq!(out.ok(), Some("posted"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test]
    async fn retry_after_hint_is_capped_by_max_delay() {
        let token = CancellationToken::new();
        let started = std::time::Instant::now();
        let out: MrResult<()> = guarded(
            "post",
            &token,
            Duration::from_secs(5),
            &fast_retry(1),
            RetryPolicy::Write,
            || async {
                Err(provider(GitContextEngineProviderError::RateLimited {
                    retry_after_secs: Some(3600),
                }))
            },
        )
        .await;

        assert!(out.is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn slow_call_hits_deadline() {
        let token = CancellationToken::new();
        let out: MrResult<()> = guarded(
            "slow",
            &token,
            Duration::from_millis(10),
            &fast_retry(0),
            RetryPolicy::Idempotent,
            || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
        )
        .await;

        assert!(matches!(out, Err(Error::Timeout(_))));
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let token = CancellationToken::new();
        token.cancel();

        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let out: MrResult<()> = guarded(
            "x",
            &token,
            Duration::from_secs(1),
            &fast_retry(0),
            RetryPolicy::Idempotent,
            move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
        )
        .await;

        assert!(matches!(out, Err(Error::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
