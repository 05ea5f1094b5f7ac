//! Retry policy for statistics requests.
//!
//! Two kinds of failure are retried:
//! - HTTP 429: wait for the server's `Retry-After` hint (or the policy
//!   default) and try again. Exhaustion surfaces as
//!   [`StatsError::RateLimitExceeded`].
//! - Transient transport failures and 5xx responses: exponential backoff
//!   `base * 2^(attempt - 1)`. Exhaustion surfaces the last error.
//!
//! Everything else (400, 401/403, other statuses, malformed bodies) is
//! returned immediately. The wait computation is the pure function
//! [`retry_delay`]; sleeping goes through [`Sleeper`] so tests never block.

use std::future::Future;
use std::time::Duration;

use crate::endpoint::Endpoint;
use crate::error::StatsError;

/// Attempt budget and wait parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub backoff_base: Duration,
    /// Wait applied to a 429 that carries no usable `Retry-After` header.
    pub default_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: Duration::from_secs(5),
            default_retry_after: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn from_config(config: &wbreport_core::AppConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_base: Duration::from_secs(config.backoff_base_secs),
            default_retry_after: Duration::from_secs(config.default_retry_after_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryKind {
    RateLimited,
    Transient,
}

/// Wait before the next attempt after failed attempt number `attempt` (1-based).
///
/// | Failed attempt | Transient (base 5 s) | Rate limited          |
/// |----------------|----------------------|-----------------------|
/// | 1              | 5 s                  | hint or default (60 s) |
/// | 2              | 10 s                 | hint or default        |
/// | 3              | 20 s                 | hint or default        |
/// | 4              | 40 s                 | hint or default        |
#[must_use]
pub fn retry_delay(
    attempt: u32,
    kind: RetryKind,
    server_hint: Option<Duration>,
    policy: &RetryPolicy,
) -> Duration {
    match kind {
        RetryKind::RateLimited => server_hint.unwrap_or(policy.default_retry_after),
        RetryKind::Transient => {
            let exponent = attempt.saturating_sub(1).min(20);
            policy.backoff_base.saturating_mul(1u32 << exponent)
        }
    }
}

/// Classifies an error as retryable, or `None` for a hard stop.
pub(crate) fn retry_kind(err: &StatsError) -> Option<RetryKind> {
    match err {
        StatsError::RateLimited { .. } => Some(RetryKind::RateLimited),
        StatsError::ServerError { .. } => Some(RetryKind::Transient),
        StatsError::Http(e)
            if e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() =>
        {
            Some(RetryKind::Transient)
        }
        _ => None,
    }
}

fn server_hint(err: &StatsError) -> Option<Duration> {
    match err {
        StatsError::RateLimited {
            retry_after_secs, ..
        } => retry_after_secs.map(Duration::from_secs),
        _ => None,
    }
}

/// Blocks the calling task between attempts.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

/// Runs `operation` until it succeeds, hits a non-retryable error, or the
/// policy's attempt budget is spent.
pub(crate) async fn retry_with_backoff<T, F, Fut, S>(
    policy: &RetryPolicy,
    sleeper: &S,
    endpoint: Endpoint,
    mut operation: F,
) -> Result<T, StatsError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StatsError>>,
    S: Sleeper,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let Some(kind) = retry_kind(&err) else {
            return Err(err);
        };

        if attempt >= policy.max_attempts {
            tracing::error!(
                %endpoint,
                attempts = attempt,
                error = %err,
                "statistics request failed after exhausting retries"
            );
            return Err(match err {
                StatsError::RateLimited { endpoint, .. } => StatsError::RateLimitExceeded {
                    endpoint,
                    attempts: attempt,
                },
                other => other,
            });
        }

        let wait = retry_delay(attempt, kind, server_hint(&err), policy);
        tracing::warn!(
            %endpoint,
            attempt,
            max_attempts = policy.max_attempts,
            wait_secs = wait.as_secs(),
            kind = ?kind,
            error = %err,
            "statistics request failed, retrying after wait"
        );
        sleeper.sleep(wait).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct RecordingSleeper {
        waits: Arc<Mutex<Vec<Duration>>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
            self.waits.lock().unwrap().push(duration);
            std::future::ready(())
        }
    }

    fn rate_limited(retry_after_secs: Option<u64>) -> StatsError {
        StatsError::RateLimited {
            endpoint: Endpoint::Sales,
            retry_after_secs,
        }
    }

    fn server_error() -> StatsError {
        StatsError::ServerError {
            endpoint: Endpoint::Sales,
            status: 503,
        }
    }

    #[test]
    fn transient_delay_doubles_from_base() {
        let policy = RetryPolicy::default();
        let waits: Vec<u64> = (1..=5)
            .map(|a| retry_delay(a, RetryKind::Transient, None, &policy).as_secs())
            .collect();
        assert_eq!(waits, vec![5, 10, 20, 40, 80]);
    }

    #[test]
    fn rate_limited_delay_prefers_server_hint() {
        let policy = RetryPolicy::default();
        assert_eq!(
            retry_delay(
                3,
                RetryKind::RateLimited,
                Some(Duration::from_secs(2)),
                &policy
            ),
            Duration::from_secs(2)
        );
        assert_eq!(
            retry_delay(1, RetryKind::RateLimited, None, &policy),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn client_errors_are_not_retryable() {
        assert_eq!(
            retry_kind(&StatsError::BadRequest {
                endpoint: Endpoint::Sales,
                body: String::new()
            }),
            None
        );
        assert_eq!(
            retry_kind(&StatsError::Unauthorized {
                endpoint: Endpoint::Sales,
                status: 401
            }),
            None
        );
        assert_eq!(
            retry_kind(&StatsError::UnexpectedStatus {
                endpoint: Endpoint::Sales,
                status: 404
            }),
            None
        );
    }

    #[tokio::test]
    async fn rate_limit_then_success_sleeps_for_hint() {
        let sleeper = RecordingSleeper::default();
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(&RetryPolicy::default(), &sleeper, Endpoint::Sales, || {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 3 {
                    Err(rate_limited(Some(2)))
                } else {
                    Ok::<u32, StatsError>(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(
            *sleeper.waits.lock().unwrap(),
            vec![Duration::from_secs(2); 3]
        );
    }

    #[tokio::test]
    async fn exhausted_rate_limit_becomes_rate_limit_exceeded() {
        let sleeper = RecordingSleeper::default();
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(&RetryPolicy::default(), &sleeper, Endpoint::Orders, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(StatsError::RateLimited {
                    endpoint: Endpoint::Orders,
                    retry_after_secs: None,
                })
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert!(matches!(
            result,
            Err(StatsError::RateLimitExceeded {
                endpoint: Endpoint::Orders,
                attempts: 5
            })
        ));
        assert_eq!(
            *sleeper.waits.lock().unwrap(),
            vec![Duration::from_secs(60); 4]
        );
    }

    #[tokio::test]
    async fn transient_errors_back_off_exponentially_and_surface_last_error() {
        let sleeper = RecordingSleeper::default();
        let result = retry_with_backoff(&RetryPolicy::default(), &sleeper, Endpoint::Sales, || async {
            Err::<u32, _>(server_error())
        })
        .await;

        assert!(matches!(result, Err(StatsError::ServerError { status: 503, .. })));
        let secs: Vec<u64> = sleeper
            .waits
            .lock()
            .unwrap()
            .iter()
            .map(Duration::as_secs)
            .collect();
        assert_eq!(secs, vec![5, 10, 20, 40]);
    }

    #[tokio::test]
    async fn bad_request_fails_without_sleeping() {
        let sleeper = RecordingSleeper::default();
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(&RetryPolicy::default(), &sleeper, Endpoint::Sales, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(StatsError::BadRequest {
                    endpoint: Endpoint::Sales,
                    body: "dateFrom is invalid".to_owned(),
                })
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.waits.lock().unwrap().is_empty());
        assert!(matches!(result, Err(StatsError::BadRequest { .. })));
    }

    #[tokio::test]
    async fn single_attempt_policy_never_sleeps() {
        let sleeper = RecordingSleeper::default();
        let policy = RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        };
        let result = retry_with_backoff(&policy, &sleeper, Endpoint::Sales, || async {
            Err::<u32, _>(server_error())
        })
        .await;
        assert!(result.is_err());
        assert!(sleeper.waits.lock().unwrap().is_empty());
    }
}
