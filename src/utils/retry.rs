//! Retry utilities with a backoff table for resilient API calls.
//!
//! Every attempt is reduced to an [`AttemptOutcome`]; [`with_retry`] consumes
//! those outcomes, sleeping through an injectable [`Sleeper`] between
//! attempts.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Default number of attempts per request
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default backoff table, in seconds
pub const DEFAULT_BACKOFF_SECS: [u64; 3] = [1, 2, 4];

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Wait before the next attempt, indexed by attempt number and clamped
    /// at the last entry
    pub backoff: Vec<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::from_secs(DEFAULT_MAX_ATTEMPTS, &DEFAULT_BACKOFF_SECS)
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, backoff: Vec<Duration>) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Build from a backoff table expressed in whole seconds
    pub fn from_secs(max_attempts: u32, backoff_secs: &[u64]) -> Self {
        Self::new(
            max_attempts,
            backoff_secs.iter().copied().map(Duration::from_secs).collect(),
        )
    }

    /// Backoff wait after the given 1-based attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let Some(last) = self.backoff.len().checked_sub(1) else {
            return Duration::ZERO;
        };
        let idx = (attempt.saturating_sub(1) as usize).min(last);
        self.backoff[idx]
    }
}

/// Transient conditions that trigger a retry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransientError {
    /// Connection or other transport failure
    #[error("network error: {0}")]
    Network(String),

    /// Request exceeded its deadline
    #[error("request timed out: {0}")]
    Timeout(String),

    /// HTTP 429, with the raw `Retry-After` header if present
    #[error("rate limited (Retry-After: {})", .retry_after.as_deref().unwrap_or("none"))]
    RateLimited { retry_after: Option<String> },

    /// HTTP 5xx
    #[error("server error {status}")]
    Server { status: u16 },

    /// Any status that is neither success, client error nor server error
    #[error("unexpected status {status}")]
    UnexpectedStatus { status: u16 },
}

impl TransientError {
    /// Classify a transport-level reqwest error
    pub fn from_reqwest_error(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            TransientError::Timeout(err.to_string())
        } else {
            TransientError::Network(err.to_string())
        }
    }
}

/// Parse a `Retry-After` header given in whole seconds
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// How a response status should be handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusClass {
    /// 200: read the body
    Success,
    /// Try again after `wait`
    Retry {
        reason: TransientError,
        wait: Duration,
    },
    /// 4xx other than 429: give up
    Terminal,
}

/// Classify a response status for the given 1-based attempt.
///
/// 429 honors an integer `Retry-After` and otherwise falls back to the
/// backoff table, as do 5xx and unexpected statuses.
pub fn classify_status(
    status: StatusCode,
    retry_after: Option<&str>,
    attempt: u32,
    config: &RetryConfig,
) -> StatusClass {
    let backoff = config.delay_for_attempt(attempt);
    let code = status.as_u16();

    if status == StatusCode::OK {
        StatusClass::Success
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        let wait = retry_after.and_then(parse_retry_after).unwrap_or(backoff);
        StatusClass::Retry {
            reason: TransientError::RateLimited {
                retry_after: retry_after.map(str::to_owned),
            },
            wait,
        }
    } else if status.is_server_error() {
        StatusClass::Retry {
            reason: TransientError::Server { status: code },
            wait: backoff,
        }
    } else if status.is_client_error() {
        StatusClass::Terminal
    } else {
        StatusClass::Retry {
            reason: TransientError::UnexpectedStatus { status: code },
            wait: backoff,
        }
    }
}

/// Result of a single attempt
#[derive(Debug)]
pub enum AttemptOutcome<T, E> {
    /// Attempt produced a value
    Success(T),
    /// Attempt hit a transient condition; wait then try again
    Retry { reason: TransientError, wait: Duration },
    /// Attempt hit a terminal condition
    Fail(E),
}

/// Result of a retried operation
#[derive(Debug)]
pub enum RetryResult<T, E> {
    /// Operation succeeded
    Success(T),
    /// Every attempt hit a transient condition
    Exhausted {
        attempts: u32,
        last: Option<TransientError>,
    },
    /// An attempt hit a terminal condition
    Permanent(E),
}

/// Source of delays between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync + std::fmt::Debug {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records requested delays without waiting. Intended for tests.
#[derive(Debug, Default, Clone)]
pub struct RecordingSleeper {
    waits: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far, in order
    pub fn waits(&self) -> Vec<Duration> {
        self.waits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.waits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration);
    }
}

/// Execute an operation with bounded retries.
///
/// `operation` receives the 1-based attempt number. A retry outcome sleeps
/// for its `wait` before the next attempt; no wait follows the final attempt.
///
/// # Arguments
///
/// * `config` - Retry configuration
/// * `sleeper` - Delay source between attempts
/// * `label` - Identifies the operation in log events (usually the URL)
/// * `operation` - The async attempt to execute
pub async fn with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    sleeper: &dyn Sleeper,
    label: &str,
    mut operation: F,
) -> RetryResult<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AttemptOutcome<T, E>>,
{
    let mut last = None;

    for attempt in 1..=config.max_attempts {
        match operation(attempt).await {
            AttemptOutcome::Success(value) => {
                if attempt > 1 {
                    tracing::info!(
                        "{} succeeded on attempt {} after {} transient failures",
                        label,
                        attempt,
                        attempt - 1
                    );
                }
                return RetryResult::Success(value);
            }
            AttemptOutcome::Fail(error) => return RetryResult::Permanent(error),
            AttemptOutcome::Retry { reason, wait } => {
                tracing::warn!(
                    "Attempt {}/{} for {} failed: {}",
                    attempt,
                    config.max_attempts,
                    label,
                    reason
                );

                if attempt < config.max_attempts {
                    tracing::debug!("Sleeping {:?} before attempt {}", wait, attempt + 1);
                    sleeper.sleep(wait).await;
                }
                last = Some(reason);
            }
        }
    }

    RetryResult::Exhausted {
        attempts: config.max_attempts,
        last,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_backoff_table_clamps() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for_attempt(1), secs(1));
        assert_eq!(config.delay_for_attempt(2), secs(2));
        assert_eq!(config.delay_for_attempt(3), secs(4));
        assert_eq!(config.delay_for_attempt(9), secs(4));
        assert_eq!(config.delay_for_attempt(0), secs(1));
    }

    #[test]
    fn test_empty_backoff_table_is_zero() {
        let config = RetryConfig::new(3, Vec::new());
        assert_eq!(config.delay_for_attempt(2), Duration::ZERO);
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after("1"), Some(secs(1)));
        assert_eq!(parse_retry_after(" 30 "), Some(secs(30)));
        assert_eq!(parse_retry_after("-1"), None);
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[test]
    fn test_classify_status() {
        let config = RetryConfig::default();

        assert_eq!(
            classify_status(StatusCode::OK, None, 1, &config),
            StatusClass::Success
        );
        assert_eq!(
            classify_status(StatusCode::NOT_FOUND, None, 1, &config),
            StatusClass::Terminal
        );
        assert_eq!(
            classify_status(StatusCode::BAD_GATEWAY, None, 2, &config),
            StatusClass::Retry {
                reason: TransientError::Server { status: 502 },
                wait: secs(2),
            }
        );
        assert_eq!(
            classify_status(StatusCode::NO_CONTENT, None, 1, &config),
            StatusClass::Retry {
                reason: TransientError::UnexpectedStatus { status: 204 },
                wait: secs(1),
            }
        );
        assert_eq!(
            classify_status(StatusCode::MOVED_PERMANENTLY, None, 3, &config),
            StatusClass::Retry {
                reason: TransientError::UnexpectedStatus { status: 301 },
                wait: secs(4),
            }
        );
    }

    #[test]
    fn test_classify_rate_limit() {
        let config = RetryConfig::default();

        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, Some("7"), 1, &config),
            StatusClass::Retry {
                reason: TransientError::RateLimited {
                    retry_after: Some("7".to_string())
                },
                wait: secs(7),
            }
        );

        // Unparseable hint falls back to the table
        match classify_status(StatusCode::TOO_MANY_REQUESTS, Some("soon"), 2, &config) {
            StatusClass::Retry { wait, .. } => assert_eq!(wait, secs(2)),
            other => panic!("Expected retry, got {:?}", other),
        }

        match classify_status(StatusCode::TOO_MANY_REQUESTS, None, 3, &config) {
            StatusClass::Retry { wait, .. } => assert_eq!(wait, secs(4)),
            other => panic!("Expected retry, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_retry_success_first_try() {
        let sleeper = RecordingSleeper::new();
        let calls = AtomicU32::new(0);

        let result: RetryResult<&str, ()> =
            with_retry(&RetryConfig::default(), &sleeper, "test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { AttemptOutcome::Success("ok") }
            })
            .await;

        assert!(matches!(result, RetryResult::Success("ok")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.waits().is_empty());
    }

    #[tokio::test]
    async fn test_retry_success_after_failures() {
        let sleeper = RecordingSleeper::new();
        let config = RetryConfig::default();

        let result: RetryResult<u32, ()> = with_retry(&config, &sleeper, "test", |attempt| {
            let wait = config.delay_for_attempt(attempt);
            async move {
                if attempt < 3 {
                    AttemptOutcome::Retry {
                        reason: TransientError::Server { status: 500 },
                        wait,
                    }
                } else {
                    AttemptOutcome::Success(attempt)
                }
            }
        })
        .await;

        assert!(matches!(result, RetryResult::Success(3)));
        assert_eq!(sleeper.waits(), vec![secs(1), secs(2)]);
    }

    #[tokio::test]
    async fn test_retry_returns_permanent_error() {
        let sleeper = RecordingSleeper::new();
        let calls = AtomicU32::new(0);

        let result: RetryResult<(), &str> =
            with_retry(&RetryConfig::default(), &sleeper, "test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { AttemptOutcome::Fail("not found") }
            })
            .await;

        assert!(matches!(result, RetryResult::Permanent("not found")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.waits().is_empty());
    }

    #[tokio::test]
    async fn test_retry_exhausted_reports_last_cause() {
        let sleeper = RecordingSleeper::new();
        let config = RetryConfig::default();

        let result: RetryResult<(), ()> = with_retry(&config, &sleeper, "test", |attempt| {
            async move {
                AttemptOutcome::Retry {
                    reason: TransientError::Network(format!("refused #{}", attempt)),
                    wait: secs(attempt as u64),
                }
            }
        })
        .await;

        match result {
            RetryResult::Exhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert_eq!(last, Some(TransientError::Network("refused #3".to_string())));
            }
            _ => panic!("Expected exhaustion"),
        }
        // No wait after the final attempt
        assert_eq!(sleeper.waits(), vec![secs(1), secs(2)]);
    }

    #[tokio::test]
    async fn test_zero_attempts_exhausts_immediately() {
        let sleeper = RecordingSleeper::new();
        let config = RetryConfig::new(0, vec![secs(1)]);

        let result: RetryResult<(), ()> =
            with_retry(&config, &sleeper, "test", |_| async { AttemptOutcome::Success(()) }).await;

        assert!(matches!(
            result,
            RetryResult::Exhausted {
                attempts: 0,
                last: None
            }
        ));
    }

    #[test]
    fn test_transient_error_display() {
        let err = TransientError::RateLimited { retry_after: None };
        assert_eq!(err.to_string(), "rate limited (Retry-After: none)");
        assert_eq!(
            TransientError::Server { status: 503 }.to_string(),
            "server error 503"
        );
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_retry_log_lines() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let sleeper = RecordingSleeper::new();
        let _: RetryResult<(), ()> =
            with_retry(&RetryConfig::default(), &sleeper, "http://api/users", |attempt| {
                async move {
                    if attempt < 2 {
                        AttemptOutcome::Retry {
                            reason: TransientError::Server { status: 500 },
                            wait: secs(1),
                        }
                    } else {
                        AttemptOutcome::Success(())
                    }
                }
            })
            .await;

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Attempt 1/3 for http://api/users failed: server error 500"));
        assert!(output.contains("Sleeping 1s before attempt 2"));
        assert!(output.contains("http://api/users succeeded on attempt 2 after 1 transient failures"));
    }
}
