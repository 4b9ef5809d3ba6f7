//! Utility modules supporting the export pipeline.
//!
//! - [`with_retry`]: Execute an attempt function with bounded retries and a backoff table
//! - [`RetryConfig`]: Attempt budget and backoff table
//! - [`HttpClient`]: reqwest client with a fixed per-request timeout
//! - [`deduplicate_customers`]: Keep one customer per identifier, highest quality first
//! - [`extract_email_domain`] / [`validate_customer`]: Field normalization and schema checks
//! - [`render_summary_table`]: Terminal rendering of an export summary
//!
//! # Retry with Backoff
//!
//! ```rust
//! use customer_export::utils::{with_retry, AttemptOutcome, RecordingSleeper, RetryConfig, RetryResult};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let sleeper = RecordingSleeper::new();
//! let result: RetryResult<&str, ()> = with_retry(&RetryConfig::default(), &sleeper, "demo", |_| async {
//!     AttemptOutcome::Success("done")
//! })
//! .await;
//! assert!(matches!(result, RetryResult::Success("done")));
//! # }
//! ```

mod dedup;
mod display;
mod http;
mod retry;
mod validate;

pub use dedup::{deduplicate_customers, MissingIdPolicy};
pub use display::{is_terminal, render_summary_table};
pub use http::{json_headers, HttpClient, DEFAULT_REQUEST_TIMEOUT};
pub use retry::{
    classify_status, parse_retry_after, with_retry, AttemptOutcome, RecordingSleeper,
    RetryConfig, RetryResult, Sleeper, StatusClass, TokioSleeper, TransientError,
    DEFAULT_BACKOFF_SECS, DEFAULT_MAX_ATTEMPTS,
};
pub use validate::{
    extract_email_domain, normalize_email_domain, normalize_full_name, validate_customer,
    ValidationError, MAX_QUALITY_SCORE,
};
