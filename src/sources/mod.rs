//! Customer record sources.
//!
//! The [`Source`] trait is the seam between the pipeline and wherever raw
//! customer records come from. [`ApiClient`] pulls them page by page from a
//! paginated HTTP endpoint; [`MockSource`] serves canned records for tests.

mod api;
pub mod mock;

pub use api::{ApiClient, DEFAULT_RESOURCE};
pub use mock::MockSource;

use async_trait::async_trait;

use crate::models::RawCustomer;
use crate::utils::TransientError;

/// A source of raw customer records.
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Identifier used in log events
    fn id(&self) -> &str;

    /// Fetch every raw record, in source order and without deduplication.
    ///
    /// Any failure aborts the whole fetch; partial results are never returned.
    async fn fetch_all(&self) -> Result<Vec<RawCustomer>, FetchError>;
}

/// Errors that end a fetch
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    /// Base URL and resource do not form a valid URL
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// 4xx other than 429; never retried
    #[error("client error {status} for {url}: {body}")]
    Client {
        url: String,
        status: u16,
        body: String,
    },

    /// A successful status with a body that is not the expected JSON
    #[error("invalid response from {url} (status {status}, attempt {attempts}): {reason}")]
    InvalidResponse {
        url: String,
        status: u16,
        attempts: u32,
        reason: String,
    },

    /// Every attempt hit a transient condition
    #[error("failed to fetch {url} after {retries} attempts: {}", describe_last(.last))]
    RetriesExhausted {
        url: String,
        retries: u32,
        last: Option<TransientError>,
    },
}

fn describe_last(last: &Option<TransientError>) -> String {
    last.as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "no response received".to_string())
}

impl FetchError {
    /// HTTP status attached to this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Client { status, .. } | FetchError::InvalidResponse { status, .. } => {
                Some(*status)
            }
            FetchError::RetriesExhausted {
                last:
                    Some(TransientError::Server { status } | TransientError::UnexpectedStatus { status }),
                ..
            } => Some(*status),
            FetchError::RetriesExhausted {
                last: Some(TransientError::RateLimited { .. }),
                ..
            } => Some(429),
            _ => None,
        }
    }
}
