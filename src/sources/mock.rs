//! Mock source for testing purposes.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::models::RawCustomer;
use crate::sources::{FetchError, Source};
use crate::utils::TransientError;

/// A mock source that returns predefined records.
#[derive(Debug, Default)]
pub struct MockSource {
    records: Mutex<Vec<RawCustomer>>,
    failure_status: Mutex<Option<u16>>,
    calls: AtomicUsize,
}

impl MockSource {
    /// Create a new mock source with no records.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock source serving the given records.
    pub fn with_records(records: Vec<RawCustomer>) -> Self {
        let source = Self::new();
        source.set_records(records);
        source
    }

    /// Set the records to return.
    pub fn set_records(&self, records: Vec<RawCustomer>) {
        *self.records.lock().unwrap_or_else(PoisonError::into_inner) = records;
    }

    /// Fail every fetch as if the API answered with `status`.
    ///
    /// 4xx yields a client error; anything else reads as exhausted retries.
    pub fn fail_with_status(&self, status: u16) {
        *self
            .failure_status
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(status);
    }

    /// Number of completed `fetch_all` calls
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Source for MockSource {
    fn id(&self) -> &str {
        "mock"
    }

    async fn fetch_all(&self) -> Result<Vec<RawCustomer>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let failure = *self
            .failure_status
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(status) = failure {
            let url = "mock://customers".to_string();
            return Err(if (400..500).contains(&status) && status != 429 {
                FetchError::Client {
                    url,
                    status,
                    body: String::new(),
                }
            } else {
                FetchError::RetriesExhausted {
                    url,
                    retries: 3,
                    last: Some(TransientError::Server { status }),
                }
            });
        }

        Ok(self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

/// Helper function to create a complete raw record for testing.
pub fn make_raw_customer(id: i64, first: &str, last: &str, email: &str) -> RawCustomer {
    RawCustomer::new(id)
        .with_name(first, last)
        .with_email(email)
}
