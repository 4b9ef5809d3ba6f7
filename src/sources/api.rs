//! Paginated customer API client.
//!
//! Issues `GET {base_url}/{resource}?page=N` with bounded retries and walks
//! every page announced by the first one.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{PageResponse, RawCustomer};
use crate::sources::{FetchError, Source};
use crate::utils::{
    classify_status, json_headers, with_retry, AttemptOutcome, HttpClient, RetryConfig,
    RetryResult, Sleeper, StatusClass, TokioSleeper, TransientError,
};

/// Resource listed when none is configured
pub const DEFAULT_RESOURCE: &str = "users";

/// Client for a paginated JSON list endpoint
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: HttpClient,
    base_url: String,
    api_key: Option<String>,
    resource: String,
    retry: RetryConfig,
    sleeper: Arc<dyn Sleeper>,
}

/// A decoded body and the attempt that produced it
struct Fetched {
    body: Value,
    attempts: u32,
}

impl ApiClient {
    /// Create a client with the default timeout, retry policy and resource
    pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let http = HttpClient::new().map_err(FetchError::Build)?;
        Ok(Self::with_http(http, base_url))
    }

    /// Create a client around an existing HTTP client
    pub fn with_http(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            resource: DEFAULT_RESOURCE.to_string(),
            retry: RetryConfig::default(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Send `Authorization: Bearer <key>` with every request
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    /// Resource path listed by [`Source::fetch_all`]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the delay source used between attempts
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Rebuild the HTTP client with a different per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, FetchError> {
        self.http = HttpClient::with_timeout(timeout).map_err(FetchError::Build)?;
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Full URL of a resource under the base URL
    pub fn resource_url(&self, resource: &str) -> Result<String, FetchError> {
        let url = format!("{}/{}", self.base_url, resource.trim_start_matches('/'));
        url::Url::parse(&url).map_err(|e| FetchError::InvalidUrl {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        Ok(url)
    }

    /// GET a URL and decode its JSON body, retrying transient failures.
    pub async fn fetch_json(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Value, FetchError> {
        self.request(url, query).await.map(|fetched| fetched.body)
    }

    async fn request(&self, url: &str, query: &[(&str, String)]) -> Result<Fetched, FetchError> {
        let headers = json_headers(self.api_key.as_deref());
        let client = self;

        let result = with_retry(&self.retry, self.sleeper.as_ref(), url, move |attempt| {
            client.attempt(url, query, headers.clone(), attempt)
        })
        .await;

        match result {
            RetryResult::Success(fetched) => Ok(fetched),
            RetryResult::Permanent(error) => Err(error),
            RetryResult::Exhausted { attempts, last } => {
                tracing::error!("Giving up on {} after {} attempts", url, attempts);
                Err(FetchError::RetriesExhausted {
                    url: url.to_string(),
                    retries: attempts,
                    last,
                })
            }
        }
    }

    /// One GET, reduced to an outcome the retry loop can act on
    async fn attempt(
        &self,
        url: &str,
        query: &[(&str, String)],
        headers: HeaderMap,
        attempt: u32,
    ) -> AttemptOutcome<Fetched, FetchError> {
        let backoff = self.retry.delay_for_attempt(attempt);

        let response = match self
            .http
            .client()
            .get(url)
            .headers(headers)
            .query(query)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return AttemptOutcome::Retry {
                    reason: TransientError::from_reqwest_error(&e),
                    wait: backoff,
                }
            }
        };

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        match classify_status(status, retry_after.as_deref(), attempt, &self.retry) {
            StatusClass::Success => {
                let bytes = match response.bytes().await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        return AttemptOutcome::Retry {
                            reason: TransientError::from_reqwest_error(&e),
                            wait: backoff,
                        }
                    }
                };

                match serde_json::from_slice::<Value>(&bytes) {
                    Ok(body) => AttemptOutcome::Success(Fetched {
                        body,
                        attempts: attempt,
                    }),
                    Err(e) => AttemptOutcome::Fail(FetchError::InvalidResponse {
                        url: url.to_string(),
                        status: status.as_u16(),
                        attempts: attempt,
                        reason: format!("invalid JSON: {}", e),
                    }),
                }
            }
            StatusClass::Retry { reason, wait } => AttemptOutcome::Retry { reason, wait },
            StatusClass::Terminal => {
                let body = response.text().await.unwrap_or_default();
                tracing::warn!(
                    "Client error {} for {} on attempt {}; not retrying",
                    status.as_u16(),
                    url,
                    attempt
                );
                AttemptOutcome::Fail(FetchError::Client {
                    url: url.to_string(),
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    /// Fetch and decode one page of a resource
    pub async fn fetch_page(&self, resource: &str, page: u32) -> Result<PageResponse, FetchError> {
        let url = self.resource_url(resource)?;
        tracing::debug!("Fetching page {} from {}", page, url);

        let fetched = self.request(&url, &[("page", page.to_string())]).await?;
        serde_json::from_value(fetched.body).map_err(|e| FetchError::InvalidResponse {
            url,
            status: 200,
            attempts: fetched.attempts,
            reason: format!("unexpected page shape: {}", e),
        })
    }

    /// Fetch every page of a resource, in page order.
    ///
    /// Page 1 announces `total_pages`; pages 2..=total_pages follow
    /// sequentially. Records are returned as served, duplicates included.
    pub async fn fetch_all_pages(&self, resource: &str) -> Result<Vec<RawCustomer>, FetchError> {
        let first = self.fetch_page(resource, 1).await?;
        let total_pages = first.total_pages;
        let mut records = first.data;
        tracing::info!(
            "Discovered total_pages={}, first_page_count={}",
            total_pages,
            records.len()
        );

        for page in 2..=total_pages {
            let next = self.fetch_page(resource, page).await?;
            tracing::info!("Fetched page {} with {} records", page, next.data.len());
            records.extend(next.data);
        }

        tracing::info!("Fetched {} raw customer records", records.len());
        Ok(records)
    }
}

#[async_trait]
impl Source for ApiClient {
    fn id(&self) -> &str {
        "api"
    }

    async fn fetch_all(&self) -> Result<Vec<RawCustomer>, FetchError> {
        self.fetch_all_pages(&self.resource).await
    }
}
