//! Field normalization and schema checks for customer records.
//!
//! The transformer builds records through these helpers, and the pipeline
//! runs [`validate_customer`] over every record before it is exported.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

use crate::models::{Customer, UNKNOWN_DOMAIN, UNKNOWN_NAME};

/// Upper bound of a data quality score
pub const MAX_QUALITY_SCORE: u8 = 100;

/// Validation error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("full_name must be trimmed and non-empty, got {0:?}")]
    InvalidFullName(String),

    #[error("email_domain must be lowercase, trimmed and non-empty, got {0:?}")]
    InvalidEmailDomain(String),

    #[error("data_quality_score must be within 0..=100, got {0}")]
    ScoreOutOfRange(u8),
}

fn email_regex() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^.+@([A-Za-z0-9.-]+\.[A-Za-z]{2,})$").expect("email pattern is valid")
    })
}

/// Extract the lowercase domain of an email address.
///
/// Surrounding whitespace, including a trailing newline, is ignored. Returns
/// [`UNKNOWN_DOMAIN`] for an empty address, one without `@`, or one whose
/// host is not `label.tld` shaped.
///
/// # Examples
///
/// ```
/// use customer_export::utils::extract_email_domain;
///
/// assert_eq!(extract_email_domain("Janet.Weaver@Reqres.IN"), "reqres.in");
/// assert_eq!(extract_email_domain("missing@domain"), "unknown");
/// ```
pub fn extract_email_domain(email: &str) -> String {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return UNKNOWN_DOMAIN.to_string();
    }

    email_regex()
        .captures(email)
        .and_then(|caps| caps.get(1))
        .map(|domain| normalize_email_domain(domain.as_str()))
        .unwrap_or_else(|| UNKNOWN_DOMAIN.to_string())
}

/// Join trimmed name parts with a single space, or [`UNKNOWN_NAME`] if both
/// are blank.
pub fn normalize_full_name(first: Option<&str>, last: Option<&str>) -> String {
    let parts: Vec<&str> = [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

    if parts.is_empty() {
        UNKNOWN_NAME.to_string()
    } else {
        parts.join(" ")
    }
}

/// Trim and lowercase a domain, or [`UNKNOWN_DOMAIN`] if blank
pub fn normalize_email_domain(domain: &str) -> String {
    let domain = domain.trim();
    if domain.is_empty() {
        UNKNOWN_DOMAIN.to_string()
    } else {
        domain.to_lowercase()
    }
}

/// Check a normalized customer against the export schema.
///
/// Enrichment fields are closed enums and need no runtime check.
pub fn validate_customer(customer: &Customer) -> Result<(), ValidationError> {
    let name = &customer.full_name;
    if name.trim().is_empty() || name.trim() != name {
        return Err(ValidationError::InvalidFullName(name.clone()));
    }

    let domain = &customer.email_domain;
    if normalize_email_domain(domain) != *domain {
        return Err(ValidationError::InvalidEmailDomain(domain.clone()));
    }

    if customer.data_quality_score > MAX_QUALITY_SCORE {
        return Err(ValidationError::ScoreOutOfRange(customer.data_quality_score));
    }

    Ok(())
}
