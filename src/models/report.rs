//! Export payload and summary statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Customer;

/// Quality band a score falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QualityBucket {
    /// Score of 90 or more
    High,
    /// Score from 70 to 89
    Medium,
    /// Score below 70
    Low,
}

impl QualityBucket {
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=u8::MAX => QualityBucket::High,
            70..=89 => QualityBucket::Medium,
            _ => QualityBucket::Low,
        }
    }
}

/// Count of customers per quality bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualitySummary {
    pub high_quality: usize,
    pub medium_quality: usize,
    pub low_quality: usize,
}

impl QualitySummary {
    /// Count one customer with the given score
    pub fn record(&mut self, score: u8) {
        match QualityBucket::from_score(score) {
            QualityBucket::High => self.high_quality += 1,
            QualityBucket::Medium => self.medium_quality += 1,
            QualityBucket::Low => self.low_quality += 1,
        }
    }
}

/// Metadata block of an export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub total_customers: usize,
    pub export_timestamp: DateTime<Utc>,
    pub data_quality_summary: QualitySummary,
}

impl SummaryReport {
    /// Summarize customers as of the given instant
    pub fn at(customers: &[Customer], export_timestamp: DateTime<Utc>) -> Self {
        let data_quality_summary =
            customers
                .iter()
                .fold(QualitySummary::default(), |mut summary, customer| {
                    summary.record(customer.data_quality_score);
                    summary
                });

        Self {
            total_customers: customers.len(),
            export_timestamp,
            data_quality_summary,
        }
    }

    /// Summarize customers as of now
    pub fn now(customers: &[Customer]) -> Self {
        Self::at(customers, Utc::now())
    }
}

/// Full document written to the output file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportPayload {
    pub metadata: SummaryReport,
    pub customers: Vec<Customer>,
}
