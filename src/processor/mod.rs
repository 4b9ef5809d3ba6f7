//! Record transformation and aggregation.
//!
//! [`CustomerProcessor::transform`] normalizes one raw record and scores its
//! completeness; [`CustomerProcessor::process`] transforms a batch and keeps
//! one customer per identifier.

mod enrichment;

pub use enrichment::{choose, FixedPicker, OptionPicker, RandomPicker};

use std::sync::Arc;

use crate::models::{
    AcquisitionChannel, ActivityStatus, Customer, CustomerTier, EngagementLevel, MarketSegment,
    RawCustomer, UNKNOWN_DOMAIN, UNKNOWN_NAME,
};
use crate::utils::{
    deduplicate_customers, extract_email_domain, normalize_full_name, MissingIdPolicy,
    MAX_QUALITY_SCORE,
};

/// Deducted once for an unknown email domain and once for an unknown name
pub const MISSING_FIELD_PENALTY: u8 = 10;

/// Turns raw API records into export-ready customers
#[derive(Debug, Clone)]
pub struct CustomerProcessor {
    picker: Arc<dyn OptionPicker>,
    missing_id: MissingIdPolicy,
}

impl Default for CustomerProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl CustomerProcessor {
    /// Processor with an entropy-seeded picker that drops id-less records
    pub fn new() -> Self {
        Self {
            picker: Arc::new(RandomPicker::new()),
            missing_id: MissingIdPolicy::default(),
        }
    }

    /// Replace the randomness source for enrichment fields
    pub fn with_picker(mut self, picker: Arc<dyn OptionPicker>) -> Self {
        self.picker = picker;
        self
    }

    pub fn with_missing_id_policy(mut self, policy: MissingIdPolicy) -> Self {
        self.missing_id = policy;
        self
    }

    pub fn missing_id_policy(&self) -> MissingIdPolicy {
        self.missing_id
    }

    /// Normalize one record.
    ///
    /// Never fails: missing names and emails fall back to placeholders and
    /// cost quality points instead.
    pub fn transform(&self, raw: &RawCustomer) -> Customer {
        let full_name = normalize_full_name(raw.first_name.as_deref(), raw.last_name.as_deref());
        let email_domain = extract_email_domain(raw.email.as_deref().unwrap_or_default());
        let data_quality_score = quality_score(&full_name, &email_domain);
        let picker = self.picker.as_ref();

        Customer {
            customer_id: raw.id,
            full_name,
            email_domain,
            engagement_level: choose(picker, EngagementLevel::OPTIONS),
            activity_status: choose(picker, ActivityStatus::OPTIONS),
            acquisition_channel: choose(picker, AcquisitionChannel::OPTIONS),
            market_segment: choose(picker, MarketSegment::OPTIONS),
            customer_tier: choose(picker, CustomerTier::OPTIONS),
            data_quality_score,
        }
    }

    /// Transform a batch and keep one customer per identifier.
    ///
    /// Where ids collide the highest score wins and ties keep the first
    /// record. Output follows each id's first appearance in `raw`.
    pub fn process(&self, raw: &[RawCustomer]) -> Vec<Customer> {
        let unique = deduplicate_customers(raw.iter().map(|r| self.transform(r)), self.missing_id);
        tracing::info!(
            "Processed {} raw records into {} unique customers",
            raw.len(),
            unique.len()
        );
        unique
    }
}

/// Completeness score of a normalized name and domain
pub fn quality_score(full_name: &str, email_domain: &str) -> u8 {
    let mut score = MAX_QUALITY_SCORE;
    if email_domain == UNKNOWN_DOMAIN {
        score -= MISSING_FIELD_PENALTY;
    }
    if full_name == UNKNOWN_NAME {
        score -= MISSING_FIELD_PENALTY;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor() -> CustomerProcessor {
        CustomerProcessor::new().with_picker(Arc::new(FixedPicker(0)))
    }

    #[test]
    fn test_transform_complete_record() {
        let raw = RawCustomer::new(1)
            .with_name("George", "Bluth")
            .with_email("george.bluth@reqres.in");

        let customer = processor().transform(&raw);
        assert_eq!(customer.customer_id, Some(1));
        assert_eq!(customer.full_name, "George Bluth");
        assert_eq!(customer.email_domain, "reqres.in");
        assert_eq!(customer.data_quality_score, 100);
        assert_eq!(customer.engagement_level, EngagementLevel::High);
        assert_eq!(customer.market_segment, MarketSegment::UsWest);
    }

    #[test]
    fn test_transform_missing_fields() {
        let customer = processor().transform(&RawCustomer::new(2));
        assert_eq!(customer.full_name, UNKNOWN_NAME);
        assert_eq!(customer.email_domain, UNKNOWN_DOMAIN);
        assert_eq!(customer.data_quality_score, 80);

        let customer = processor().transform(&RawCustomer::new(3).with_email("not-an-email"));
        assert_eq!(customer.data_quality_score, 80);

        let customer = processor().transform(&RawCustomer::new(4).with_email("a@B.COM"));
        assert_eq!(customer.email_domain, "b.com");
        assert_eq!(customer.data_quality_score, 90);
    }

    #[test]
    fn test_transform_is_stable_apart_from_enrichment() {
        let raw = RawCustomer::new(5).with_name(" Ann ", "").with_email("ann@x.org");
        let processor = CustomerProcessor::new();
        let a = processor.transform(&raw);
        let b = processor.transform(&raw);
        assert_eq!(
            (a.customer_id, &a.full_name, &a.email_domain, a.data_quality_score),
            (b.customer_id, &b.full_name, &b.email_domain, b.data_quality_score)
        );
    }

    #[test]
    fn test_process_keeps_best_duplicate() {
        let raw = vec![
            RawCustomer::new(1),
            RawCustomer::new(2).with_name("B", "Two").with_email("b@x.io"),
            RawCustomer::new(1).with_name("A", "One").with_email("a@x.io"),
        ];

        let customers = processor().process(&raw);
        assert_eq!(customers.len(), 2);
        assert_eq!(customers[0].customer_id, Some(1));
        assert_eq!(customers[0].full_name, "A One");
        assert_eq!(customers[0].data_quality_score, 100);
    }

    #[test]
    fn test_process_missing_id_policy() {
        let mut ghost = RawCustomer::new(0).with_name("No", "Id");
        ghost.id = None;
        let raw = vec![ghost, RawCustomer::new(1)];

        assert_eq!(processor().process(&raw).len(), 1);
        let kept = processor()
            .with_missing_id_policy(MissingIdPolicy::Keep)
            .process(&raw);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].customer_id, None);
    }

    #[test]
    fn test_quality_score() {
        assert_eq!(quality_score("A B", "x.io"), 100);
        assert_eq!(quality_score(UNKNOWN_NAME, "x.io"), 90);
        assert_eq!(quality_score(UNKNOWN_NAME, UNKNOWN_DOMAIN), 80);
    }
}
