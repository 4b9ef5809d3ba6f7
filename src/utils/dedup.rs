//! Deduplication of normalized customers by identifier.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::Customer;

/// What to do with records that carry no `id`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingIdPolicy {
    /// Skip the record
    #[default]
    Drop,
    /// Keep every id-less record as its own entry; they are never merged
    Keep,
}

/// Collapse customers sharing a `customer_id` into one entry.
///
/// Input order is significant: a later record replaces the stored one only
/// if its `data_quality_score` is strictly greater, so ties keep the first
/// occurrence. Output is in order of each identifier's first appearance.
pub fn deduplicate_customers<I>(customers: I, missing_id: MissingIdPolicy) -> Vec<Customer>
where
    I: IntoIterator<Item = Customer>,
{
    let mut unique: Vec<Customer> = Vec::new();
    let mut index_by_id: HashMap<i64, usize> = HashMap::new();
    let mut dropped = 0usize;

    for customer in customers {
        let Some(id) = customer.customer_id else {
            match missing_id {
                MissingIdPolicy::Drop => dropped += 1,
                MissingIdPolicy::Keep => unique.push(customer),
            }
            continue;
        };

        match index_by_id.get(&id) {
            Some(&idx) => {
                let stored = &mut unique[idx];
                if customer.data_quality_score > stored.data_quality_score {
                    tracing::debug!(
                        "Duplicate customer_id={} replaced (score {} -> {})",
                        id,
                        stored.data_quality_score,
                        customer.data_quality_score
                    );
                    *stored = customer;
                } else {
                    tracing::debug!("Duplicate customer_id={} ignored; keeping stored record", id);
                }
            }
            None => {
                index_by_id.insert(id, unique.len());
                unique.push(customer);
            }
        }
    }

    if dropped > 0 {
        tracing::warn!("Dropped {} customer records without an id", dropped);
    }

    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AcquisitionChannel, ActivityStatus, CustomerTier, EngagementLevel, MarketSegment,
    };

    fn customer(id: Option<i64>, name: &str, score: u8) -> Customer {
        Customer {
            customer_id: id,
            full_name: name.to_string(),
            email_domain: "example.com".to_string(),
            engagement_level: EngagementLevel::High,
            activity_status: ActivityStatus::Active,
            acquisition_channel: AcquisitionChannel::Website,
            market_segment: MarketSegment::UsWest,
            customer_tier: CustomerTier::Basic,
            data_quality_score: score,
        }
    }

    #[test]
    fn test_no_duplicates_passthrough() {
        let input = vec![
            customer(Some(2), "B", 100),
            customer(Some(1), "A", 90),
        ];
        let result = deduplicate_customers(input.clone(), MissingIdPolicy::Drop);
        assert_eq!(result, input);
    }

    #[test]
    fn test_higher_score_replaces() {
        let result = deduplicate_customers(
            vec![
                customer(Some(1), "Low", 80),
                customer(Some(2), "Other", 100),
                customer(Some(1), "High", 100),
            ],
            MissingIdPolicy::Drop,
        );

        assert_eq!(result.len(), 2);
        // Replacement keeps the first-seen position
        assert_eq!(result[0].full_name, "High");
        assert_eq!(result[1].full_name, "Other");
    }

    #[test]
    fn test_tie_keeps_first() {
        let result = deduplicate_customers(
            vec![
                customer(Some(1), "First", 90),
                customer(Some(1), "Second", 90),
                customer(Some(1), "Third", 80),
            ],
            MissingIdPolicy::Drop,
        );

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].full_name, "First");
    }

    #[test]
    fn test_missing_id_dropped() {
        let result = deduplicate_customers(
            vec![customer(None, "Ghost", 100), customer(Some(1), "A", 100)],
            MissingIdPolicy::Drop,
        );
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].customer_id, Some(1));
    }

    #[test]
    fn test_missing_id_kept_separately() {
        let result = deduplicate_customers(
            vec![
                customer(None, "Ghost", 80),
                customer(None, "Ghost", 100),
                customer(Some(1), "A", 100),
            ],
            MissingIdPolicy::Keep,
        );
        assert_eq!(result.len(), 3);
        assert!(result[0].customer_id.is_none());
        assert!(result[1].customer_id.is_none());
    }

    #[test]
    fn test_policy_serde() {
        assert_eq!(serde_json::to_string(&MissingIdPolicy::Keep).unwrap(), "\"keep\"");
        let parsed: MissingIdPolicy = serde_json::from_str("\"drop\"").unwrap();
        assert_eq!(parsed, MissingIdPolicy::Drop);
    }
}
