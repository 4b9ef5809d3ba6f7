//! Customer models: the raw record served by the API and the normalized
//! record written to the export.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Placeholder for a customer whose first and last name are both blank.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Placeholder for a missing or malformed email domain.
pub const UNKNOWN_DOMAIN: &str = "unknown";

/// A customer record exactly as returned by the `/users` endpoint.
///
/// Every field is optional on the wire; fields the API adds later are ignored.
/// Fields of the wrong type read as absent instead of failing the page, and
/// an `id` given as a numeric string or integral float is accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCustomer {
    /// Customer identifier
    #[serde(
        default,
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<i64>,

    /// Email address, unvalidated
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub email: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub first_name: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_name: Option<String>,

    /// Avatar image URL
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub avatar: Option<String>,
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let id = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    Ok(id)
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}

impl RawCustomer {
    /// Create a record with only an identifier set
    pub fn new(id: i64) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// Set the email address
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set both name parts
    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = Some(first.into());
        self.last_name = Some(last.into());
        self
    }
}

macro_rules! enrichment_field {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
            #[serde(rename = "unknown")]
            Unknown,
        }

        impl $name {
            /// Values an enrichment draw picks from. `Unknown` is only a fallback.
            pub const OPTIONS: &'static [$name] = &[$($name::$variant),+];

            /// Wire label of this value
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                    $name::Unknown => "unknown",
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::Unknown
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

enrichment_field! {
    /// How engaged the customer is with the product
    EngagementLevel {
        High => "high",
        Medium => "medium",
        Low => "low",
    }
}

enrichment_field! {
    /// Whether the customer is currently active
    ActivityStatus {
        Active => "active",
        Inactive => "inactive",
    }
}

enrichment_field! {
    /// Channel the customer was acquired through
    AcquisitionChannel {
        Website => "website",
        MobileApp => "mobile_app",
        EmailCampaign => "email_campaign",
    }
}

enrichment_field! {
    /// Geographic market segment
    MarketSegment {
        UsWest => "US-West",
        UsEast => "US-East",
        EuCentral => "EU-Central",
        Apac => "APAC",
    }
}

enrichment_field! {
    /// Subscription tier
    CustomerTier {
        Basic => "basic",
        Premium => "premium",
        Enterprise => "enterprise",
    }
}

/// A normalized, enriched customer ready for export.
///
/// Field order matches the exported JSON layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Identifier copied from the raw record; `None` only for id-less records
    /// retained under [`MissingIdPolicy::Keep`](crate::utils::MissingIdPolicy::Keep)
    pub customer_id: Option<i64>,

    /// Trimmed "first last", or [`UNKNOWN_NAME`]
    pub full_name: String,

    /// Lowercase email domain, or [`UNKNOWN_DOMAIN`]
    pub email_domain: String,

    pub engagement_level: EngagementLevel,
    pub activity_status: ActivityStatus,
    pub acquisition_channel: AcquisitionChannel,
    pub market_segment: MarketSegment,
    pub customer_tier: CustomerTier,

    /// Completeness score in `0..=100`
    pub data_quality_score: u8,
}

impl Customer {
    /// Apply the schema's field fallbacks: trimmed name or [`UNKNOWN_NAME`],
    /// trimmed lowercase domain or [`UNKNOWN_DOMAIN`], score capped at 100.
    pub fn normalized(mut self) -> Self {
        let name = self.full_name.trim();
        self.full_name = if name.is_empty() {
            UNKNOWN_NAME.to_string()
        } else {
            name.to_string()
        };
        self.email_domain = crate::utils::normalize_email_domain(&self.email_domain);
        self.data_quality_score = self
            .data_quality_score
            .min(crate::utils::MAX_QUALITY_SCORE);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_customer_ignores_extra_fields() {
        let raw: RawCustomer = serde_json::from_str(
            r#"{"id": 7, "email": "a@b.io", "first_name": "Ann", "nickname": "annie"}"#,
        )
        .unwrap();

        assert_eq!(raw.id, Some(7));
        assert_eq!(raw.email.as_deref(), Some("a@b.io"));
        assert_eq!(raw.first_name.as_deref(), Some("Ann"));
        assert!(raw.last_name.is_none());
    }

    #[test]
    fn test_raw_customer_null_id() {
        let raw: RawCustomer = serde_json::from_str(r#"{"id": null, "email": "x@y.com"}"#).unwrap();
        assert!(raw.id.is_none());
    }

    #[test]
    fn test_enrichment_labels() {
        assert_eq!(MarketSegment::UsWest.as_str(), "US-West");
        assert_eq!(AcquisitionChannel::MobileApp.to_string(), "mobile_app");
        assert_eq!(CustomerTier::Unknown.as_str(), "unknown");
        assert_eq!(EngagementLevel::default(), EngagementLevel::Unknown);
        assert!(!ActivityStatus::OPTIONS.contains(&ActivityStatus::Unknown));
    }

    #[test]
    fn test_enrichment_serde_uses_labels() {
        let json = serde_json::to_string(&MarketSegment::EuCentral).unwrap();
        assert_eq!(json, "\"EU-Central\"");

        let parsed: AcquisitionChannel = serde_json::from_str("\"email_campaign\"").unwrap();
        assert_eq!(parsed, AcquisitionChannel::EmailCampaign);

        assert!(serde_json::from_str::<CustomerTier>("\"platinum\"").is_err());
    }

    #[test]
    fn test_customer_serializes_in_export_order() {
        let customer = Customer {
            customer_id: Some(1),
            full_name: "Ann Lee".to_string(),
            email_domain: "b.io".to_string(),
            engagement_level: EngagementLevel::High,
            activity_status: ActivityStatus::Active,
            acquisition_channel: AcquisitionChannel::Website,
            market_segment: MarketSegment::Apac,
            customer_tier: CustomerTier::Basic,
            data_quality_score: 100,
        };

        let json = serde_json::to_string(&customer).unwrap();
        let id_pos = json.find("customer_id").unwrap();
        let score_pos = json.find("data_quality_score").unwrap();
        assert!(id_pos < score_pos);
        assert!(json.contains("\"market_segment\":\"APAC\""));
    }

    #[test]
    fn test_normalized_applies_fallbacks() {
        let customer = Customer {
            customer_id: Some(3),
            full_name: "   ".to_string(),
            email_domain: " Example.ORG ".to_string(),
            engagement_level: EngagementLevel::Low,
            activity_status: ActivityStatus::Inactive,
            acquisition_channel: AcquisitionChannel::EmailCampaign,
            market_segment: MarketSegment::UsEast,
            customer_tier: CustomerTier::Premium,
            data_quality_score: 120,
        }
        .normalized();

        assert_eq!(customer.full_name, UNKNOWN_NAME);
        assert_eq!(customer.email_domain, "example.org");
        assert_eq!(customer.data_quality_score, 100);
    }
}
