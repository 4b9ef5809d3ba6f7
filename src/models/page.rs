//! One page of the paginated list endpoint.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::RawCustomer;

/// A single page returned by the list endpoint.
///
/// Only `data` and `total_pages` are read; both are lenient. A missing or
/// `null` `data` is an empty page, and a missing, non-numeric or
/// non-positive `total_pages` counts as a single page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PageResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Vec<RawCustomer>,

    #[serde(default = "default_total_pages", deserialize_with = "lenient_total_pages")]
    pub total_pages: u32,
}

fn default_total_pages() -> u32 {
    1
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<RawCustomer>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<RawCustomer>>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_total_pages<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let pages = match &value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 1.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };

    Ok(pages
        .filter(|p| *p >= 1)
        .map(|p| u32::try_from(p).unwrap_or(u32::MAX))
        .unwrap_or_else(default_total_pages))
}
