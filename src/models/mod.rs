//! Core data models for customer records, API pages and export reports.

mod customer;
mod page;
mod report;

pub use customer::{
    AcquisitionChannel, ActivityStatus, Customer, CustomerTier, EngagementLevel, MarketSegment,
    RawCustomer, UNKNOWN_DOMAIN, UNKNOWN_NAME,
};
pub use page::PageResponse;
pub use report::{ExportPayload, QualityBucket, QualitySummary, SummaryReport};
