//! End-to-end export run: fetch, process, validate, export.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::export::{ExportError, Exporter};
use crate::models::{Customer, SummaryReport};
use crate::processor::{CustomerProcessor, RandomPicker};
use crate::sources::{ApiClient, FetchError, Source};
use crate::utils::{validate_customer, ValidationError};

/// Errors that abort a run. No output file is written when one occurs.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("customer {} failed validation: {source}", display_id(.customer_id))]
    Validation {
        customer_id: Option<i64>,
        #[source]
        source: ValidationError,
    },
}

fn display_id(id: &Option<i64>) -> String {
    id.map(|id| id.to_string())
        .unwrap_or_else(|| "<no id>".to_string())
}

/// A configured export run
#[derive(Debug)]
pub struct Pipeline {
    source: Arc<dyn Source>,
    processor: CustomerProcessor,
    exporter: Exporter,
    output: PathBuf,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn Source>,
        processor: CustomerProcessor,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            processor,
            exporter: Exporter::new(),
            output: output.into(),
        }
    }

    /// Build the API client and processor described by `config`
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let client = ApiClient::new(config.api.base_url.clone())?
            .with_timeout(config.api.request_timeout())?
            .with_api_key(config.api.api_key.clone())
            .with_resource(config.api.resource.clone())
            .with_retry(config.retry.to_retry_config());

        let picker = match config.processing.seed {
            Some(seed) => RandomPicker::seeded(seed),
            None => RandomPicker::new(),
        };
        let processor = CustomerProcessor::new()
            .with_picker(Arc::new(picker))
            .with_missing_id_policy(config.processing.missing_id);

        Ok(Self::new(
            Arc::new(client),
            processor,
            config.output.path.clone(),
        ))
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Run once and return the summary written to the output file.
    pub async fn run(&self) -> Result<SummaryReport, PipelineError> {
        tracing::info!("Fetching customers from source '{}'", self.source.id());
        let raw = self.source.fetch_all().await?;

        let customers: Vec<Customer> = self
            .processor
            .process(&raw)
            .into_iter()
            .map(Customer::normalized)
            .collect();
        for customer in &customers {
            validate_customer(customer).map_err(|source| PipelineError::Validation {
                customer_id: customer.customer_id,
                source,
            })?;
        }

        let report = self.exporter.export(customers, &self.output)?;
        tracing::info!(
            "Export complete: {} customers ({} high, {} medium, {} low quality)",
            report.total_customers,
            report.data_quality_summary.high_quality,
            report.data_quality_summary.medium_quality,
            report.data_quality_summary.low_quality
        );
        Ok(report)
    }
}
