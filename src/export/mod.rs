//! JSON export of processed customers.
//!
//! The payload is written to a temporary file beside the target and renamed
//! into place, so a failed export never leaves a partial file behind.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::models::{Customer, ExportPayload, SummaryReport};

/// Output file used when none is configured
pub const DEFAULT_OUTPUT_PATH: &str = "sample_output.json";

/// Export errors, each carrying the target path
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize export for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to move export into place at {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    /// Target path of the failed export
    pub fn path(&self) -> &Path {
        match self {
            ExportError::CreateDir { path, .. }
            | ExportError::Io { path, .. }
            | ExportError::Serialize { path, .. }
            | ExportError::Persist { path, .. } => path,
        }
    }
}

/// Stable sort by lowercase `full_name`
pub fn sort_customers(customers: &mut [Customer]) {
    customers.sort_by_cached_key(|c| c.full_name.to_lowercase());
}

/// Summary statistics for a set of customers, stamped with the current time
pub fn summarize(customers: &[Customer]) -> SummaryReport {
    SummaryReport::now(customers)
}

/// Writes export payloads to disk
#[derive(Debug, Clone, Default)]
pub struct Exporter;

impl Exporter {
    pub fn new() -> Self {
        Self
    }

    /// Sort `customers`, write `{metadata, customers}` to `path` and return
    /// the metadata block that was written.
    ///
    /// Parent directories are created and an existing file is replaced.
    pub fn export(
        &self,
        mut customers: Vec<Customer>,
        path: &Path,
    ) -> Result<SummaryReport, ExportError> {
        sort_customers(&mut customers);
        let payload = ExportPayload {
            metadata: summarize(&customers),
            customers,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|source| ExportError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let io_err = |source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        };

        let tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, &payload).map_err(|source| {
                ExportError::Serialize {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            writer.write_all(b"\n").map_err(io_err)?;
            writer.flush().map_err(io_err)?;
        }
        tmp.as_file().sync_all().map_err(io_err)?;

        tmp.persist(path).map_err(|e| ExportError::Persist {
            path: path.to_path_buf(),
            source: e.error,
        })?;

        tracing::info!(
            "Exported {} customers to {}",
            payload.metadata.total_customers,
            path.display()
        );
        Ok(payload.metadata)
    }
}
