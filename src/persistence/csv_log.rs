//! Append-only CSV audit sink
//!
//! Every evaluated opportunity becomes one flattened row. Writes happen on
//! the blocking pool; failures are logged and swallowed so the decision
//! pipeline never stalls on its audit trail.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, error};

use crate::common::errors::{EngineError, Result};
use crate::common::traits::AuditSink;
use crate::common::types::OperationRecord;

/// CSV-backed `AuditSink`
#[derive(Debug, Clone)]
pub struct CsvAuditSink {
    path: PathBuf,
}

impl CsvAuditSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_record(path: &Path, record: &OperationRecord) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Header only when the file is born.
    let write_header = !path.exists();
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(write_header)
        .from_writer(file);
    writer
        .serialize(record)
        .map_err(|e| EngineError::Internal(format!("CSV serialization failed: {}", e)))?;
    writer
        .flush()
        .map_err(|e| EngineError::Internal(format!("CSV flush failed: {}", e)))?;
    Ok(())
}

#[async_trait]
impl AuditSink for CsvAuditSink {
    async fn append(&self, record: &OperationRecord) {
        let path = self.path.clone();
        let record = record.clone();
        let symbol = record.symbol.clone();

        let result = tokio::task::spawn_blocking(move || write_record(&path, &record)).await;
        match result {
            Ok(Ok(())) => debug!(%symbol, "operation recorded"),
            Ok(Err(err)) => error!(%symbol, error = %err, "failed to append audit record"),
            Err(err) => error!(%symbol, error = %err, "audit write task panicked"),
        }
    }
}
