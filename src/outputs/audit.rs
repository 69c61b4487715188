//! Audit records: one JSON document per run, appended to a collection.
//!
//! The store is an opaque append target. [`FileAuditStore`] keeps a collection
//! as a JSON-lines file:
//!
//! ```text
//! target/
//! └── digests.jsonl   # one document per run
//! ```
//!
//! Audit failures never fail a run; the pipeline logs them and moves on.

use crate::error::{DigestError, Result};
use crate::models::Window;
use crate::outputs::report::{Report, ReportTables};
use crate::utils::ensure_writable_dir;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};

/// The document written for every run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    pub count: usize,
    pub window: Window,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permlink: Option<String>,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub json_metadata: serde_json::Value,
    #[serde(flatten)]
    pub tables: Option<ReportTables>,
}

impl AuditRecord {
    /// Record for a window without any posts.
    pub fn empty(window: Window, generated_at: DateTime<Utc>) -> Self {
        AuditRecord {
            count: 0,
            window,
            generated_at,
            title: None,
            author: None,
            permlink: None,
            json_metadata: serde_json::Value::Null,
            tables: None,
        }
    }

    pub fn for_report(report: &Report, json_metadata: &serde_json::Value) -> Self {
        AuditRecord {
            count: report.count,
            window: report.window,
            generated_at: report.generated_at,
            title: Some(report.title.clone()),
            author: Some(report.author.clone()),
            permlink: Some(report.permlink.clone()),
            json_metadata: json_metadata.clone(),
            tables: Some(report.tables.clone()),
        }
    }
}

fn audit_err(e: impl std::fmt::Display) -> DigestError {
    DigestError::AuditWrite(e.to_string())
}

/// One-shot append target for audit records.
pub trait AuditStore {
    async fn write(&self, record: &AuditRecord) -> Result<()>;
}

/// Collection stored as `<target>/<collection>.jsonl`.
#[derive(Debug, Clone)]
pub struct FileAuditStore {
    pub target: PathBuf,
    pub collection: String,
}

impl FileAuditStore {
    pub fn new(target: impl Into<PathBuf>, collection: impl Into<String>) -> Self {
        FileAuditStore {
            target: target.into(),
            collection: collection.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.target.join(format!("{}.jsonl", self.collection))
    }
}

impl AuditStore for FileAuditStore {
    #[instrument(level = "info", skip_all, fields(collection = %self.collection, count = record.count))]
    async fn write(&self, record: &AuditRecord) -> Result<()> {
        ensure_writable_dir(&self.target).await.map_err(audit_err)?;
        let mut line = serde_json::to_string(record).map_err(audit_err)?;
        line.push('\n');

        let path = self.path();
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(audit_err)?;
        file.write_all(line.as_bytes()).await.map_err(audit_err)?;
        file.flush().await.map_err(audit_err)?;

        info!(path = %path.display(), "Wrote audit record");
        Ok(())
    }
}
