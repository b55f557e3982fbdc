//! Machine-readable acquisition run report.
//!
//! One report per `fetch` run, with a record per manifest entry. This is
//! the observability contract for the acquisition stage: external tooling
//! reads it to see what was fetched, how big it was, and where it landed.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use regcorpus_shared::{RegcorpusError, Result};

/// Per-entry acquisition record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    /// Manifest identifier.
    pub identifier: String,
    /// Whether an accepted payload landed at `final_path`.
    pub success: bool,
    /// Payload size in bytes (successful fetches only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byte_size: Option<usize>,
    /// Content-Type of the accepted response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// SHA-256 of the accepted payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    /// Where the payload was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_path: Option<PathBuf>,
    /// Failure description for unsuccessful fetches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReportEntry {
    /// Record an accepted payload.
    pub fn success(
        identifier: impl Into<String>,
        body: &[u8],
        mime_type: impl Into<String>,
        final_path: impl Into<PathBuf>,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(body);

        Self {
            identifier: identifier.into(),
            success: true,
            byte_size: Some(body.len()),
            mime_type: Some(mime_type.into()),
            sha256: Some(format!("{:x}", hasher.finalize())),
            final_path: Some(final_path.into()),
            error: None,
        }
    }

    /// Record a per-document failure.
    pub fn failure(identifier: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            success: false,
            byte_size: None,
            mime_type: None,
            sha256: None,
            final_path: None,
            error: Some(error.into()),
        }
    }
}

/// The full acquisition run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Time-sortable run identifier.
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub entries: Vec<ReportEntry>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::now_v7(),
            started_at: Utc::now(),
            finished_at: None,
            entries: Vec::new(),
        }
    }

    pub fn record(&mut self, entry: ReportEntry) {
        self.entries.push(entry);
    }

    /// Stamp the end time.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.success).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.succeeded()
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RegcorpusError::io(parent, e))?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| RegcorpusError::validation(format!("report serialization failed: {e}")))?;
        std::fs::write(path, json).map_err(|e| RegcorpusError::io(path, e))?;
        Ok(())
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_entry_carries_checksum_and_size() {
        let entry = ReportEntry::success("012", b"%PDF-payload", "application/pdf", "var/012.pdf");
        assert!(entry.success);
        assert_eq!(entry.byte_size, Some(12));
        assert_eq!(entry.sha256.as_ref().map(String::len), Some(64));
        assert!(entry.error.is_none());
    }

    #[test]
    fn counts_split_by_success() {
        let mut report = RunReport::new();
        report.record(ReportEntry::success("001", b"x", "application/pdf", "a.pdf"));
        report.record(ReportEntry::failure("002", "validation: wrong mime"));
        report.record(ReportEntry::failure("003", "network: timeout"));

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 2);
    }

    #[test]
    fn report_roundtrips_through_json() {
        let mut report = RunReport::new();
        report.record(ReportEntry::failure("042", "too many redirects"));
        report.finish();

        let dir = std::env::temp_dir().join(format!("regcorpus-report-test-{}", Uuid::now_v7()));
        let path = dir.join("fetch-report.json");
        report.write_json(&path).unwrap();

        let parsed: RunReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].identifier, "042");
        assert!(parsed.finished_at.is_some());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
