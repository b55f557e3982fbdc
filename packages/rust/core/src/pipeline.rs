//! Acquisition and conversion stages over a manifest.
//!
//! Entries are processed sequentially: one shared cookie session, no
//! concurrent bursts against servers that already dislike automation. A
//! single document's failure is recorded and the batch continues; only a
//! missing or malformed manifest aborts a run.

use std::path::PathBuf;

use tracing::{info, instrument, warn};

use regcorpus_extract::extract_pdf;
use regcorpus_fetcher::{FetchSession, ReportEntry, RunReport, write_atomic};
use regcorpus_markdown::{DocumentOptions, assemble_document};
use regcorpus_shared::{AppConfig, FetchPoliciesConfig, Manifest, Result};

/// File name of the acquisition run report, written under the download root.
const REPORT_FILE_NAME: &str = "fetch-report.json";

// ---------------------------------------------------------------------------
// Paths and options
// ---------------------------------------------------------------------------

/// Resolved artifact layout for one run.
#[derive(Debug, Clone)]
pub struct PipelinePaths {
    /// Root directory for downloaded PDFs.
    pub download_root: PathBuf,
    /// Root directory for normalized markdown artifacts.
    pub markdown_root: PathBuf,
    /// Path of the combined corpus file.
    pub corpus_file: PathBuf,
}

impl From<&AppConfig> for PipelinePaths {
    fn from(config: &AppConfig) -> Self {
        Self {
            download_root: PathBuf::from(&config.paths.download_root),
            markdown_root: PathBuf::from(&config.paths.markdown_root),
            corpus_file: PathBuf::from(&config.paths.corpus_file),
        }
    }
}

/// Options for the acquisition stage.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Re-fetch documents whose PDF already exists locally.
    pub force: bool,
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback so the CLI can render status without the core
/// depending on a terminal.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new stage.
    fn phase(&self, name: &str);
    /// Called after each acquisition attempt.
    fn document_fetched(&self, identifier: &str, success: bool, current: usize, total: usize);
    /// Called after each conversion.
    fn document_converted(&self, identifier: &str, current: usize, total: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn document_fetched(&self, _identifier: &str, _success: bool, _current: usize, _total: usize) {}
    fn document_converted(&self, _identifier: &str, _current: usize, _total: usize) {}
}

// ---------------------------------------------------------------------------
// Acquisition
// ---------------------------------------------------------------------------

/// Fetch every manifest entry's PDF, sequentially, through one session.
///
/// Returns the run report; also writes it as JSON under the download root.
/// Per-document failures are recorded, never propagated.
#[instrument(skip_all, fields(documents = manifest.documents.len()))]
pub async fn acquire(
    manifest: &Manifest,
    policies: &FetchPoliciesConfig,
    paths: &PipelinePaths,
    options: &FetchOptions,
    progress: &dyn ProgressReporter,
) -> Result<RunReport> {
    progress.phase("Acquiring documents");

    let session = FetchSession::new(policies)?;
    let mut report = RunReport::new();
    let sorted = manifest.sorted_documents();
    let total = sorted.len();

    for (i, entry) in sorted.iter().enumerate() {
        let target = entry.pdf_path(&paths.download_root);

        if !options.force && target.exists() {
            // Resumable runs: a payload that already passed validation
            // stays in place.
            match std::fs::read(&target) {
                Ok(body) => {
                    info!(identifier = %entry.identifier, "PDF already present, skipping fetch");
                    report.record(ReportEntry::success(
                        &entry.identifier,
                        &body,
                        "application/pdf",
                        &target,
                    ));
                    progress.document_fetched(&entry.identifier, true, i + 1, total);
                    continue;
                }
                Err(e) => {
                    warn!(identifier = %entry.identifier, error = %e, "unreadable local PDF, re-fetching");
                }
            }
        }

        let result = session.fetch_pdf(&entry.url).await;

        if result.is_ok() {
            match write_atomic(&target, &result.body) {
                Ok(()) => {
                    report.record(ReportEntry::success(
                        &entry.identifier,
                        &result.body,
                        &result.mime_type,
                        &target,
                    ));
                    progress.document_fetched(&entry.identifier, true, i + 1, total);
                }
                Err(e) => {
                    warn!(identifier = %entry.identifier, error = %e, "failed to write PDF");
                    report.record(ReportEntry::failure(&entry.identifier, e.to_string()));
                    progress.document_fetched(&entry.identifier, false, i + 1, total);
                }
            }
        } else {
            let reason = result
                .failure
                .map(|f| f.to_string())
                .unwrap_or_else(|| "unknown failure".into());
            report.record(ReportEntry::failure(&entry.identifier, reason));
            progress.document_fetched(&entry.identifier, false, i + 1, total);
        }
    }

    report.finish();
    report.write_json(&paths.download_root.join(REPORT_FILE_NAME))?;

    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        "acquisition complete"
    );

    Ok(report)
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

/// Summary of a conversion stage.
#[derive(Debug, Clone, Default)]
pub struct ConvertSummary {
    /// Identifiers converted to markdown artifacts.
    pub converted: Vec<String>,
    /// Identifiers skipped because no PDF was present.
    pub skipped: Vec<String>,
    /// Per-document extraction errors (identifier, message).
    pub errors: Vec<(String, String)>,
}

/// Convert every locally present PDF into its normalized markdown artifact.
///
/// Extraction and normalization are pure and synchronous; a document that
/// fails to extract is recorded and the batch continues.
#[instrument(skip_all, fields(documents = manifest.documents.len()))]
pub fn convert(
    manifest: &Manifest,
    paths: &PipelinePaths,
    progress: &dyn ProgressReporter,
) -> Result<ConvertSummary> {
    progress.phase("Converting to markdown");

    let mut summary = ConvertSummary::default();
    let sorted = manifest.sorted_documents();
    let total = sorted.len();

    for (i, entry) in sorted.iter().enumerate() {
        let pdf_path = entry.pdf_path(&paths.download_root);

        if !pdf_path.exists() {
            warn!(identifier = %entry.identifier, "no PDF for entry, skipping conversion");
            summary.skipped.push(entry.identifier.clone());
            continue;
        }

        let extracted = match extract_pdf(&pdf_path, &entry.identifier) {
            Ok(extracted) => extracted,
            Err(e) => {
                warn!(identifier = %entry.identifier, error = %e, "extraction failed");
                summary.errors.push((entry.identifier.clone(), e.to_string()));
                continue;
            }
        };

        let doc = assemble_document(
            &extracted.text,
            &DocumentOptions {
                category: manifest.category.clone(),
                identifier: entry.identifier.clone(),
                name: entry.name.clone(),
                source_url: entry.url.clone(),
                page_count: extracted.page_count,
                generated_at: None,
            },
        );

        let md_path = entry.markdown_path(&paths.markdown_root);
        write_atomic(&md_path, doc.markdown.as_bytes())?;

        summary.converted.push(entry.identifier.clone());
        progress.document_converted(&entry.identifier, i + 1, total);
    }

    info!(
        converted = summary.converted.len(),
        skipped = summary.skipped.len(),
        errors = summary.errors.len(),
        "conversion complete"
    );

    Ok(summary)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
