//! Corpus combiner: merge per-document artifacts into one ordered,
//! provenance-tagged corpus file.
//!
//! Output order is always ascending manifest identifier, independent of the
//! order artifacts were produced in. Entries without a backing artifact are
//! skipped with a warning; the combine never fails because of them.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, instrument, warn};

use regcorpus_fetcher::write_atomic;
use regcorpus_markdown::parse_front_matter;
use regcorpus_shared::{Manifest, ManifestEntry, Result};

/// Summary of a combine invocation.
#[derive(Debug, Clone)]
pub struct CombineResult {
    /// Where the corpus was written.
    pub corpus_path: PathBuf,
    /// Identifiers included, in corpus order.
    pub included: Vec<String>,
    /// Identifiers skipped for lack of a backing artifact.
    pub skipped: Vec<String>,
}

/// Combine all per-document artifacts under `markdown_root` into a single
/// corpus at `corpus_file`.
///
/// The corpus is rebuilt in full on every invocation; given unchanged
/// inputs the output is byte-identical.
#[instrument(skip_all, fields(documents = manifest.documents.len()))]
pub fn combine(manifest: &Manifest, markdown_root: &Path, corpus_file: &Path) -> Result<CombineResult> {
    let mut sections: Vec<String> = Vec::new();
    let mut included: Vec<String> = Vec::new();
    let mut skipped: Vec<String> = Vec::new();

    for entry in manifest.sorted_documents() {
        let artifact = entry.markdown_path(markdown_root);

        let content = match std::fs::read_to_string(&artifact) {
            Ok(content) => content,
            Err(_) => {
                warn!(
                    identifier = %entry.identifier,
                    path = %artifact.display(),
                    "no artifact for manifest entry, skipping"
                );
                skipped.push(entry.identifier.clone());
                continue;
            }
        };

        sections.push(render_section(entry, &content));
        included.push(entry.identifier.clone());
    }

    let corpus = finalize(&sections.join("\n\n"));
    write_atomic(corpus_file, corpus.as_bytes())?;

    info!(
        included = included.len(),
        skipped = skipped.len(),
        path = %corpus_file.display(),
        "corpus combined"
    );

    Ok(CombineResult {
        corpus_path: corpus_file.to_path_buf(),
        included,
        skipped,
    })
}

/// Render one document's corpus section: begin marker, metadata block,
/// trimmed body, end marker.
fn render_section(entry: &ManifestEntry, artifact: &str) -> String {
    let (fm, body) = parse_front_matter(artifact);

    // The manifest URL backs up artifacts whose front matter lost theirs.
    let source_url = fm.source_url.unwrap_or_else(|| entry.url.clone());
    let pages = fm
        .pages
        .map(|p| p.to_string())
        .unwrap_or_else(|| "unknown".into());
    let generated_at = fm.generated_at.unwrap_or_else(|| "unknown".into());

    let mut section = String::new();
    section.push_str(&format!(
        "===== BEGIN DOCUMENT {}: {} =====\n",
        entry.identifier, entry.name
    ));
    section.push_str(&format!("Identifier: {}\n", entry.identifier));
    section.push_str(&format!("Document: {}\n", entry.name));
    section.push_str(&format!("Source: {source_url}\n"));
    section.push_str(&format!("Pages: {pages}\n"));
    section.push_str(&format!("Generated: {generated_at}\n"));
    section.push('\n');
    section.push_str(body.trim());
    section.push('\n');
    section.push_str(&format!(
        "===== END DOCUMENT {}: {} =====",
        entry.identifier, entry.name
    ));
    section
}

/// Collapse runs of 3+ blank lines between documents down to a single
/// separating blank line, and terminate with exactly one newline.
fn finalize(corpus: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{4,}").expect("valid regex"));

    let collapsed = MULTI_BLANK_RE.replace_all(corpus, "\n\n");
    format!("{}\n", collapsed.trim_end_matches('\n'))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
