//! Normalized markdown document assembly and front-matter handling.
//!
//! This crate is pure text transformation: extracted page text goes in,
//! a durable markdown artifact (front matter + heading + normalized body)
//! comes out. Writing the artifact to disk is the pipeline's job.

mod normalize;

use chrono::Utc;
use tracing::debug;

pub use normalize::normalize;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Options for assembling one document artifact.
#[derive(Debug, Clone)]
pub struct DocumentOptions {
    /// Short label from the manifest (e.g. "Rule"), used in the title.
    pub category: String,
    /// Zero-padded document identifier.
    pub identifier: String,
    /// Display name of the document.
    pub name: String,
    /// Source URL the PDF was acquired from.
    pub source_url: String,
    /// Page count reported by extraction.
    pub page_count: usize,
    /// RFC 3339 generation timestamp. `None` stamps the current time.
    pub generated_at: Option<String>,
}

/// An assembled document artifact.
#[derive(Debug, Clone)]
pub struct AssembledDocument {
    /// The full markdown artifact (front matter + heading + body).
    pub markdown: String,
    /// The synthesized title, e.g. `"Rule 087: Refund of tax"`.
    pub title: String,
}

/// Front-matter fields of a document artifact.
///
/// All fields are optional: the combiner parses front matter best-effort
/// and degrades to empty metadata on malformed blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub source_url: Option<String>,
    pub pages: Option<usize>,
    pub generated_at: Option<String>,
}

// ---------------------------------------------------------------------------
// Document assembly
// ---------------------------------------------------------------------------

/// Assemble the durable per-document artifact from extracted text.
///
/// Layout: front-matter block, a level-1 heading restating the document
/// name, then the normalized body.
pub fn assemble_document(text: &str, opts: &DocumentOptions) -> AssembledDocument {
    let title = format!("{} {}: {}", opts.category, opts.identifier, opts.name);
    let generated_at = opts
        .generated_at
        .clone()
        .unwrap_or_else(|| Utc::now().to_rfc3339());

    let body = normalize(text);
    let front_matter = build_front_matter(&title, &opts.source_url, opts.page_count, &generated_at);

    let markdown = format!("{front_matter}\n# {}\n\n{body}", opts.name);

    debug!(
        identifier = %opts.identifier,
        pages = opts.page_count,
        bytes = markdown.len(),
        "document assembled"
    );

    AssembledDocument { markdown, title }
}

/// Build the front-matter block with fixed keys.
fn build_front_matter(title: &str, source_url: &str, pages: usize, generated_at: &str) -> String {
    let mut fm = String::from("---\n");
    fm.push_str(&format!("title: \"{}\"\n", escape_yaml_string(title)));
    fm.push_str(&format!("source_url: \"{source_url}\"\n"));
    fm.push_str(&format!("pages: {pages}\n"));
    fm.push_str(&format!("generated_at: \"{generated_at}\"\n"));
    fm.push_str("---\n");
    fm
}

/// Escape special characters in a YAML string value.
fn escape_yaml_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

// ---------------------------------------------------------------------------
// Front-matter parsing
// ---------------------------------------------------------------------------

/// Split a document artifact into its front matter and body.
///
/// Best-effort: a missing or malformed front-matter block yields empty
/// metadata and the full text as body, never an error.
pub fn parse_front_matter(doc: &str) -> (FrontMatter, &str) {
    let Some(rest) = doc.strip_prefix("---\n") else {
        return (FrontMatter::default(), doc);
    };

    let Some(end) = rest.find("\n---\n") else {
        return (FrontMatter::default(), doc);
    };

    let block = &rest[..end];
    let body = &rest[end + "\n---\n".len()..];

    let mut fm = FrontMatter::default();
    for line in block.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = unquote(value.trim());

        match key.trim() {
            "title" => fm.title = Some(value),
            "source_url" => fm.source_url = Some(value),
            "pages" => fm.pages = value.parse().ok(),
            "generated_at" => fm.generated_at = Some(value),
            _ => {}
        }
    }

    (fm, body)
}

/// Strip surrounding double quotes and unescape the YAML string escapes
/// `build_front_matter` produces.
fn unquote(value: &str) -> String {
    let inner = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    inner.replace("\\\"", "\"").replace("\\\\", "\\")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
