//! Deterministic per-page PDF text extraction.
//!
//! Pages are visited in ascending page-number order; text runs within a
//! page are joined with single spaces and pages are separated by a blank
//! line, so the same PDF always yields the same text.

use std::path::Path;

use lopdf::Document;
use tracing::{debug, instrument, warn};

use regcorpus_shared::{RegcorpusError, Result};

/// Ordered text extracted from one PDF.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// Total number of pages in the document.
    pub page_count: usize,
    /// Concatenated page text, ascending by page number, pages separated
    /// by a blank line.
    pub text: String,
}

/// Extract page text from a validated PDF on disk.
///
/// A PDF that cannot be opened (corrupt, encrypted) is an extraction error
/// tagged with the document identifier; the caller continues with the rest
/// of the manifest. An unreadable run *within* an otherwise readable page
/// degrades to the empty string instead of failing the document.
#[instrument(skip_all, fields(identifier = %identifier, path = %path.display()))]
pub fn extract_pdf(path: &Path, identifier: &str) -> Result<ExtractedDocument> {
    let doc = Document::load(path).map_err(|e| {
        RegcorpusError::extraction(identifier, format!("cannot open PDF: {e}"))
    })?;

    if doc.is_encrypted() {
        return Err(RegcorpusError::extraction(identifier, "PDF is encrypted"));
    }

    let pages = doc.get_pages();
    let mut page_texts: Vec<String> = Vec::with_capacity(pages.len());

    for &number in pages.keys() {
        // Empty string substituted for any text run the parser cannot read.
        let raw = match doc.extract_text(&[number]) {
            Ok(text) => text,
            Err(e) => {
                warn!(page = number, error = %e, "unreadable page text, substituting empty");
                String::new()
            }
        };
        page_texts.push(join_runs(&raw));
    }

    debug!(pages = pages.len(), "extraction complete");

    Ok(ExtractedDocument {
        page_count: pages.len(),
        text: page_texts.join("\n\n"),
    })
}

/// Collapse a page's raw text runs into one line, runs joined by single
/// spaces. The parser's own separators (newlines per text operation,
/// doubled spaces) are not stable across producers, so they are not kept.
fn join_runs(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Object, Stream, dictionary};
    use std::path::PathBuf;
    use uuid::Uuid;

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("regcorpus-extract-test-{}", Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    /// Build a minimal PDF with one page per entry in `page_texts`.
    fn build_pdf(path: &Path, page_texts: &[&str]) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in page_texts {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![100.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().unwrap(),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    fn cleanup(path: &Path) {
        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn three_page_pdf_extracts_in_page_order() {
        let path = temp_path("rules.pdf");
        build_pdf(&path, &["Rule 1", "Rule 2", "Rule 3"]);

        let extracted = extract_pdf(&path, "001").unwrap();

        assert_eq!(extracted.page_count, 3);
        let one = extracted.text.find("Rule 1").expect("page 1 text");
        let two = extracted.text.find("Rule 2").expect("page 2 text");
        let three = extracted.text.find("Rule 3").expect("page 3 text");
        assert!(one < two && two < three, "pages out of order");

        cleanup(&path);
    }

    #[test]
    fn pages_are_separated_by_blank_line() {
        let path = temp_path("two.pdf");
        build_pdf(&path, &["First page", "Second page"]);

        let extracted = extract_pdf(&path, "002").unwrap();
        assert!(extracted.text.contains("\n\n"));

        cleanup(&path);
    }

    #[test]
    fn corrupt_pdf_is_extraction_error_with_identifier() {
        let path = temp_path("broken.pdf");
        std::fs::write(&path, b"this is not a pdf at all").unwrap();

        let err = extract_pdf(&path, "042").unwrap_err();
        assert!(matches!(err, RegcorpusError::Extraction { .. }));
        assert!(err.to_string().contains("042"));

        cleanup(&path);
    }

    #[test]
    fn join_runs_collapses_parser_separators() {
        assert_eq!(join_runs("Rule  1\nfirst   proviso\n"), "Rule 1 first proviso");
        assert_eq!(join_runs(""), "");
        assert_eq!(join_runs("   \n  "), "");
    }
}
