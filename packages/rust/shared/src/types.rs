//! Core domain types for the regcorpus document manifest.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RegcorpusError, Result};

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// The external, read-only manifest listing documents to acquire.
///
/// Loaded once per run from a TOML file:
///
/// ```toml
/// category = "Rule"
/// name = "Goods and Services Tax Rules"
///
/// [[documents]]
/// identifier = "001"
/// name = "Short title and commencement"
/// url = "https://gov.example/rules/001.pdf"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Short label used to synthesize document titles (e.g. "Rule").
    pub category: String,
    /// Display name of the whole collection.
    pub name: String,
    /// Ordered document entries.
    #[serde(default)]
    pub documents: Vec<ManifestEntry>,
}

/// A single document entry in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Zero-padded numeric code uniquely keying this entry (e.g. "087").
    pub identifier: String,
    /// Human-readable display name.
    pub name: String,
    /// Source URL for the authoritative PDF.
    pub url: String,
    /// Optional override for the local PDF path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_path: Option<PathBuf>,
    /// Optional override for the local markdown path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown_path: Option<PathBuf>,
}

impl Manifest {
    /// Load and validate a manifest from a TOML file.
    ///
    /// An unreadable or malformed manifest is fatal — no entries can be
    /// processed without it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RegcorpusError::config(format!("cannot read manifest {}: {e}", path.display()))
        })?;

        let manifest: Manifest = toml::from_str(&content).map_err(|e| {
            RegcorpusError::config(format!("malformed manifest {}: {e}", path.display()))
        })?;

        manifest.validate()?;
        tracing::debug!(
            path = %path.display(),
            documents = manifest.documents.len(),
            "manifest loaded"
        );
        Ok(manifest)
    }

    /// Check that every identifier is numeric and unique.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();

        for entry in &self.documents {
            if entry.identifier.parse::<u32>().is_err() {
                return Err(RegcorpusError::config(format!(
                    "identifier '{}' is not numeric",
                    entry.identifier
                )));
            }
            if !seen.insert(entry.identifier.clone()) {
                return Err(RegcorpusError::config(format!(
                    "duplicate identifier '{}'",
                    entry.identifier
                )));
            }
        }

        Ok(())
    }

    /// Entries sorted ascending by numeric identifier.
    ///
    /// This is the only ordering the corpus combiner guarantees, independent
    /// of the order artifacts were produced in.
    pub fn sorted_documents(&self) -> Vec<&ManifestEntry> {
        let mut docs: Vec<&ManifestEntry> = self.documents.iter().collect();
        docs.sort_by_key(|d| d.numeric_id());
        docs
    }
}

impl ManifestEntry {
    /// Numeric value of the identifier. Validated at manifest load time.
    pub fn numeric_id(&self) -> u32 {
        self.identifier.parse().unwrap_or(u32::MAX)
    }

    /// Local PDF path: the manifest override, or derived from the identifier.
    pub fn pdf_path(&self, download_root: &Path) -> PathBuf {
        match &self.pdf_path {
            Some(p) => p.clone(),
            None => download_root.join(format!("{}.pdf", self.identifier)),
        }
    }

    /// Local markdown path: the manifest override, or derived from the identifier.
    pub fn markdown_path(&self, markdown_root: &Path) -> PathBuf {
        match &self.markdown_path {
            Some(p) => p.clone(),
            None => markdown_root.join(format!("{}.md", self.identifier)),
        }
    }
}
