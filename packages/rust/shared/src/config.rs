//! Application configuration for regcorpus.
//!
//! User config lives at `~/.regcorpus/regcorpus.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RegcorpusError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "regcorpus.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".regcorpus";

// ---------------------------------------------------------------------------
// Config structs (matching regcorpus.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Artifact layout roots.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Fetch policies.
    #[serde(default)]
    pub fetch: FetchPoliciesConfig,
}

/// `[paths]` section — the filesystem artifact layout contract between the
/// acquisition, conversion, and combination stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root directory for downloaded PDFs.
    #[serde(default = "default_download_root")]
    pub download_root: String,

    /// Root directory for normalized markdown, mirrored by identifier.
    #[serde(default = "default_markdown_root")]
    pub markdown_root: String,

    /// Path of the combined corpus file.
    #[serde(default = "default_corpus_file")]
    pub corpus_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            download_root: default_download_root(),
            markdown_root: default_markdown_root(),
            corpus_file: default_corpus_file(),
        }
    }
}

fn default_download_root() -> String {
    "var/pdfs".into()
}
fn default_markdown_root() -> String {
    "var/markdown".into()
}
fn default_corpus_file() -> String {
    "var/corpus.md".into()
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchPoliciesConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Delay before the single validation retry, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Referer header override. Defaults to the origin of each document URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
}

impl Default for FetchPoliciesConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retry_delay_ms: default_retry_delay_ms(),
            referer: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_retry_delay_ms() -> u64 {
    400
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.regcorpus/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| RegcorpusError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.regcorpus/regcorpus.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| RegcorpusError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| RegcorpusError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| RegcorpusError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| RegcorpusError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| RegcorpusError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
