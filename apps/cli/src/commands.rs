//! CLI command definitions, routing, and tracing setup.

use std::path::Path;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use regcorpus_core::pipeline::{
    ConvertSummary, FetchOptions, PipelinePaths, ProgressReporter, acquire, convert,
};
use regcorpus_core::{assemble_grounding, combine};
use regcorpus_shared::{Manifest, init_config, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// regcorpus — build a grounded regulatory corpus from government PDFs.
#[derive(Parser)]
#[command(
    name = "regcorpus",
    version,
    about = "Acquire regulatory PDFs and assemble a citable markdown corpus.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch every manifest entry's PDF into the download root.
    Fetch {
        /// Path to the document manifest (TOML).
        #[arg(short, long)]
        manifest: String,

        /// Re-fetch documents whose PDF already exists locally.
        #[arg(long)]
        force: bool,
    },

    /// Convert downloaded PDFs into normalized markdown artifacts.
    Convert {
        /// Path to the document manifest (TOML).
        #[arg(short, long)]
        manifest: String,
    },

    /// Combine markdown artifacts into the single corpus file.
    Combine {
        /// Path to the document manifest (TOML).
        #[arg(short, long)]
        manifest: String,
    },

    /// Assemble the grounding context from the combined corpus.
    Ground {
        /// Path to a higher-authority document that prevails on conflict.
        #[arg(long)]
        act: Option<String>,

        /// Write the grounding context here instead of stdout.
        #[arg(short, long)]
        out: Option<String>,
    },

    /// Run the full pipeline: fetch, convert, combine.
    Run {
        /// Path to the document manifest (TOML).
        #[arg(short, long)]
        manifest: String,

        /// Re-fetch documents whose PDF already exists locally.
        #[arg(long)]
        force: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "regcorpus=info",
        1 => "regcorpus=debug",
        _ => "regcorpus=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Fetch { manifest, force } => cmd_fetch(&manifest, force).await,
        Command::Convert { manifest } => cmd_convert(&manifest),
        Command::Combine { manifest } => cmd_combine(&manifest),
        Command::Ground { act, out } => cmd_ground(act.as_deref(), out.as_deref()),
        Command::Run { manifest, force } => cmd_run(&manifest, force).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Progress rendering
// ---------------------------------------------------------------------------

/// Terminal progress bar bridging the core's progress callbacks.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{msg} [{bar:30}] {pos}/{len}")
                .expect("valid progress template")
                .progress_chars("=> "),
        );
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn document_fetched(&self, identifier: &str, success: bool, current: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(current as u64);
        if !success {
            self.bar.println(format!("  failed: {identifier}"));
        }
    }

    fn document_converted(&self, _identifier: &str, current: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(current as u64);
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_fetch(manifest_path: &str, force: bool) -> Result<()> {
    let config = load_config()?;
    let manifest = Manifest::load(Path::new(manifest_path))?;
    let paths = PipelinePaths::from(&config);

    let progress = CliProgress::new();
    let report = acquire(
        &manifest,
        &config.fetch,
        &paths,
        &FetchOptions { force },
        &progress,
    )
    .await?;
    progress.finish();

    println!(
        "Fetched {} of {} documents ({} failed)",
        report.succeeded(),
        report.entries.len(),
        report.failed()
    );
    for entry in report.entries.iter().filter(|e| !e.success) {
        println!(
            "  {} — {}",
            entry.identifier,
            entry.error.as_deref().unwrap_or("unknown failure")
        );
    }

    Ok(())
}

fn cmd_convert(manifest_path: &str) -> Result<()> {
    let config = load_config()?;
    let manifest = Manifest::load(Path::new(manifest_path))?;
    let paths = PipelinePaths::from(&config);

    let progress = CliProgress::new();
    let summary = convert(&manifest, &paths, &progress)?;
    progress.finish();

    print_convert_summary(&summary);
    Ok(())
}

fn cmd_combine(manifest_path: &str) -> Result<()> {
    let config = load_config()?;
    let manifest = Manifest::load(Path::new(manifest_path))?;
    let paths = PipelinePaths::from(&config);

    let result = combine(&manifest, &paths.markdown_root, &paths.corpus_file)?;

    println!(
        "Combined {} documents into {}",
        result.included.len(),
        result.corpus_path.display()
    );
    if !result.skipped.is_empty() {
        println!("  skipped (no artifact): {}", result.skipped.join(", "));
    }

    Ok(())
}

fn cmd_ground(act_path: Option<&str>, out_path: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let paths = PipelinePaths::from(&config);

    let corpus = std::fs::read_to_string(&paths.corpus_file).map_err(|e| {
        eyre!(
            "cannot read corpus {} (run `regcorpus combine` first): {e}",
            paths.corpus_file.display()
        )
    })?;

    let act = match act_path {
        Some(p) => Some(
            std::fs::read_to_string(p).map_err(|e| eyre!("cannot read act file {p}: {e}"))?,
        ),
        None => None,
    };

    let grounding = assemble_grounding(&corpus, act.as_deref());

    match out_path {
        Some(p) => {
            std::fs::write(p, &grounding)?;
            info!(path = %p, bytes = grounding.len(), "grounding context written");
        }
        None => print!("{grounding}"),
    }

    Ok(())
}

async fn cmd_run(manifest_path: &str, force: bool) -> Result<()> {
    let config = load_config()?;
    let manifest = Manifest::load(Path::new(manifest_path))?;
    let paths = PipelinePaths::from(&config);

    let progress = CliProgress::new();
    let report = acquire(
        &manifest,
        &config.fetch,
        &paths,
        &FetchOptions { force },
        &progress,
    )
    .await?;
    let summary = convert(&manifest, &paths, &progress)?;
    progress.finish();

    let result = combine(&manifest, &paths.markdown_root, &paths.corpus_file)?;

    println!(
        "Fetched {}/{} · converted {} · corpus: {} documents at {}",
        report.succeeded(),
        report.entries.len(),
        summary.converted.len(),
        result.included.len(),
        result.corpus_path.display()
    );
    print_convert_summary(&summary);

    Ok(())
}

fn print_convert_summary(summary: &ConvertSummary) {
    println!(
        "Converted {} documents ({} skipped, {} errors)",
        summary.converted.len(),
        summary.skipped.len(),
        summary.errors.len()
    );
    for (identifier, error) in &summary.errors {
        println!("  {identifier} — {error}");
    }
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let rendered = toml::to_string_pretty(&config)?;
    println!("{rendered}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
