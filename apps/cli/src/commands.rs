//! CLI command definitions, routing, and tracing setup.

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use contextfunnel_core::{DB_FILE_NAME, Pipeline, ProcessOutcome, ProgressReporter};
use contextfunnel_shared::{AppConfig, data_dir, init_config, load_config};
use contextfunnel_storage::Storage;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ContextFunnel — aggregate any reference into LLM-ready text.
#[derive(Parser)]
#[command(
    name = "contextfunnel",
    version,
    about = "Turn repos, papers, videos, webpages, and local trees into LLM-ready context.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
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
    /// Process one reference: classify, extract, and write artifacts.
    Process {
        /// URL, GitHub link, DOI/PMID, or local path to process.
        reference: String,

        /// Directory for run artifacts and history (defaults to the
        /// configured data dir).
        #[arg(short, long)]
        output_dir: Option<String>,
    },

    /// List recent processing runs.
    List {
        /// Maximum number of runs to show.
        #[arg(short, long, default_value = "20")]
        limit: u32,
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
        0 => "contextfunnel=info",
        1 => "contextfunnel=debug",
        _ => "contextfunnel=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
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
        Command::Process {
            reference,
            output_dir,
        } => cmd_process(&reference, output_dir.as_deref()).await,
        Command::List { limit } => cmd_list(limit).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_process(reference: &str, output_dir: Option<&str>) -> Result<()> {
    let mut config = load_config()?;
    if let Some(dir) = output_dir {
        config.defaults.data_dir = dir.to_string();
    }

    info!(reference, "processing reference");

    let pipeline = Pipeline::from_config(&config).await?;
    let reporter = CliProgress::new();
    let outcome = pipeline.process(reference, &reporter).await?;

    println!();
    println!("  Run completed!");
    println!("  Run id:       {}", outcome.run_id);
    println!("  Kind:         {} (rule: {})", outcome.kind, outcome.rule);
    println!("  Uncompressed: {} tokens", outcome.uncompressed_tokens);
    println!("  Compressed:   {} tokens", outcome.compressed_tokens);
    if let Some(count) = outcome.url_count {
        println!("  URLs crawled: {count}");
    }
    for artifact in &outcome.artifacts {
        println!("  Artifact:     {}", artifact.path.display());
    }
    println!("  Time:         {:.1}s", outcome.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_list(limit: u32) -> Result<()> {
    let config = load_config()?;
    let root = data_dir(&config)?;
    let db_path = root.join(DB_FILE_NAME);

    if !db_path.exists() {
        println!("No runs recorded yet.");
        return Ok(());
    }

    let storage = Storage::open(&db_path).await?;
    let runs = storage.list_recent_runs(limit).await?;

    if runs.is_empty() {
        println!("No runs recorded yet.");
        return Ok(());
    }

    for run in runs {
        let when = run.created_at.format("%Y-%m-%d %H:%M:%S");
        let tokens = match (run.uncompressed_tokens, run.compressed_tokens) {
            (Some(uncompressed), Some(compressed)) => {
                format!("{uncompressed}/{compressed} tokens")
            }
            _ => "-".to_string(),
        };
        println!(
            "  {}  {when}  {:<9}  {:<12}  {:<24}  {}",
            run.id,
            run.status.as_str(),
            run.kind.as_str(),
            tokens,
            run.reference,
        );
    }

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _outcome: &ProcessOutcome) {
        self.spinner.finish_and_clear();
    }
}
