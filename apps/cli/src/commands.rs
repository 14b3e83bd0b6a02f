//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use lessonforge_crawler::{Dispatcher, HttpFetcher};
use lessonforge_ledger::ProgressLedger;
use lessonforge_shared::{AppConfig, CrawlConfig, init_config, load_catalog, load_config};
use tracing::info;
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// lessonforge — crawl lesson catalogs into local documents and assets.
#[derive(Parser)]
#[command(
    name = "lessonforge",
    version,
    about = "Crawl a subject catalog, download lesson assets, and convert lesson pages.",
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
    /// Crawl every subject in a catalog file.
    Run {
        /// Path to the subject catalog (JSON array of subjects).
        catalog: PathBuf,

        /// Concurrent lesson tasks (overrides the config file).
        #[arg(short, long)]
        concurrency: Option<u32>,

        /// Progress ledger path (overrides the config file).
        #[arg(long)]
        ledger: Option<PathBuf>,
    },

    /// Show progress ledger statistics.
    Status {
        /// Progress ledger path (overrides the config file).
        #[arg(long)]
        ledger: Option<PathBuf>,
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
        0 => "lessonforge=info",
        1 => "lessonforge=debug",
        _ => "lessonforge=trace",
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
        Command::Run {
            catalog,
            concurrency,
            ledger,
        } => cmd_run(&catalog, concurrency, ledger.as_deref()).await,
        Command::Status { ledger } => cmd_status(ledger.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(
    catalog_path: &Path,
    concurrency: Option<u32>,
    ledger_path: Option<&Path>,
) -> Result<()> {
    let config = load_config()?;
    let mut crawl_config = CrawlConfig::from(&config);

    if let Some(c) = concurrency {
        if c == 0 {
            return Err(eyre!("concurrency must be at least 1"));
        }
        crawl_config.concurrency = c;
    }
    if let Some(p) = ledger_path {
        crawl_config.ledger_path = p.to_path_buf();
    }

    let catalog = load_catalog(catalog_path)?;
    if catalog.is_empty() {
        return Err(eyre!(
            "catalog '{}' contains no subjects",
            catalog_path.display()
        ));
    }
    for subject in &catalog {
        Url::parse(&subject.url)
            .map_err(|e| eyre!("subject '{}' has an invalid URL '{}': {e}", subject.name, subject.url))?;
    }

    let ledger = ProgressLedger::open(&crawl_config.ledger_path)?;
    let fetcher = HttpFetcher::new(Duration::from_secs(crawl_config.navigation_timeout_secs))?;
    let dispatcher = Dispatcher::new(crawl_config, fetcher, ledger)?;

    // First ctrl-C stops opening new sessions; in-flight lessons finish.
    let cancel = dispatcher.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, finishing in-flight lessons");
            cancel.cancel();
        }
    });

    info!(
        catalog = %catalog_path.display(),
        subjects = catalog.len(),
        "starting crawl"
    );
    let report = dispatcher.run(&catalog).await;

    println!();
    println!("  Crawl finished");
    println!("  Processed: {}", report.lessons_processed);
    println!("  Skipped:   {}", report.lessons_skipped);
    println!("  Failed:    {}", report.lessons_failed);
    println!("  Time:      {:.1}s", report.duration.as_secs_f64());
    if !report.errors.is_empty() {
        println!();
        println!("  Errors:");
        for (url, error) in &report.errors {
            println!("    {url}: {error}");
        }
    }
    println!();

    if report.lessons_failed > 0 {
        return Err(eyre!(
            "{} lesson(s) failed; rerun to retry them",
            report.lessons_failed
        ));
    }
    Ok(())
}

async fn cmd_status(ledger_path: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let path = match ledger_path {
        Some(p) => p.to_path_buf(),
        None => CrawlConfig::from(&config).ledger_path,
    };

    if !path.exists() {
        println!("No progress ledger at '{}' — nothing crawled yet.", path.display());
        return Ok(());
    }

    let ledger = ProgressLedger::open(&path)?;
    println!("Ledger:            {}", path.display());
    println!("Lessons processed: {}", ledger.len());
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
