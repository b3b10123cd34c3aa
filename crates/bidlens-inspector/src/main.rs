//! `bidlens` command-line tool.
//!
//! Replays a recorded browsing session through the inspection pipeline, or
//! counts page resources matching a phrase.

use anyhow::{Context, Result};
use bidlens_capture::{InMemoryCaptureStore, LifecycleEvent};
use bidlens_core::{BidlensConfig, TabId};
use bidlens_inspector::{CookieJar, Inspector, RunOutcome, StaticCookieJar};
use bidlens_page::{count_matching_resources, FixturePage, PageContext, TokioClock};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay recorded lifecycle events and print the inspection report
    Replay {
        /// JSON array of recorded lifecycle events
        #[arg(short, long)]
        session: PathBuf,

        /// Tab to inspect
        #[arg(short, long, allow_negative_numbers = true)]
        tab: i64,

        /// Page fixture standing in for the live page
        #[arg(short, long)]
        page: Option<PathBuf>,

        /// JSON array of cookies visible to the page
        #[arg(long)]
        cookies: Option<PathBuf>,

        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,
    },

    /// Count page resources whose URL contains a phrase
    Count {
        /// Page fixture to search
        #[arg(short, long)]
        page: PathBuf,

        /// Phrase to look for (case-insensitive)
        phrase: String,
    },
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,bidlens=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>) -> BidlensConfig {
    let loaded = match path {
        Some(path) => BidlensConfig::load_from(path).map(|mut config| {
            config.apply_env_overrides();
            config
        }),
        None => BidlensConfig::load_with_env(),
    };
    loaded.unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        BidlensConfig::default()
    })
}

fn load_page(path: Option<&Path>) -> Result<FixturePage> {
    match path {
        Some(path) => FixturePage::from_path(path)
            .with_context(|| format!("reading page fixture {}", path.display())),
        None => Ok(FixturePage::default()),
    }
}

async fn replay(
    config: &BidlensConfig,
    session: &Path,
    tab: TabId,
    page: Option<&Path>,
    cookies: Option<&Path>,
    pretty: bool,
) -> Result<()> {
    let store = InMemoryCaptureStore::from_config(&config.capture)
        .context("building capture allowlist")?;

    let contents = std::fs::read_to_string(session)
        .with_context(|| format!("reading session {}", session.display()))?;
    let events: Vec<LifecycleEvent> =
        serde_json::from_str(&contents).context("parsing session events")?;
    let event_count = events.len();
    for event in events {
        event.apply_to(&store);
    }
    info!(events = event_count, "session replayed");

    let page: Arc<dyn PageContext> = Arc::new(load_page(page)?);
    let cookies: Arc<dyn CookieJar> = match cookies {
        Some(path) => Arc::new(
            StaticCookieJar::from_path(path)
                .with_context(|| format!("reading cookies {}", path.display()))?,
        ),
        None => Arc::new(StaticCookieJar::empty()),
    };

    let inspector = Inspector::from_config(
        Arc::new(store),
        page,
        cookies,
        Arc::new(TokioClock::new()),
        config,
    );

    match inspector.run(tab).await {
        RunOutcome::Completed(report) => {
            let json = if pretty {
                serde_json::to_string_pretty(&report)?
            } else {
                serde_json::to_string(&report)?
            };
            println!("{json}");
        }
        RunOutcome::Skipped => warn!(%tab, "inspection skipped"),
    }
    Ok(())
}

async fn count(page: &Path, phrase: &str) -> Result<()> {
    let page = load_page(Some(page))?;
    let result = count_matching_resources(&page, phrase).await?;
    println!("{} of {} resources match \"{}\"", result.count, result.total, phrase.trim());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Replay {
            session,
            tab,
            page,
            cookies,
            pretty,
        } => {
            replay(
                &config,
                &session,
                TabId::new(tab),
                page.as_deref(),
                cookies.as_deref(),
                pretty,
            )
            .await
        }
        Commands::Count { page, phrase } => count(&page, &phrase).await,
    }
}
