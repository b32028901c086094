use anyhow::{Context, Result};
use chrono::Local;
use clap::{ArgAction, Parser};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use slate_harvester::config::AppConfig;
use slate_harvester::normalizer::DedupMode;
use slate_harvester::sink::CsvSink;
use slate_harvester::utils::retry::RetryPolicy;
use slate_harvester::{ChromeSession, Harvester, PageSession, RunKey, SimulatedSession, Weekday};

/// Harvest completed daily fantasy results into a CSV file.
#[derive(Parser, Debug)]
#[command(name = "slate-harvester", version, about)]
struct Cli {
    /// Season week number; detected from the season start date when omitted
    #[arg(long)]
    week: Option<u32>,

    /// Game day; detected from today's date when omitted
    #[arg(long, value_enum, ignore_case = true)]
    day: Option<Weekday>,

    /// Run the browser headless
    #[arg(long, action = ArgAction::Set)]
    headless: Option<bool>,

    /// Show the browser window (same as --headless false)
    #[arg(long)]
    visible: bool,

    /// Results page to harvest
    #[arg(long)]
    url: Option<String>,

    /// Extra configuration file layered over config/harvester.*
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// One merged view across slates; a player appears once
    #[arg(long)]
    merged: bool,

    /// Only harvest the slate with this label or id
    #[arg(long)]
    slate: Option<String>,

    /// Re-parse a saved page instead of launching a browser
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(headless) = self.headless {
            config.browser.headless = headless;
        }
        if self.visible {
            config.browser.headless = false;
        }
        if let Some(url) = &self.url {
            config.target.url = url.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
        if self.merged {
            config.slates.dedup = DedupMode::Merged;
        }
        if let Some(slate) = &self.slate {
            config.slates.only = Some(slate.clone());
        }
        if self.snapshot.is_some() {
            // A saved page never changes; waiting on it gains nothing
            config.slates.discover = false;
            config.waits.initial_settle_ms = 0;
            config.waits.retry = RetryPolicy::immediate(1);
            config.lazy_load.settle_ms = 0;
            config.lazy_load.incremental_settle_ms = 0;
        }
    }
}

fn init_tracing(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::from_default_env().add_directive("slate_harvester=info".parse()?);
    let registry = tracing_subscriber::registry().with(filter).with(fmt::layer());

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "slate-harvester.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Ok(Some(guard))
        }
        None => {
            registry.init();
            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_dir.as_deref())?;

    info!("Starting slate harvester...");

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply(&mut config);

    let run_key = RunKey::resolve(
        cli.week,
        cli.day,
        Local::now().date_naive(),
        config.season.start_date,
    );
    info!(run = %run_key, "Resolved run");

    let sink = CsvSink::from_config(&config.output);
    let harvester = Harvester::new(config)?;

    let outcome = match &cli.snapshot {
        Some(path) => {
            let html = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
            let mut session = SimulatedSession::from_html(html);
            harvester.run(&mut session, run_key, &sink).await?
        }
        None => {
            let mut session = ChromeSession::launch(&harvester.config().browser)?;
            let result = harvester.run(&mut session, run_key, &sink).await;
            if let Err(e) = session.close().await {
                warn!(error = %e, "Failed to close browser session");
            }
            result?
        }
    };

    println!(
        "Harvested {} records for {}",
        outcome.report.dataset.len(),
        outcome.report.run_key
    );
    if let Some(path) = &outcome.written {
        println!("Saved to {}", path.display());
    }

    info!("Shutting down...");
    Ok(())
}
