//! CLI commands.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use console::style;

use crate::browser::{BrowserProvider, SessionProvider};
use crate::config::Settings;
use crate::models::TaskRun;
use crate::repository::{GameStore, MemoryStore, SqliteStore};
use crate::scheduler::{ScrapeCycle, TaskScheduler};
use crate::scrapers::ScraperRegistry;

/// Name under which the recurring collection job is registered.
const COLLECTION_JOB: &str = "game-collection";

#[derive(Parser)]
#[command(name = "gamepulse")]
#[command(about = "Live casino game data collection and monitoring")]
#[command(version)]
pub struct Cli {
    /// Settings file
    #[arg(long, global = true, default_value = "gamepulse.toml")]
    config: PathBuf,

    /// Database path (overrides the settings file)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Use an in-memory store instead of SQLite
    #[arg(long, global = true)]
    memory: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Run one collection cycle immediately
    Run,

    /// Register the configured schedule and collect until Ctrl-C
    Watch,

    /// List configured games
    Games,

    /// Show stored records
    Records,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load_or_default(&cli.config)?;
    if let Some(database) = &cli.database {
        settings.database.path = database.clone();
    }

    match &cli.command {
        Commands::Run => cmd_run(&cli, &settings).await,
        Commands::Watch => cmd_watch(&cli, &settings).await,
        Commands::Games => cmd_games(&settings),
        Commands::Records => cmd_records(&cli, &settings).await,
    }
}

fn build_store(cli: &Cli, settings: &Settings) -> anyhow::Result<Arc<dyn GameStore>> {
    if cli.memory {
        Ok(Arc::new(MemoryStore::new()))
    } else {
        Ok(Arc::new(SqliteStore::open(&settings.database.path)?))
    }
}

fn build_cycle(settings: &Settings, store: Arc<dyn GameStore>) -> anyhow::Result<ScrapeCycle> {
    let registry = ScraperRegistry::with_games(&settings.games);
    let sessions: Arc<dyn SessionProvider> =
        Arc::new(BrowserProvider::new(settings.browser.clone()));

    let mut scrapers = Vec::with_capacity(settings.games.len());
    for game in &settings.games {
        let scraper = registry.create(
            &game.key,
            game.clone(),
            &settings.browser,
            sessions.clone(),
            store.clone(),
        )?;
        scrapers.push(scraper);
    }
    Ok(ScrapeCycle::new(scrapers))
}

fn print_run(run: &TaskRun) {
    let status = match run.status {
        crate::models::TaskStatus::Success => style(run.status.as_str()).green(),
        _ => style(run.status.as_str()).red(),
    };
    println!(
        "{} {} ({} records, {} ok / {} failed, {} ms)",
        style("cycle").bold(),
        status,
        run.processed_items,
        run.succeeded_jobs,
        run.failed_jobs,
        run.duration_ms.unwrap_or(0),
    );
    if let Some(error) = &run.error {
        println!("  {} {}", style(&error.code).yellow(), error.message);
    }
}

async fn cmd_run(cli: &Cli, settings: &Settings) -> anyhow::Result<()> {
    if settings.games.is_empty() {
        println!("{}", style("no games configured").yellow());
        return Ok(());
    }

    let store = build_store(cli, settings)?;
    let cycle = build_cycle(settings, store)?;
    println!(
        "Collecting {} game(s)...",
        style(cycle.len().to_string()).bold()
    );

    let scheduler = TaskScheduler::new(Arc::new(cycle)).await?;
    match scheduler.run_once(COLLECTION_JOB).await {
        Some(run) => print_run(&run),
        None => println!("{}", style("a cycle is already in flight").yellow()),
    }
    Ok(())
}

async fn cmd_watch(cli: &Cli, settings: &Settings) -> anyhow::Result<()> {
    if settings.games.is_empty() {
        anyhow::bail!("no games configured in {}", cli.config.display());
    }

    let store = build_store(cli, settings)?;
    let cycle = build_cycle(settings, store)?;
    let scheduler = TaskScheduler::new(Arc::new(cycle)).await?;

    scheduler.create_job(COLLECTION_JOB, &settings.schedule).await?;
    scheduler.start().await?;
    println!(
        "Watching {} game(s) on '{}' ({}); Ctrl-C to stop",
        settings.games.len(),
        settings.schedule.cron,
        settings.schedule.timezone,
    );

    tokio::signal::ctrl_c().await?;
    println!();

    scheduler.stop_all().await;
    scheduler.shutdown().await;

    let status = scheduler.status().await;
    println!(
        "{}: {} runs, {} ok, {} failed, {} skipped, avg {:.0} ms",
        style("totals").bold(),
        status.stats.total_runs,
        status.stats.successful_runs,
        status.stats.failed_runs,
        status.stats.skipped_runs,
        status.stats.average_execution_ms,
    );
    for run in status.recent_runs.iter().rev().take(5) {
        print_run(run);
    }
    Ok(())
}

fn cmd_games(settings: &Settings) -> anyhow::Result<()> {
    if settings.games.is_empty() {
        println!("{}", style("no games configured").yellow());
        return Ok(());
    }
    for game in &settings.games {
        println!(
            "{:<20} {:<10} {:<18} {}",
            style(&game.key).bold(),
            game.game_type.as_str(),
            game.provider.as_deref().unwrap_or("-"),
            game.url,
        );
    }
    Ok(())
}

async fn cmd_records(cli: &Cli, settings: &Settings) -> anyhow::Result<()> {
    let store = build_store(cli, settings)?;
    let records = store.all().await?;
    if records.is_empty() {
        println!("{}", style("no records stored").yellow());
        return Ok(());
    }

    for record in records {
        let marker = if record.fallback_mode {
            style("[fallback]").yellow().to_string()
        } else {
            String::new()
        };
        println!(
            "{:<28} {:<10} score={} {} {}",
            style(&record.name).bold(),
            record.game_type.as_str(),
            record
                .score
                .map(|s| format!("{s:.1}"))
                .unwrap_or_else(|| "-".to_string()),
            record.scraped_at.format("%Y-%m-%d %H:%M"),
            marker,
        );
    }
    Ok(())
}
