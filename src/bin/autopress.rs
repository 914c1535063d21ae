//! CLI binary for autopress.

use anyhow::{Context, bail};
use autopress::config::{self, AppConfig};
use autopress::content::AnthropicGenerator;
use autopress::counter::PostCounter;
use autopress::credentials::CredentialStore;
use autopress::daemon::Daemon;
use autopress::pipeline::{CycleOutcome, PipelineSettings, PublishPipeline};
use autopress::publish::TistoryClient;
use autopress::queue::WorkQueue;
use autopress::schedule::{PostingWindow, ScheduleStore};
use autopress::session::{SessionRefresher, WebDriverRefresher};
use autopress::{app_dirs, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Autopress: unattended daily blog publishing daemon.
#[derive(Parser)]
#[command(name = "autopress", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Run the scheduling daemon (the default).
    Run,

    /// Execute exactly one publish cycle immediately, then exit.
    PostNow,

    /// Show queue, counter, and schedule state.
    Status,

    /// Mint fresh session cookies through the browser login flow.
    RefreshSession {
        /// Show the browser window and allow time for manual verification.
        #[arg(long)]
        interactive: bool,
    },

    /// Reset every queue item back to pending.
    Reset {
        /// Confirm the reset.
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Run);

    // Daemon runs get a rotated file log next to the state stores; one-shot
    // commands log to the terminal only.
    let _guard = init_tracing(matches!(command, Command::Run));

    let config_path = cli.config.unwrap_or_else(app_dirs::config_file);

    match command {
        Command::Run => run_daemon(config_path).await,
        Command::PostNow => post_now(config_path).await,
        Command::Status => status(),
        Command::RefreshSession { interactive } => refresh_session(config_path, interactive).await,
        Command::Reset { yes } => reset(yes),
    }
}

fn init_tracing(daemon_mode: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("autopress=info"));

    if daemon_mode {
        let logs_dir = app_dirs::logs_dir();
        let _ = std::fs::create_dir_all(&logs_dir);
        let appender = tracing_appender::rolling::daily(logs_dir, "autopress.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::io::stdout.and(non_blocking))
            .init();
        Some(guard)
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        None
    }
}

async fn run_daemon(config_path: PathBuf) -> anyhow::Result<()> {
    let config = load_and_validate(&config_path)?;

    if !config.schedule.enabled {
        info!("scheduling disabled in config; running a single cycle");
        return run_single_cycle(&config, config_path).await;
    }

    let window = PostingWindow::from_config(&config.schedule)?;
    let store = ScheduleStore::load(app_dirs::schedule_file())?;
    let pipeline = build_pipeline(&config, Some(config_path))?;

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, shutting down...");
            cancel_clone.cancel();
        }
    });

    println!("autopress v{}", env!("CARGO_PKG_VERSION"));
    Daemon::new(pipeline, window, store, cancel).run().await?;
    Ok(())
}

async fn post_now(config_path: PathBuf) -> anyhow::Result<()> {
    let config = load_and_validate(&config_path)?;
    run_single_cycle(&config, config_path).await
}

async fn run_single_cycle(config: &AppConfig, config_path: PathBuf) -> anyhow::Result<()> {
    let mut pipeline = build_pipeline(config, Some(config_path))?;
    match pipeline.run_cycle().await? {
        CycleOutcome::Published { item_id, ordinal, url } => {
            println!(
                "Published #{ordinal} ({item_id}){}",
                url.map(|u| format!(": {u}")).unwrap_or_default()
            );
        }
        CycleOutcome::NothingPending => {
            println!("Queue exhausted; nothing to publish.");
        }
    }
    Ok(())
}

fn status() -> anyhow::Result<()> {
    let queue = WorkQueue::load(app_dirs::queue_file())?;
    let counter = PostCounter::load(app_dirs::counter_file())?;
    let schedule = ScheduleStore::load(app_dirs::schedule_file())?;

    let total = queue.items().len();
    let pending = queue.pending_count();
    println!("Queue:   {}/{} published", total - pending, total);
    match queue.next_pending() {
        Some(item) => println!("Next:    [{}] {}", item.rank, item.paper.title),
        None => println!("Next:    (exhausted)"),
    }
    println!("Counter: next post ordinal {}", counter.peek_next());
    match schedule.next_trigger_at() {
        Some(t) => println!("Trigger: {t}"),
        None => println!("Trigger: not yet computed"),
    }
    Ok(())
}

async fn refresh_session(config_path: PathBuf, interactive: bool) -> anyhow::Result<()> {
    let config = AppConfig::from_file(&config_path)?;
    if !config.refresh.has_credentials() {
        bail!("refresh.identity and refresh.secret must be set in {}", config_path.display());
    }

    let refresher =
        WebDriverRefresher::new(config.refresh.webdriver_url.as_str(), config.refresh.headless);
    let material = refresher
        .refresh(&config.refresh.identity, &config.refresh.secret, interactive)
        .await?;

    let mut store = CredentialStore::open(
        app_dirs::session_file(),
        &config.site.cookies,
        config.refresh.max_cookie_age_days,
    )?;
    store.replace(material.clone())?;
    config::write_back_cookie(&config_path, &material.cookie_header)
        .with_context(|| format!("writing cookie back to {}", config_path.display()))?;

    println!("Session refreshed; cookie written back to {}", config_path.display());
    Ok(())
}

fn reset(yes: bool) -> anyhow::Result<()> {
    if !yes {
        bail!("re-run with --yes to reset every queue item back to pending");
    }
    let mut queue = WorkQueue::load(app_dirs::queue_file())?;
    queue.reset_all()?;
    println!("Reset {} items to pending.", queue.items().len());
    Ok(())
}

fn load_and_validate(config_path: &Path) -> Result<AppConfig> {
    let config = AppConfig::from_file(config_path)?;
    config.validate()?;
    Ok(config)
}

fn build_pipeline(config: &AppConfig, config_path: Option<PathBuf>) -> Result<PublishPipeline> {
    let credentials = CredentialStore::open(
        app_dirs::session_file(),
        &config.site.cookies,
        config.refresh.max_cookie_age_days,
    )?;
    let queue = WorkQueue::load(app_dirs::queue_file())?;
    let counter = PostCounter::load(app_dirs::counter_file())?;
    let client = TistoryClient::new(&config.site.blog_name, config.site.blog_id.as_deref())?;
    let refresher = Arc::new(WebDriverRefresher::new(
        config.refresh.webdriver_url.as_str(),
        config.refresh.headless,
    ));
    let generator = Arc::new(AnthropicGenerator::new(&config.generator)?);
    let settings = PipelineSettings::from_config(config, config_path);

    Ok(PublishPipeline::new(
        credentials,
        queue,
        counter,
        client,
        refresher,
        generator,
        settings,
    ))
}
