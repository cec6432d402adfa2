//! gpv-watch CLI
//!
//! Local execution entry point: one-shot fetches, the periodic watcher and
//! the HTTP query surface.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use gpv_watch::{
    error::Result,
    models::{Config, ScheduleData},
    pipeline::{self, CycleStatus, SchedulePipeline},
    services::{self, Notification, ScheduleParser},
    storage::{LocalStorage, SnapshotStore},
};

/// gpv-watch - Outage Schedule Watcher
#[derive(Parser, Debug)]
#[command(
    name = "gpv-watch",
    version,
    about = "Watches the outage schedule page and notifies on changes"
)]
struct Cli {
    /// Path to storage directory containing config.toml and snapshots
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single fetch, parse and compare cycle
    Fetch {
        /// Print the resulting schedule as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse a saved schedule page
    Parse {
        /// Path to an HTML file
        path: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Refresh periodically; press Enter to refresh immediately
    Watch,

    /// Serve the schedule over HTTP while watching in the background
    #[cfg(feature = "serve")]
    Serve,

    /// Show the stored snapshot
    Info,

    /// Validate configuration
    Validate,

    /// Print the placeholder schedule
    Fallback {
        #[arg(long, default_value = "manual")]
        reason: String,
    },

    /// Send a test notification through the configured backend
    TestNotify,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Print one row per subqueue, one symbol per half hour.
fn print_grid(data: &ScheduleData) {
    println!("{}", data.date);
    for slot in &data.time_slots {
        println!("  з {} по {}: {} черг", slot.start, slot.end, slot.queues);
    }
    for row in &data.queue_schedules {
        let cells: String = (0..row.hours.len())
            .map(|i| row.status_at(i).symbol())
            .collect();
        println!("{:>6} {}", row.label(), cells);
    }
}

fn build_pipeline(config: &Config) -> Result<Arc<SchedulePipeline>> {
    let store = Arc::new(LocalStorage::from_config(&config.storage));
    let notifier = services::create_notifier(&config.notifier)?;
    Ok(Arc::new(SchedulePipeline::from_config(
        config, store, notifier,
    )?))
}

/// Forward each line typed on stdin as a refresh request.
fn spawn_stdin_trigger(trigger: pipeline::RefreshTrigger) {
    // Plain thread: a pending stdin read must not block runtime shutdown.
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            if line.is_err() || trigger.blocking_send(()).is_err() {
                break;
            }
        }
    });
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.storage_dir.join("config.toml");
    let loaded = Config::load(&config_path);
    let mut config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => Config::default(),
    };
    init_logging(cli.verbose, &config.logging.level);

    match loaded {
        Ok(_) => log::info!("Loaded configuration from {}", config_path.display()),
        Err(e) => log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            config_path.display(),
            e
        ),
    }
    config.storage.dir = cli.storage_dir.clone();

    match cli.command {
        Command::Fetch { json } => {
            let pipeline = build_pipeline(&config)?;
            let outcome = pipeline.run_cycle().await;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&outcome.data.without_raw_html())?
                );
            } else {
                match &outcome.status {
                    CycleStatus::Baseline => log::info!("First snapshot recorded"),
                    CycleStatus::Unchanged => log::info!("Schedule unchanged"),
                    CycleStatus::Changed { diff } => {
                        log::info!("Schedule changed: {}", diff.affected_labels().join(", "))
                    }
                    CycleStatus::Fallback { reason } => {
                        log::warn!("Upstream unavailable, showing placeholder: {}", reason)
                    }
                }
                print_grid(&outcome.data);
            }
        }

        Command::Parse { path, json } => {
            let html = std::fs::read_to_string(&path)?;
            let data = ScheduleParser::new(&config.parser)?.parse(&html)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&data.without_raw_html())?);
            } else {
                print_grid(&data);
                for problem in data.diagnostics() {
                    log::warn!("{}", problem);
                }
            }
        }

        Command::Watch => {
            let pipeline = build_pipeline(&config)?;
            let (trigger, triggers) = pipeline::refresh_channel();
            spawn_stdin_trigger(trigger);

            log::info!("Press Enter to refresh now, Ctrl-C to stop");
            let cycles =
                pipeline::run_watcher(pipeline, config.watch.interval(), triggers, ctrl_c()).await;
            log::info!("Ran {} cycles", cycles);
        }

        #[cfg(feature = "serve")]
        Command::Serve => {
            use gpv_watch::server::{self, AppState};

            let pipeline = build_pipeline(&config)?;
            let (_trigger, triggers) = pipeline::refresh_channel();
            let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

            let watcher = tokio::spawn(pipeline::run_watcher(
                Arc::clone(&pipeline),
                config.watch.interval(),
                triggers,
                async move {
                    let _ = stop_rx.await;
                },
            ));

            let state = AppState {
                pipeline,
                refresh_on_request: config.server.refresh_on_request,
            };
            let served = server::serve(&config.server, state, ctrl_c()).await;

            let _ = stop_tx.send(());
            if let Err(e) = watcher.await {
                log::error!("Watcher task failed: {}", e);
            }
            served?;
        }

        Command::Info => {
            log::info!("Storage directory: {}", config.storage.dir.display());

            let storage = LocalStorage::from_config(&config.storage);
            match storage.load().await? {
                Some(snapshot) => {
                    log::info!("Last updated: {}", snapshot.updated_at.to_rfc3339());
                    log::info!("Schedule date: {}", snapshot.data.date);
                    log::info!("Fingerprint: {}", snapshot.data.fingerprint());
                    log::info!("Rows: {}", snapshot.data.queue_schedules.len());
                    for problem in snapshot.data.diagnostics() {
                        log::warn!("{}", problem);
                    }
                }
                None => log::info!("No snapshot found yet."),
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            ScheduleParser::new(&config.parser)?;
            services::create_notifier(&config.notifier)?;

            log::info!("All validations passed!");
        }

        Command::Fallback { reason } => {
            let data = services::fallback(&reason);
            println!("{}", serde_json::to_string_pretty(&data)?);
        }

        Command::TestNotify => {
            let notifier = services::create_notifier(&config.notifier)?;
            notifier.notify(&Notification::test(&config.notifier)).await?;
            log::info!("Test notification sent");
        }
    }

    Ok(())
}
