//! Slave binary: disciplines a local software clock toward a Master's
//! reference timeline by driving periodic sync cycles over UDP.

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use udpclocksync::config::SyncConfig;
use udpclocksync::slave::clock::SoftwareClock;
use udpclocksync::slave::controller::SyncController;
use udpclocksync::slave::monitor::{SyncEvent, SyncObserver};
use udpclocksync::slave::requester::Requester;
use udpclocksync::status::SyncStatus;

#[derive(Parser, Debug)]
#[command(author, version, about = "UDP clock sync slave", long_about = None)]
struct Args {
    /// Path to a JSON config file. Falls back to built-in defaults when absent.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides `master_ip` from the config file.
    #[arg(short, long)]
    master: Option<String>,

    /// Overrides `sync_port` from the config file.
    #[arg(short, long)]
    port: Option<u16>,
}

/// Forwards every monitor event to the `log` facade. An external front-end
/// (chart, dashboard) would subscribe a different observer here.
struct LoggingObserver;

impl SyncObserver for LoggingObserver {
    fn notify(&self, event: &SyncEvent) {
        match event {
            SyncEvent::Sample { offset, delay, .. } => {
                info!("sample: offset={:+.6}s delay={:.6}s", offset, delay)
            }
            SyncEvent::StateChange { old, new } => info!("state: {:?} -> {:?}", old, new),
            SyncEvent::Error { kind, detail } => warn!("{}: {}", kind, detail),
        }
    }
}

fn main() -> Result<()> {
    env_logger::builder()
        .format_timestamp_millis()
        .format_target(false)
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SyncConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SyncConfig::default(),
    };
    if let Some(master) = args.master {
        config.master_ip = master;
    }
    if let Some(port) = args.port {
        config.sync_port = port;
    }
    config.validate().context("invalid configuration")?;

    info!("udpclocksync slave v{}", env!("CARGO_PKG_VERSION"));
    info!("master target: {}:{}", config.master_ip, config.sync_port);

    let clock = Arc::new(SoftwareClock::new(config.max_rate_adjustment));
    let timeout = Duration::from_secs_f64(config.sync_timeout);
    let master_addr = format!("{}:{}", config.master_ip, config.sync_port);
    let requester = Requester::connect(&master_addr, clock.clone(), timeout)
        .with_context(|| format!("connecting to master at {}", master_addr))?;

    let status = Arc::new(RwLock::new(SyncStatus::default()));
    let mut controller = SyncController::new(requester, clock, config, status);
    controller.subscribe(Box::new(LoggingObserver));

    let stop = controller.stop_flag();
    ctrlc::set_handler(move || {
        info!("ctrl-c received, shutting down");
        stop.store(true, Ordering::SeqCst);
    })
    .map_err(|e| {
        error!("failed to install signal handler: {}", e);
        e
    })?;

    controller.run();
    info!("slave stopped");
    Ok(())
}
