//! Master binary: publishes a reference timeline over UDP and replies to
//! Slave request packets, stamping T2/T3 as close to the wire as possible.

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use udpclocksync::config::SyncConfig;
use udpclocksync::master::responder::MasterResponder;
use udpclocksync::master::time_source::MasterTimeSource;

#[derive(Parser, Debug)]
#[command(author, version, about = "UDP clock sync master", long_about = None)]
struct Args {
    /// Path to a JSON config file. Falls back to built-in defaults when absent.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides `sync_port` from the config file.
    #[arg(short, long)]
    port: Option<u16>,

    /// Seeds the reference timeline at this local wall-clock time
    /// (`YYYY-MM-DD HH:MM:SS`) instead of the process start time.
    #[arg(long)]
    reference_time: Option<String>,
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
    if let Some(port) = args.port {
        config.sync_port = port;
    }
    config.validate().context("invalid configuration")?;

    info!("udpclocksync master v{}", env!("CARGO_PKG_VERSION"));

    let time_source = Arc::new(MasterTimeSource::new());
    if let Some(ref_time) = &args.reference_time {
        if !time_source.set_reference_time(ref_time) {
            error!("--reference-time {:?} is not a valid YYYY-MM-DD HH:MM:SS timestamp", ref_time);
            std::process::exit(1);
        }
        info!("reference time set to {}", ref_time);
    }

    let bind_addr = format!("0.0.0.0:{}", config.sync_port);
    let responder = MasterResponder::bind(&bind_addr, time_source)
        .with_context(|| format!("binding UDP socket on {}", bind_addr))?;
    info!("listening on {}", responder.local_addr()?);

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = stop.clone();
    ctrlc::set_handler(move || {
        info!("ctrl-c received, shutting down");
        stop_handler.store(true, Ordering::SeqCst);
    })?;

    responder.run(stop);
    info!("master stopped");
    Ok(())
}
