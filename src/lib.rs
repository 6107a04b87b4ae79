// src/lib.rs

pub mod cancel;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod metrics;
pub mod sched;
pub mod time;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::info;

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::engine::{ManagerCore, ManagerHandle, Runtime, RuntimeEvent, RuntimeOptions};
use crate::exec::ProcessBackend;
use crate::watch::WatchProfile;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the manager core (queue / debounce / batching / metrics)
/// - the process execution backend
/// - (optional) file watcher
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    let handle = ManagerHandle::new(rt_tx.clone());

    // One-shot mode: run a single file, no watcher, exit when drained.
    let once = args.exec.is_some();

    // Optional file watcher (disabled in --exec mode).
    let _watcher_handle = if !once {
        let profile = WatchProfile::from_config(cfg.watch())?;
        let root_dir = config_root_dir(&config_path);
        Some(watch::spawn_watcher(
            root_dir,
            profile,
            rt_tx.clone(),
            cfg.watch().skip_unchanged,
        )?)
    } else {
        None
    };

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    // CLI overrides and the one-shot seed are delivered as ordinary events,
    // buffered until the runtime loop starts consuming.
    if let Some(strategy) = args.strategy {
        handle.set_strategy(strategy.into()).await?;
    }

    if let Some(file) = &args.exec {
        info!(file = %file, "seeding one-shot execution");
        handle.execute_now(file.clone(), None).await?;
    }

    let options = RuntimeOptions {
        exit_when_idle: once,
    };

    // Construct the pure core (single source of truth for semantics) and the
    // async IO shell around it.
    let core = ManagerCore::new(&cfg, time::system_clock(), options);
    let backend = ProcessBackend::new();
    let runtime = Runtime::new(
        core,
        rt_rx,
        rt_tx,
        backend,
        cfg.config().execution_timeout_ms,
    );

    runtime.run().await.map_err(Into::into)
}

/// Figure out a sensible project root for watching.
///
/// - If the config path has a non-empty parent (e.g. "configs/Watchrun.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Watchrun.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Simple dry-run output: print the effective settings.
fn print_dry_run(cfg: &ConfigFile) {
    println!("watchrun dry-run");
    println!("  config.strategy = {:?}", cfg.config().strategy);
    println!("  config.debounce_ms = {}", cfg.config().debounce_ms);
    println!("  config.max_queue_size = {}", cfg.config().max_queue_size);
    println!(
        "  config.execution_timeout_ms = {}",
        cfg.config().execution_timeout_ms
    );
    println!("  batch.window_ms = {}", cfg.batch().window_ms);
    println!(
        "  batch.dependency_resolution = {}",
        cfg.batch().dependency_resolution
    );
    println!();

    println!("watch:");
    if cfg.watch().include.is_empty() {
        println!("  include: (everything not excluded)");
    } else {
        println!("  include: {:?}", cfg.watch().include);
    }
    println!("  exclude: {:?}", cfg.watch().exclude);
    println!("  skip_unchanged: {}", cfg.watch().skip_unchanged);
    println!(
        "  source_extensions: {:?}",
        cfg.watch().source_extensions
    );
}
