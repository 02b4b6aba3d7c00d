#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! `cuckoodrive` CLI: wires argument parsing, backend configuration, logging
//! and the sync driver into one runnable process.
//!
//! ## Overview
//! `run` parses [`cli::Cli`], builds the composite/parted store described by
//! `--remotes`, takes the advisory lock, and drives [`cuckoo_sync::SyncDriver`]
//! from a local directory onto it.
//!
//! ## Errors
//! Every surfaced failure is a [`error::CliError`], whose [`error::CliError::exit_code`]
//! becomes the process exit code.

pub mod cli;
pub mod config;
pub mod error;
mod prefixed;

use std::io::IsTerminal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use cuckoo_backend::{Backend, LocalBackend};
use cuckoo_lock::FileLock;
use cuckoo_sync::{SyncAction, SyncDriver};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, SyncArgs};
use error::CliError;
use prefixed::PrefixedBackend;

/// Installs a `tracing-subscriber` filter driven by `-v` repeats.
pub fn init_logging(verbosity: u8) {
    let default_directive = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Parses arguments, dispatches the subcommand, and returns the process exit code.
#[must_use]
pub fn run() -> u8 {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match &cli.command {
        Command::Sync(args) => match run_sync(args) {
            Ok(()) => 0,
            Err(err) => {
                error!(%err, "sync failed");
                err.exit_code()
            }
        },
    }
}

fn run_sync(args: &SyncArgs) -> Result<(), CliError> {
    if args.watch {
        return Err(CliError::Config(config::ConfigError::WatchUnsupported));
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    install_sigint_handler(Arc::clone(&shutdown));

    let store = config::assemble(&args.remotes)?;
    let store: Arc<dyn Backend + Send + Sync> = Arc::new(store);
    let dest: Arc<dyn Backend + Send + Sync> = match &args.dst {
        Some(prefix) => Arc::new(PrefixedBackend::new(store, prefix)),
        None => store,
    };

    let lock = FileLock::new(Arc::clone(&dest));
    let guard = lock.acquire()?;

    let source = LocalBackend::new("source", args.src.clone())?;
    let events = SyncDriver::new(&source, dest.as_ref()).run()?;

    let use_color = std::io::stdout().is_terminal();
    for event in &events {
        print_event(event, use_color);
    }

    guard.release()?;

    if shutdown.load(Ordering::SeqCst) {
        info!("interrupted after completing in-flight work");
    }
    Ok(())
}

fn print_event(event: &cuckoo_sync::SyncEvent, use_color: bool) {
    let label = match event.action {
        SyncAction::Copied => "copied",
        SyncAction::Updated => "updated",
        SyncAction::Skipped => "skipped",
        SyncAction::Conflict => "conflict",
    };
    let line = format!("{label} {}", event.path);
    if !use_color {
        println!("{line}");
        return;
    }
    let colored = match event.action {
        SyncAction::Copied => line.green(),
        SyncAction::Updated => line.yellow(),
        SyncAction::Conflict => line.red(),
        SyncAction::Skipped => line.normal(),
    };
    println!("{colored}");
}

fn install_sigint_handler(shutdown: Arc<AtomicBool>) {
    let result = ctrlc::set_handler(move || {
        shutdown.store(true, Ordering::SeqCst);
        eprintln!("{}", "received interrupt, finishing current file".cyan());
    });
    if let Err(err) = result {
        tracing::warn!(%err, "could not install SIGINT handler");
    }
}
