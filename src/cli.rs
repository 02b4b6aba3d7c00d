//! Command-line surface.

use clap::{Parser, Subcommand};

/// Aggregates free space across several backends into one drive.
#[derive(Parser, Debug)]
#[command(name = "cuckoodrive", version, about)]
pub struct Cli {
    /// Increase logging verbosity; repeatable (`-v`, `-vv`).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Push a local tree onto one or more remotes, splitting large files into parts.
    Sync(SyncArgs),
}

/// Arguments for `cuckoodrive sync`.
#[derive(clap::Args, Debug)]
pub struct SyncArgs {
    /// Re-run on every source change instead of once. Not implemented.
    #[arg(long)]
    pub watch: bool,

    /// Backend URI, repeatable: `path://DIR?max_size=BYTES&max_part=BYTES` or
    /// `mem://NAME?max_size=BYTES&max_part=BYTES`.
    #[arg(long = "remotes", required = true)]
    pub remotes: Vec<String>,

    /// Local directory to sync from.
    pub src: String,

    /// Destination prefix on the composite store. Defaults to the root.
    pub dst: Option<String>,
}
