// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::ExecutionStrategy;

/// Command-line arguments for `watchrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "watchrun",
    version,
    about = "Watch a project tree and adaptively schedule file executions.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Watchrun.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Watchrun.toml")]
    pub config: String,

    /// Execute a single file immediately and exit once the queue drains.
    ///
    /// No watcher is started in this mode.
    #[arg(long, value_name = "FILE")]
    pub exec: Option<String>,

    /// Override the configured scheduling strategy
    /// (debounced, batched, immediate).
    #[arg(long, value_name = "STRATEGY")]
    pub strategy: Option<CliStrategy>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WATCHRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate the config, print the effective settings, but don't
    /// watch or execute anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Scheduling strategy as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum CliStrategy {
    Debounced,
    Batched,
    Immediate,
}

impl From<CliStrategy> for ExecutionStrategy {
    fn from(s: CliStrategy) -> Self {
        match s {
            CliStrategy::Debounced => ExecutionStrategy::Debounced,
            CliStrategy::Batched => ExecutionStrategy::Batched,
            CliStrategy::Immediate => ExecutionStrategy::Immediate,
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
