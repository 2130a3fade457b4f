//! Operator tool for shared sliding windows.
//!
//! Every invocation is its own process, so running two commands against the
//! same name exercises the cross-process path end to end. Only `init` resets
//! a window; all other commands attach to an existing one.

#![cfg_attr(test, allow(clippy::unwrap_used))]

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use shared_window::WindowConfig;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "shared-window",
    about = "Inspect and drive sliding windows shared between processes",
    version
)]
struct Cli {
    /// Set the logging level (overridden by RUST_LOG)
    #[arg(short, long, value_enum, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Output format
    #[arg(short = 'o', long, value_enum, global = true, default_value = "text")]
    format: OutputFormat,

    /// SysV permission bits for created resources, in octal
    #[arg(
        long,
        global = true,
        env = "SHARED_WINDOW_PERMISSIONS",
        default_value = "664",
        value_parser = parse_octal
    )]
    permissions: u32,

    /// Capacity used by `init` when --max-size is not given
    #[arg(
        long,
        global = true,
        env = "SHARED_WINDOW_DEFAULT_CAPACITY",
        default_value_t = shared_window::CAP_MAX
    )]
    default_capacity: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create a window, or reset an existing one
    Init {
        /// Window name
        name: String,
        /// Maximum number of samples (a float is truncated with a warning)
        #[arg(long, allow_hyphen_values = true)]
        max_size: Option<String>,
    },

    /// Append samples, evicting the oldest when full
    Push {
        /// Window name
        name: String,
        /// Samples to append, in order
        #[arg(required = true, allow_hyphen_values = true)]
        values: Vec<i32>,
    },

    /// Print the samples, oldest first
    Values {
        /// Window name
        name: String,
    },

    /// Print the number of samples
    Size {
        /// Window name
        name: String,
    },

    /// Print the maximum number of samples
    Capacity {
        /// Window name
        name: String,
    },

    /// Print the most recent sample
    Last {
        /// Window name
        name: String,
    },

    /// Drop all samples, keeping the capacity
    Clear {
        /// Window name
        name: String,
    },

    /// Remove the oldest samples below a threshold
    Expire {
        /// Window name
        name: String,
        /// Samples strictly below this value are removed
        #[arg(long, allow_hyphen_values = true)]
        below: i32,
    },

    /// Print counters and samples read in one critical section
    Inspect {
        /// Window name
        name: String,
    },

    /// Print the resource keys derived from a name
    Key {
        /// Window name
        name: String,
    },
}

fn parse_octal(value: &str) -> Result<u32, String> {
    let digits = value.trim_start_matches("0o");
    let mode = u32::from_str_radix(digits, 8)
        .map_err(|e| format!("'{value}' is not an octal mode: {e}"))?;
    if mode > 0o777 {
        return Err(format!("'{value}' has bits outside 0o777"));
    }
    Ok(mode)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so that stdout stays parseable.
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(cli.log_level.into()).into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = WindowConfig::new()
        .with_permissions(cli.permissions)
        .with_default_capacity(cli.default_capacity);
    tracing::debug!(?config, "Configuration loaded");

    commands::run(cli.command, &config, cli.format)
}
