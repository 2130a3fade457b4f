//! Command execution.

use anyhow::{Context, Result};
use serde::Serialize;
use shared_window::{MaxSize, SlidingWindow, WindowConfig, derive_key, ipc_key};
use tracing::info;

use crate::Commands;
use crate::output::{self, OutputFormat};

#[derive(Serialize)]
struct Keys {
    name: String,
    key: u64,
    ipc_key: i64,
}

#[derive(Serialize)]
struct Removed {
    removed: usize,
}

/// Parse `--max-size`, keeping floats as floats so the library can flag the
/// coercion.
fn parse_max_size(value: Option<&str>) -> Result<MaxSize> {
    let Some(value) = value else {
        return Ok(MaxSize::Default);
    };
    if let Ok(integer) = value.parse::<i64>() {
        return Ok(MaxSize::Integer(integer));
    }
    let float = value
        .parse::<f64>()
        .with_context(|| format!("--max-size '{value}' is not a number"))?;
    Ok(MaxSize::Float(float))
}

fn attach(name: &str, config: &WindowConfig) -> Result<SlidingWindow> {
    SlidingWindow::attach_with(name, config)
        .with_context(|| format!("failed to attach window '{name}' (run `init` first?)"))
}

pub fn run(command: Commands, config: &WindowConfig, format: OutputFormat) -> Result<()> {
    match command {
        Commands::Init { name, max_size } => {
            let max_size = parse_max_size(max_size.as_deref())?;
            let window = SlidingWindow::create_or_open_with(&name, max_size, config)
                .with_context(|| format!("failed to initialize window '{name}'"))?;
            let snapshot = window.snapshot()?;
            info!(window = %name, capacity = snapshot.capacity, "Window initialized");
            output::print(format, &snapshot, || {
                format!(
                    "initialized '{}' with capacity {} (key {:#018x})",
                    snapshot.name, snapshot.capacity, snapshot.key
                )
            })
        }
        Commands::Push { name, values } => {
            let window = attach(&name, config)?;
            for value in &values {
                window.push(*value)?;
            }
            let size = window.size()?;
            output::print(format, &size, || size.to_string())
        }
        Commands::Values { name } => {
            let values = attach(&name, config)?.values()?;
            output::print(format, &values, || output::format_values(&values))
        }
        Commands::Size { name } => {
            let size = attach(&name, config)?.size()?;
            output::print(format, &size, || size.to_string())
        }
        Commands::Capacity { name } => {
            let capacity = attach(&name, config)?.capacity()?;
            output::print(format, &capacity, || capacity.to_string())
        }
        Commands::Last { name } => {
            let last = attach(&name, config)?.last()?;
            output::print(format, &last, || last.to_string())
        }
        Commands::Clear { name } => {
            attach(&name, config)?.clear()?;
            output::print(format, &(), || format!("cleared '{name}'"))
        }
        Commands::Expire { name, below } => {
            let removed = attach(&name, config)?
                .reject_matching(|value| value < below)
                .with_context(|| format!("failed to expire samples below {below}"))?;
            output::print(format, &Removed { removed }, || removed.to_string())
        }
        Commands::Inspect { name } => {
            let snapshot = attach(&name, config)?.snapshot()?;
            output::print(format, &snapshot, || output::format_snapshot(&snapshot))
        }
        Commands::Key { name } => {
            let key = derive_key(&name);
            let keys = Keys {
                ipc_key: i64::from(ipc_key(key)),
                name,
                key,
            };
            output::print(format, &keys, || {
                format!("key:     {:#018x}\nipc_key: {:#010x}", keys.key, keys.ipc_key as u32)
            })
        }
    }
}
