//! Output formatting for command results.

use serde::Serialize;
use shared_window::WindowSnapshot;

/// How results are written to stdout.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text, one result per line
    Text,
    /// JSON document
    Json,
}

/// Print a serializable value as JSON, or its text form.
pub fn print<T: Serialize>(
    format: OutputFormat,
    value: &T,
    text: impl FnOnce() -> String,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(value)?),
        OutputFormat::Text => println!("{}", text()),
    }
    Ok(())
}

/// Samples separated by spaces; an empty window prints an empty line.
pub fn format_values(values: &[i32]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Multi-line text form of a snapshot.
pub fn format_snapshot(snapshot: &WindowSnapshot) -> String {
    format!(
        "name:     {}\nkey:      {:#018x}\ncapacity: {}\nlength:   {}\nstart:    {}\nend:      {}\nvalues:   {}",
        snapshot.name,
        snapshot.key,
        snapshot.capacity,
        snapshot.length,
        snapshot.start,
        snapshot.end,
        format_values(&snapshot.values)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_values() {
        assert_eq!(format_values(&[1, -2, 3]), "1 -2 3");
        assert_eq!(format_values(&[]), "");
    }

    #[test]
    fn test_format_snapshot() {
        let snapshot = WindowSnapshot {
            name: "errors".to_string(),
            key: 0xab,
            capacity: 4,
            length: 2,
            start: 0,
            end: 2,
            values: vec![7, 8],
        };
        let text = format_snapshot(&snapshot);
        assert!(text.contains("name:     errors"));
        assert!(text.contains("key:      0x00000000000000ab"));
        assert!(text.ends_with("values:   7 8"));
    }
}
