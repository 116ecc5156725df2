//! Output formatting utilities

use crate::OutputFormat;
use serde::Serialize;

/// Print `value` as pretty JSON, or via `human` otherwise
pub fn print_output<T: Serialize>(
    value: &T,
    format: OutputFormat,
    human: impl FnOnce(&T),
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Human => human(value),
    }
    Ok(())
}

/// Format image dimensions, `?` when the provider did not report them
pub fn format_dimensions(width: u32, height: u32) -> String {
    if width == 0 || height == 0 {
        "?".to_string()
    } else {
        format!("{}x{}", width, height)
    }
}
