//! Output formatting helpers shared by the commands

use crate::OutputFormat;
use serde::Serialize;

/// Render `value` as JSON in the requested flavor
pub fn to_json<T: Serialize>(value: &T, format: OutputFormat) -> serde_json::Result<String> {
    if matches!(format, OutputFormat::JsonPretty) {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
}

/// Print `value` as JSON on stdout
pub fn print_json<T: Serialize>(value: &T, format: OutputFormat) -> serde_json::Result<()> {
    println!("{}", to_json(value, format)?);
    Ok(())
}

/// Print a section header followed by an underline
pub fn print_section_header(text: &str) {
    println!("{text}");
    println!("{}", "=".repeat(text.chars().count()));
}

/// Format an aligned key-value line
pub fn format_key_value(key: &str, value: impl std::fmt::Display) -> String {
    format!("{:<20} {}", format!("{key}:"), value)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_json_flavors() {
        let value = BTreeMap::from([("a", 1)]);
        assert_eq!(to_json(&value, OutputFormat::Json).unwrap(), r#"{"a":1}"#);
        assert_eq!(
            to_json(&value, OutputFormat::JsonPretty).unwrap(),
            "{\n  \"a\": 1\n}"
        );
    }

    #[test]
    fn test_key_value_alignment() {
        assert_eq!(format_key_value("Entries", 3), format!("{:<20} 3", "Entries:"));
    }
}
