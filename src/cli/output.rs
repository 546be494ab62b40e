//! Output formatting for CLI commands.
//!
//! Supports text and JSON output formats.

use crate::error::Error;
use serde::Serialize;
use std::fmt::Write;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
}

impl OutputFormat {
    /// Parses format from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Database status as reported by the `status` command.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    /// Database location (`:memory:` for in-memory).
    pub database: String,
    /// Policy table name.
    pub table: String,
    /// Number of stored rows.
    pub rule_count: usize,
    /// Rows per policy type.
    pub by_ptype: Vec<(String, usize)>,
}

/// Formats a status response.
#[must_use]
pub fn format_status(status: &StatusReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format_status_text(status),
        OutputFormat::Json => format_json(status),
    }
}

fn format_status_text(status: &StatusReport) -> String {
    let mut output = String::new();
    output.push_str("rulestore status\n");
    output.push_str("================\n\n");
    let _ = writeln!(output, "  Database:  {}", status.database);
    let _ = writeln!(output, "  Table:     {}", status.table);
    let _ = writeln!(output, "  Rules:     {}", status.rule_count);
    for (ptype, count) in &status.by_ptype {
        let _ = writeln!(output, "    {ptype:<8} {count}");
    }
    output
}

/// Table created by the `init` command.
#[derive(Debug, Clone, Serialize)]
pub struct InitReport {
    /// Database location (`:memory:` for in-memory).
    pub database: String,
    /// Policy table name.
    pub table: String,
}

/// Formats an init response.
#[must_use]
pub fn format_init(report: &InitReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!(
            "Initialized policy table {} at: {}\n",
            report.table, report.database
        ),
        OutputFormat::Json => format_json(report),
    }
}

/// Formats policy lines.
#[must_use]
pub fn format_lines(lines: &[String], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if lines.is_empty() {
                return "No rules found.\n".to_string();
            }
            let mut output = String::new();
            for line in lines {
                let _ = writeln!(output, "{line}");
            }
            output
        }
        OutputFormat::Json => format_json(&lines),
    }
}

#[derive(Serialize)]
struct ChangeReport<'a> {
    action: &'a str,
    rows: usize,
}

/// Formats the outcome of a mutating command.
#[must_use]
pub fn format_change(action: &str, rows: usize, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let noun = if rows == 1 { "rule" } else { "rules" };
            format!("{action} {rows} {noun}.\n")
        }
        OutputFormat::Json => format_json(&ChangeReport { action, rows }),
    }
}

/// Formats an error for display.
#[must_use]
pub fn format_error(error: &Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => error.to_string(),
        OutputFormat::Json => format_json(&serde_json::json!({ "error": error.to_string() })),
    }
}

/// Formats a value as JSON.
fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::parse("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("text"), OutputFormat::Text);
        assert_eq!(OutputFormat::parse("unknown"), OutputFormat::Text);
    }

    #[test]
    fn test_format_status() {
        let status = StatusReport {
            database: "policy.db".to_string(),
            table: "casbin_rule".to_string(),
            rule_count: 3,
            by_ptype: vec![("g".to_string(), 1), ("p".to_string(), 2)],
        };

        let text = format_status(&status, OutputFormat::Text);
        assert!(text.contains("Rules:     3"));
        assert!(text.contains("Table:     casbin_rule"));

        let json = format_status(&status, OutputFormat::Json);
        assert!(json.contains("\"rule_count\": 3"));
    }

    #[test]
    fn test_format_init() {
        let report = InitReport {
            database: "policy.db".to_string(),
            table: "rules".to_string(),
        };
        assert_eq!(
            format_init(&report, OutputFormat::Text),
            "Initialized policy table rules at: policy.db\n"
        );

        let json = format_init(&report, OutputFormat::Json);
        assert!(json.contains("\"table\": \"rules\""));
        assert!(json.contains("\"database\": \"policy.db\""));
    }

    #[test]
    fn test_format_lines() {
        assert_eq!(format_lines(&[], OutputFormat::Text), "No rules found.\n");

        let lines = vec!["p, alice, data1, read".to_string()];
        assert_eq!(
            format_lines(&lines, OutputFormat::Text),
            "p, alice, data1, read\n"
        );
        assert!(format_lines(&lines, OutputFormat::Json).contains("\"p, alice, data1, read\""));
    }

    #[test]
    fn test_format_change() {
        assert_eq!(format_change("Removed", 1, OutputFormat::Text), "Removed 1 rule.\n");
        assert_eq!(format_change("Added", 2, OutputFormat::Text), "Added 2 rules.\n");
        assert!(format_change("Added", 2, OutputFormat::Json).contains("\"rows\": 2"));
    }

    #[test]
    fn test_format_error() {
        let err = Error::NotOpen;
        assert_eq!(format_error(&err, OutputFormat::Text), "adapter is not open");
        assert!(format_error(&err, OutputFormat::Json).contains("\"error\""));
    }
}
