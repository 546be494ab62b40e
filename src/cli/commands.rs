//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

use crate::cli::output::{
    InitReport, OutputFormat, StatusReport, format_change, format_init, format_lines,
    format_status,
};
use crate::cli::parser::{Cli, Commands};
use crate::core::{Filter, MAX_FIELDS, PolicyModel, parse_policy_line};
use crate::error::{CommandError, IoError, Result};
use crate::storage::{Adapter, AdapterOptions, Database, SqliteAdapter};
use std::collections::BTreeMap;
use std::path::Path;

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let options = cli.adapter_options()?;

    match &cli.command {
        Commands::Init => cmd_init(options, format),
        Commands::Status => cmd_status(options, format),
        Commands::List { filter } => cmd_list(options, filter.as_deref(), format),
        Commands::Add { ptype, values } => cmd_add(options, ptype, values, format),
        Commands::Remove { ptype, values } => cmd_remove(options, ptype, values, format),
        Commands::RemoveFiltered {
            ptype,
            field_index,
            values,
        } => cmd_remove_filtered(options, ptype, *field_index, values, format),
        Commands::Import { file } => cmd_import(options, file, format),
        Commands::Export { output } => cmd_export(options, output.as_deref(), format),
    }
}

/// Opens the adapter described by `options`.
fn open_adapter(options: AdapterOptions) -> Result<SqliteAdapter> {
    SqliteAdapter::connect(options)
}

/// Parses a policy file body into a model, rejecting malformed lines.
fn parse_policy_file(text: &str) -> Result<PolicyModel> {
    let mut model = PolicyModel::new();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (ptype, rule) = parse_policy_line(line).ok_or_else(|| {
            CommandError::InvalidPolicyLine {
                line: index + 1,
                reason: "missing policy type".to_string(),
            }
        })?;

        if rule.len() > MAX_FIELDS {
            return Err(CommandError::InvalidPolicyLine {
                line: index + 1,
                reason: format!("{} fields, at most {MAX_FIELDS} allowed", rule.len()),
            }
            .into());
        }

        model.add_rule(&ptype, rule);
    }

    Ok(model)
}

// ==================== Command Implementations ====================

fn cmd_init(options: AdapterOptions, format: OutputFormat) -> Result<String> {
    let adapter = open_adapter(options.with_auto_create_table(true))?;
    let report = InitReport {
        database: describe_database(&adapter.options().database),
        table: adapter.table_name().to_string(),
    };
    Ok(format_init(&report, format))
}

fn cmd_status(options: AdapterOptions, format: OutputFormat) -> Result<String> {
    let adapter = open_adapter(options)?;

    let mut by_ptype: BTreeMap<String, usize> = BTreeMap::new();
    for record in adapter.list_records()? {
        *by_ptype.entry(record.ptype().to_string()).or_default() += 1;
    }

    let status = StatusReport {
        database: describe_database(&adapter.options().database),
        table: adapter.table_name().to_string(),
        rule_count: adapter.count()?,
        by_ptype: by_ptype.into_iter().collect(),
    };
    Ok(format_status(&status, format))
}

fn cmd_list(
    options: AdapterOptions,
    filter: Option<&str>,
    format: OutputFormat,
) -> Result<String> {
    let mut adapter = open_adapter(options)?;
    let mut lines: Vec<String> = Vec::new();

    match filter {
        Some(json) => {
            let filter: Filter = serde_json::from_str(json).map_err(|e| {
                CommandError::InvalidArgument(format!("--filter is not a valid filter: {e}"))
            })?;
            adapter.load_filtered_policy(&mut lines, &filter)?;
        }
        None => adapter.load_policy(&mut lines)?,
    }

    lines.sort();
    Ok(format_lines(&lines, format))
}

fn cmd_add(
    options: AdapterOptions,
    ptype: &str,
    values: &[String],
    format: OutputFormat,
) -> Result<String> {
    let mut adapter = open_adapter(options)?;
    adapter.add_policy(ptype, values)?;
    Ok(format_change("Added", 1, format))
}

fn cmd_remove(
    options: AdapterOptions,
    ptype: &str,
    values: &[String],
    format: OutputFormat,
) -> Result<String> {
    let mut adapter = open_adapter(options)?;
    let removed = adapter.remove_policy(ptype, values)?;
    Ok(format_change("Removed", removed, format))
}

fn cmd_remove_filtered(
    options: AdapterOptions,
    ptype: &str,
    field_index: usize,
    values: &[String],
    format: OutputFormat,
) -> Result<String> {
    let mut adapter = open_adapter(options)?;
    let removed = adapter.remove_filtered_policy(ptype, field_index, values)?;
    Ok(format_change("Removed", removed, format))
}

fn cmd_import(options: AdapterOptions, file: &Path, format: OutputFormat) -> Result<String> {
    let text = std::fs::read_to_string(file).map_err(|e| IoError::ReadFailed {
        path: file.display().to_string(),
        reason: e.to_string(),
    })?;
    let model = parse_policy_file(&text)?;

    let mut adapter = open_adapter(options)?;
    adapter.save_policy(&model)?;
    Ok(format_change("Imported", model.len(), format))
}

fn cmd_export(
    options: AdapterOptions,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<String> {
    let adapter = open_adapter(options)?;
    let mut model = PolicyModel::new();
    adapter.load_policy(&mut model)?;

    let lines = model.to_lines();
    let mut body = String::new();
    for line in &lines {
        body.push_str(line);
        body.push('\n');
    }

    match (output, format) {
        (Some(path), _) => {
            std::fs::write(path, &body).map_err(|e| IoError::WriteFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            Ok(format_change("Exported", model.len(), format))
        }
        (None, OutputFormat::Json) => Ok(format_lines(&lines, format)),
        (None, OutputFormat::Text) => Ok(body),
    }
}

fn describe_database(database: &Database) -> String {
    match database {
        Database::Memory => ":memory:".to_string(),
        Database::File(path) => path.display().to_string(),
    }
}
