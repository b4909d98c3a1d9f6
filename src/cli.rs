use std::fs;
use std::sync::Arc;

use tracing::info;

use crate::config::AppConfig;
use crate::data::loader::load_sources;
use crate::data::validate::{validate_table, ValidationSeverity};
use crate::search::export::ExportError;
use crate::search::query::{SearchQuery, SearchRequest};
use crate::search::{Availability, SearchEngine, SearchResponse};
use crate::server;

const USAGE: &str = "usage: capexempt <serve|search|results|export|facets|validate> [options]

filters (search, results, export):
  --name <text>          employer name substring
  --state <ST>           repeatable
  --city <City, ST>      repeatable
  --category <label>     repeatable, e.g. \"Government Agencies\"
  --min-score <0..1>     minimum cap-exempt score (default 0.6)
  --min-approval <0..1>  minimum approval rate (default 0.7)
  --include-all          keep employers not flagged likely cap-exempt
  --year <All|2024|2025>
  --table                tab-separated output instead of JSON

  capexempt export <path> [filters]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Serve,
    Search,
    Results,
    Export,
    Facets,
    Validate,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("serve") => Some(Command::Serve),
        Some("search") => Some(Command::Search),
        Some("results") => Some(Command::Results),
        Some("export") => Some(Command::Export),
        Some("facets") => Some(Command::Facets),
        Some("validate") => Some(Command::Validate),
        _ => None,
    }
}

/// Filter flags plus whatever positional arguments followed the command.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub request: SearchRequest,
    pub as_table: bool,
    pub positional: Vec<String>,
}

pub fn parse_query_options(args: &[String]) -> Result<QueryOptions, String> {
    let mut options = QueryOptions {
        request: SearchRequest::default(),
        as_table: false,
        positional: Vec::new(),
    };
    let mut iter = args.iter().skip(2);
    while let Some(arg) = iter.next() {
        let flag = arg.as_str();
        let mut value = || {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{flag} requires a value"))
        };
        match flag {
            "--name" => options.request.name = value()?,
            "--state" => options.request.states.push(value()?),
            "--city" => options.request.cities.push(value()?),
            "--category" => options.request.categories.push(value()?),
            "--year" => options.request.year = value()?,
            "--min-score" => options.request.min_cap_exempt_score = parse_unit(flag, &value()?)?,
            "--min-approval" => options.request.min_approval_rate = parse_unit(flag, &value()?)?,
            "--include-all" => options.request.cap_exempt_only = false,
            "--table" => options.as_table = true,
            other if other.starts_with("--") => return Err(format!("unknown option '{other}'")),
            positional => options.positional.push(positional.to_string()),
        }
    }
    Ok(options)
}

fn parse_unit(flag: &str, raw: &str) -> Result<f64, String> {
    raw.parse::<f64>()
        .map_err(|_| format!("invalid {flag} '{raw}': expected a number"))
}

pub fn run_with_args(args: &[String]) -> i32 {
    match parse_command(args) {
        Some(Command::Serve) => handle_serve(),
        Some(Command::Search) => handle_query(args, Command::Search),
        Some(Command::Results) => handle_query(args, Command::Results),
        Some(Command::Export) => handle_export(args),
        Some(Command::Facets) => handle_facets(),
        Some(Command::Validate) => handle_validate(),
        None => {
            eprintln!("{USAGE}");
            2
        }
    }
}

fn load_config() -> Result<AppConfig, i32> {
    AppConfig::load().map_err(|err| {
        eprintln!("config error: {err}");
        1
    })
}

fn load_engine(config: &AppConfig) -> SearchEngine {
    SearchEngine::from_load(load_sources(config))
}

/// Usage errors exit 2 before any data is loaded.
fn query_from_args(args: &[String]) -> Result<(SearchQuery, QueryOptions), i32> {
    let options = parse_query_options(args).map_err(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        2
    })?;
    let query = options.request.clone().into_query().map_err(|errors| {
        for err in errors {
            eprintln!("invalid {}: {err}", err.field());
        }
        2
    })?;
    Ok((query, options))
}

fn handle_serve() -> i32 {
    let config = match load_config() {
        Ok(config) => config,
        Err(code) => return code,
    };
    let engine = load_engine(&config);
    if let Some(reason) = engine.unavailable_reason() {
        eprintln!("warning: serving without data: {reason}");
    }
    match server::run_server(&config.bind_addr, Arc::new(engine)) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("server error: {err}");
            1
        }
    }
}

fn handle_query(args: &[String], command: Command) -> i32 {
    let (query, options) = match query_from_args(args) {
        Ok(parsed) => parsed,
        Err(code) => return code,
    };
    if !options.positional.is_empty() {
        eprintln!("unexpected argument '{}'", options.positional[0]);
        return 2;
    }
    let config = match load_config() {
        Ok(config) => config,
        Err(code) => return code,
    };
    let engine = load_engine(&config);
    let response = match command {
        Command::Results => engine.full_results(&query),
        _ => engine.search(&query),
    };
    if response.availability == Availability::NoData {
        eprintln!("{}", response.summary_text);
        return 1;
    }

    if options.as_table {
        print!("{}", render_table(&response));
        return 0;
    }
    match serde_json::to_string_pretty(&response) {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            eprintln!("failed to serialize search result: {err}");
            1
        }
    }
}

fn render_table(response: &SearchResponse) -> String {
    let mut out = response.table.columns.join("\t");
    out.push('\n');
    for row in &response.table.rows {
        let fields: Vec<String> = row.iter().map(|cell| cell.to_field()).collect();
        out.push_str(&fields.join("\t"));
        out.push('\n');
    }
    out
}

fn handle_export(args: &[String]) -> i32 {
    let (query, options) = match query_from_args(args) {
        Ok(parsed) => parsed,
        Err(code) => return code,
    };
    let [path] = options.positional.as_slice() else {
        eprintln!("usage: capexempt export <path> [filters]");
        return 2;
    };
    let config = match load_config() {
        Ok(config) => config,
        Err(code) => return code,
    };
    let engine = load_engine(&config);

    let bytes = match engine.export(&query) {
        Ok(bytes) => bytes,
        Err(ExportError::NoData(reason)) => {
            eprintln!("export failed: no data available ({reason})");
            return 1;
        }
        Err(err) => {
            eprintln!("export failed: {err}");
            return 1;
        }
    };
    match fs::write(path, &bytes) {
        Ok(()) => {
            info!(path = %path, bytes = bytes.len(), "export written");
            println!("export complete: path='{path}'");
            0
        }
        Err(err) => {
            eprintln!("failed to write '{path}': {err}");
            1
        }
    }
}

fn handle_facets() -> i32 {
    let config = match load_config() {
        Ok(config) => config,
        Err(code) => return code,
    };
    let engine = load_engine(&config);
    if let Some(reason) = engine.unavailable_reason() {
        eprintln!("no data available: {reason}");
        return 1;
    }
    match serde_json::to_string_pretty(&engine.facets()) {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            eprintln!("failed to serialize facets: {err}");
            1
        }
    }
}

fn handle_validate() -> i32 {
    let config = match load_config() {
        Ok(config) => config,
        Err(code) => return code,
    };
    let table = match load_sources(&config) {
        Ok(table) => table,
        Err(err) => {
            eprintln!("validation failed: {err}");
            return 1;
        }
    };

    let report = validate_table(&table);
    for diag in &report.diagnostics {
        println!("[{}] {}: {}", diag.severity, diag.context, diag.message);
    }
    let errors = report.count(ValidationSeverity::Error);
    if errors > 0 {
        eprintln!("validation failed: {errors} error(s)");
        1
    } else {
        println!(
            "validation passed: {} records, {} warning(s)",
            table.len(),
            report.count(ValidationSeverity::Warning)
        );
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn repeatable_flags_accumulate() {
        let options = parse_query_options(&args(&[
            "capexempt", "search", "--state", "CA", "--state", "MA", "--category",
            "Government Agencies", "--include-all", "--table",
        ]))
        .expect("valid flags");
        assert_eq!(options.request.states, vec!["CA", "MA"]);
        assert_eq!(options.request.categories, vec!["Government Agencies"]);
        assert!(!options.request.cap_exempt_only);
        assert!(options.as_table);
    }

    #[test]
    fn missing_flag_value_is_an_error() {
        let err = parse_query_options(&args(&["capexempt", "search", "--name"])).unwrap_err();
        assert_eq!(err, "--name requires a value");
    }

    #[test]
    fn non_numeric_threshold_is_rejected() {
        let result = parse_query_options(&args(&["capexempt", "search", "--min-score", "high"]));
        assert!(result.is_err());
    }

    #[test]
    fn export_path_is_positional() {
        let options =
            parse_query_options(&args(&["capexempt", "export", "out.csv", "--name", "acme"]))
                .expect("valid flags");
        assert_eq!(options.positional, vec!["out.csv"]);
        assert_eq!(options.request.name, "acme");
    }
}
