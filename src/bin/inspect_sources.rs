//! Report what each configured source contributes: existence, format, mapped columns
//! and row counts.
//! Run: cargo run --bin inspect_sources [config.yaml]

use std::path::Path;

use capexempt::config::AppConfig;
use capexempt::data::loader::{load_source, LoadError};
use capexempt::data::registry::SourceFormat;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    capexempt::logging::init_logging();

    let mut config = match std::env::args().nth(1) {
        Some(path) => AppConfig::from_file(Path::new(&path))?,
        None => AppConfig::load()?,
    };
    config.apply_env_overrides();

    let mut usable = 0;
    for spec in &config.sources {
        let path = config.resolve(&spec.file);
        let format = SourceFormat::from_path(&spec.file);
        let flags = if spec.primary { " primary" } else { "" };
        println!("{} ({}, {:?}{})", path.display(), spec.year, format, flags);

        if !path.exists() {
            println!("  not found");
            continue;
        }
        match load_source(&path, spec.year, spec.limit) {
            Ok((table, source)) => {
                let columns: Vec<String> = table.columns().iter().map(|c| c.to_string()).collect();
                println!("  columns: {}", columns.join(", "));
                println!("  rows: {} (dropped {})", source.rows, source.dropped_rows);
                usable += 1;
            }
            Err(LoadError::MissingColumns { missing, .. }) => {
                let missing: Vec<String> = missing.iter().map(|c| c.to_string()).collect();
                println!("  missing required columns: {}", missing.join(", "));
            }
            Err(err) => println!("  unreadable: {err}"),
        }
    }

    println!("{} of {} sources usable", usable, config.sources.len());
    if usable == 0 {
        std::process::exit(1);
    }
    Ok(())
}
