//! Schema index generator for SQLite databases.
//!
//! Introspects a database and writes the `schema_index.json` the retriever
//! and prompt builder read at startup.
//!
//! Usage:
//!   schema_gen <database.sqlite>                      # write ./schema_index.json
//!   schema_gen <database.sqlite> -o data/index.json   # custom output path
//!   schema_gen <database.sqlite> --max-samples 10     # sample more values
//!   schema_gen <database.sqlite> --stdout             # print JSON instead

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use heron::config::Settings;
use heron::schema::introspect::introspect_path;
use heron::schema::SchemaIndex;

#[derive(Parser)]
#[command(name = "schema_gen")]
#[command(about = "Build a schema index from a SQLite database")]
#[command(version)]
struct Args {
    /// SQLite database file to introspect
    database: PathBuf,

    /// Output path (defaults to schema.index_path from the config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Distinct values sampled per text column (defaults to schema.max_samples)
    #[arg(long)]
    max_samples: Option<usize>,

    /// Print the index to stdout instead of writing a file
    #[arg(long)]
    stdout: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let settings = match Settings::load() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = heron::logging::init(&settings.logging) {
        eprintln!("Warning: logging disabled: {}", e);
    }

    if !args.database.exists() {
        eprintln!("Error: database '{}' not found", args.database.display());
        return ExitCode::FAILURE;
    }

    let max_samples = args.max_samples.unwrap_or(settings.schema.max_samples);
    let index = match introspect_path(&args.database, max_samples) {
        Ok(index) => index,
        Err(e) => {
            eprintln!("Error introspecting '{}': {}", args.database.display(), e);
            return ExitCode::FAILURE;
        }
    };

    if args.stdout {
        return match index.to_json_string() {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error serializing index: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let output = match args.output {
        Some(path) => path,
        None => match settings.schema.resolved_index_path() {
            Ok(path) => path,
            Err(e) => {
                eprintln!("Configuration error: {}", e);
                return ExitCode::FAILURE;
            }
        },
    };

    if let Err(e) = write_index(&index, &output) {
        eprintln!("Error writing '{}': {}", output.display(), e);
        return ExitCode::FAILURE;
    }

    for line in index.summary_lines() {
        println!("{}", line);
    }
    println!();
    println!("Wrote {} tables to {}", index.len(), output.display());
    ExitCode::SUCCESS
}

fn write_index(index: &SchemaIndex, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    index.save(output)?;
    Ok(())
}
