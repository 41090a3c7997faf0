//! Recordsync CLI - CSV import/export for record collections
//!
//! # Commands
//!
//! ```bash
//! recordsync serve                              # Start HTTP server (port 3000)
//! recordsync import suppliers.csv -e supplier   # Import rows into a collection
//! recordsync export suppliers.json -e supplier  # Write records as CSV
//! recordsync decode input.csv                   # Decode CSV to JSON
//! recordsync schema supplier                    # Show an entity's row schema
//! ```

use clap::{Parser, Subcommand};
use recordsync::{
    decode_file, export_entity, import_bytes, parse_selection, parser::ensure_csv_name,
    select_for_export, validation::row_schema, BatchMode, Collection, Config, DecodeMode,
    EntitySchema, ImportOptions, Record,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "recordsync")]
#[command(about = "Import and export record collections as CSV", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a CSV file and output JSON
    Decode {
        /// Input CSV file
        input: PathBuf,

        /// Fail on an unterminated quoted field
        #[arg(long)]
        strict: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import CSV rows into a collection
    Import {
        /// Input CSV file
        input: PathBuf,

        /// Entity to import (supplier, product)
        #[arg(short, long)]
        entity: String,

        /// Remote collection base URL (default: RECORDSYNC_REMOTE_URL, else dry run in memory)
        #[arg(long)]
        remote: Option<String>,

        /// Check field formats before creating
        #[arg(long)]
        strict_fields: bool,

        /// Fail on an unterminated quoted field
        #[arg(long)]
        strict_decode: bool,

        /// Update group sent with every create
        #[arg(long)]
        update_group: Option<String>,

        /// Write the JSON import report here
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Export JSON records (array of objects) as CSV
    Export {
        /// Input JSON file
        input: PathBuf,

        /// Entity whose columns to export
        #[arg(short, long)]
        entity: String,

        /// Comma-separated record indexes to export (default: all)
        #[arg(long)]
        selected: Option<String>,

        /// Output file (default: <entity stem>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the JSON Schema applied to an entity's rows
    Schema {
        /// Entity name
        entity: String,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: RECORDSYNC_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match Config::from_env() {
        Ok(config) => run(cli.command, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Decode { input, strict, output } => cmd_decode(&input, strict, output.as_deref()),

        Commands::Import {
            input,
            entity,
            remote,
            strict_fields,
            strict_decode,
            update_group,
            report,
        } => {
            let mut config = config;
            if remote.is_some() {
                config.remote_url = remote;
            }
            if strict_fields {
                config.strict_fields = true;
            }
            if strict_decode {
                config.decode_mode = DecodeMode::Strict;
            }
            if let Some(group) = update_group {
                config.batch_mode = BatchMode::Group(group);
            }
            cmd_import(&input, &entity, &config, report.as_deref()).await
        }

        Commands::Export { input, entity, selected, output } => {
            cmd_export(&input, &entity, selected.as_deref(), output.as_deref())
        }

        Commands::Schema { entity } => cmd_schema(&entity),

        Commands::Serve { port } => {
            let mut config = config;
            if let Some(port) = port {
                config.port = port;
            }
            recordsync::server::start_server(config).await
        }
    }
}

fn cmd_decode(input: &Path, strict: bool, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Decoding CSV: {}", input.display());

    let mode = if strict { DecodeMode::Strict } else { DecodeMode::Lenient };
    let decoded = decode_file(input, mode)?;
    eprintln!("   Columns: {}", decoded.header.join(", "));
    eprintln!("✅ Decoded {} rows", decoded.rows.len());

    let json = serde_json::to_string_pretty(&decoded)?;
    write_output(&json, output)?;
    Ok(())
}

async fn cmd_import(
    input: &Path,
    entity: &str,
    config: &Config,
    report_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let schema = EntitySchema::by_name(entity)?;
    ensure_csv_name(&input.to_string_lossy())?;

    let collection = Collection::for_schema(config, schema);
    eprintln!("📄 Importing {} into {}", input.display(), collection.describe());
    if matches!(collection, Collection::Memory(_)) {
        eprintln!("   (no remote configured, dry run)");
    }

    let bytes = fs::read(input)?;
    let options = ImportOptions {
        strict_fields: config.strict_fields,
        batch_mode: config.batch_mode.clone(),
        ..ImportOptions::default()
    };
    let report = import_bytes(&collection, schema, &bytes, config.decode_mode, options).await?;

    eprintln!("\n📊 Results:");
    eprintln!("   ✅ Created: {}", report.outcome.success_count);
    eprintln!("   ❌ Failed:  {}", report.outcome.error_count);
    for failure in report.failures.iter().take(5) {
        eprintln!("     - row {}: {:?}", failure.row, failure.reason);
    }

    if let Some(path) = report_path {
        fs::write(path, serde_json::to_string_pretty(&report)?)?;
        eprintln!("💾 Report written to: {}", path.display());
    }

    Ok(())
}

fn cmd_export(
    input: &Path,
    entity: &str,
    selected: Option<&str>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let schema = EntitySchema::by_name(entity)?;
    let content = fs::read_to_string(input)?;
    let records: Vec<Record> = serde_json::from_str(&content)?;
    let records = select_for_export(&records, &parse_selection(selected));

    let file = export_entity(&records, schema)?;
    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(file.file_name()));
    fs::write(&path, &file.content)?;
    eprintln!("✅ Exported {} record(s) to {}", records.len(), path.display());
    Ok(())
}

fn cmd_schema(entity: &str) -> Result<(), Box<dyn std::error::Error>> {
    let schema = EntitySchema::by_name(entity)?;
    println!("{}", serde_json::to_string_pretty(&row_schema(schema))?);
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
