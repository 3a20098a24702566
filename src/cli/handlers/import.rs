use anyhow::{Context, Result, anyhow};
use clap::Parser;
use colored::*;
use std::fs;
use std::path::Path;

use crate::core::import_export::ImportFormat;
use crate::models::ImportOptions;
use crate::store::ActionsStore;

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Imports actions from a JSON or CSV file."
)]
struct ImportArgs {
    /// The file to import.
    path: String,

    /// Force a format ('json' or 'csv') instead of auto-detecting.
    #[arg(long, short)]
    format: Option<String>,

    /// Abort on the first invalid record instead of skipping it.
    #[arg(long)]
    fail_on_invalid: bool,

    /// Replace actions whose id already exists.
    #[arg(long)]
    overwrite: bool,

    /// Assign fresh ids to every imported record.
    #[arg(long)]
    new_ids: bool,
}

pub fn handle(args: Vec<String>, store: &mut ActionsStore) -> Result<()> {
    let import_args = ImportArgs::try_parse_from(&args)?;

    let path = dunce::canonicalize(Path::new(&import_args.path))
        .with_context(|| format!("Cannot resolve import file '{}'", import_args.path))?;
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Cannot read import file '{}'", path.display()))?;

    let format = match import_args.format.as_deref() {
        None => None,
        Some("json") => Some(ImportFormat::Json),
        Some("csv") => Some(ImportFormat::Csv),
        Some(other) => {
            return Err(anyhow!("Unknown import format '{}'. Use 'json' or 'csv'.", other));
        }
    };

    let report = store.import(
        &content,
        format,
        ImportOptions {
            skip_invalid: !import_args.fail_on_invalid,
            overwrite_existing: import_args.overwrite,
            generate_new_ids: import_args.new_ids,
        },
    )?;

    println!(
        "{} Imported {}, skipped {}, failed {}.",
        "OK".green().bold(),
        report.imported,
        report.skipped,
        report.failed
    );
    for error in &report.errors {
        println!("  - {}", error.yellow());
    }
    Ok(())
}
