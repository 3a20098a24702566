use anyhow::{Result, anyhow};
use clap::Parser;
use colored::*;
use std::fs;

use crate::store::ActionsStore;

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true, about = "Exports actions as JSON or CSV.")]
struct ExportArgs {
    /// Output format: 'json' or 'csv'.
    #[arg(long, short, default_value = "json")]
    format: String,

    /// Write to this file instead of stdout.
    #[arg(long, short)]
    output: Option<String>,
}

pub fn handle(args: Vec<String>, store: &mut ActionsStore) -> Result<()> {
    let export_args = ExportArgs::try_parse_from(&args)?;

    let payload = match export_args.format.to_ascii_lowercase().as_str() {
        "json" => store.export_json()?,
        "csv" => store.export_csv()?,
        other => return Err(anyhow!("Unknown export format '{}'. Use 'json' or 'csv'.", other)),
    };

    match export_args.output {
        Some(path) => {
            fs::write(&path, &payload)?;
            println!("{} Exported to '{}'.", "OK".green().bold(), path);
        }
        None => print!("{}", payload),
    }
    Ok(())
}
