use anyhow::{Context, Result, anyhow};
use clap::Parser;
use colored::*;
use dialoguer::{Confirm, theme::ColorfulTheme};
use std::fs;
use std::path::Path;

use crate::models::{BackupEnvelope, RestoreOptions};
use crate::store::ActionsStore;

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true, about = "Restores a backup snapshot.")]
struct RestoreArgs {
    /// The id of a backup in the store's backups directory.
    backup_id: Option<String>,

    /// Restore from an external backup file instead of a stored backup id.
    #[arg(long, conflicts_with = "backup_id")]
    file: Option<String>,

    /// Wipe all current actions and domain configs before restoring.
    #[arg(long)]
    clear_existing: bool,

    /// Replace actions whose id already exists.
    #[arg(long)]
    overwrite: bool,

    /// Skip the confirmation prompt for --clear-existing.
    #[arg(long, short)]
    yes: bool,
}

pub fn handle(args: Vec<String>, store: &mut ActionsStore) -> Result<()> {
    let restore_args = RestoreArgs::try_parse_from(&args)?;

    if restore_args.clear_existing && !restore_args.yes {
        println!(
            "\n{}",
            "This will DELETE every current action and domain config first."
                .red()
                .bold()
        );
        if !Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Continue?")
            .default(false)
            .interact()?
        {
            println!("\nOperation cancelled.");
            return Ok(());
        }
    }

    let options = RestoreOptions {
        clear_existing: restore_args.clear_existing,
        overwrite_existing: restore_args.overwrite,
    };

    let report = match (&restore_args.backup_id, &restore_args.file) {
        (Some(backup_id), None) => store.restore_backup_id(backup_id, options)?,
        (None, Some(file)) => {
            let path = dunce::canonicalize(Path::new(file))
                .with_context(|| format!("Cannot resolve backup file '{}'", file))?;
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("Cannot read backup file '{}'", path.display()))?;
            let envelope: BackupEnvelope = serde_json::from_str(&raw)
                .with_context(|| format!("'{}' is not a backup snapshot", path.display()))?;
            store.restore(envelope, options)?
        }
        _ => return Err(anyhow!("Provide a backup id or --file <path>.")),
    };

    println!(
        "{} Restored {} action(s) ({} skipped, {} failed) and {} domain config(s).",
        "OK".green().bold(),
        report.actions_restored,
        report.actions_skipped,
        report.actions_failed,
        report.domains_restored
    );
    for error in &report.errors {
        println!("  - {}", error.yellow());
    }
    Ok(())
}
