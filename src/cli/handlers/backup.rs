use anyhow::Result;
use clap::Parser;
use colored::*;

use crate::store::ActionsStore;

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Snapshots all actions and domain configs into a backup."
)]
struct BackupArgs {
    /// List existing backups instead of creating one.
    #[arg(long, short)]
    list: bool,
}

pub fn handle(args: Vec<String>, store: &mut ActionsStore) -> Result<()> {
    let backup_args = BackupArgs::try_parse_from(&args)?;

    if backup_args.list {
        let backups = store.list_backups()?;
        if backups.is_empty() {
            println!("No backups yet.");
            return Ok(());
        }
        println!("\n--- {} backup(s) ---", backups.len());
        for meta in &backups {
            println!(
                "  {} {} ({} actions, {} domains)",
                meta.backup_id.yellow(),
                meta.timestamp
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
                    .dimmed(),
                meta.total_actions,
                meta.total_domains
            );
        }
        return Ok(());
    }

    let meta = store.create_backup()?;
    println!(
        "{} Created backup '{}' ({} actions, {} domains).",
        "OK".green().bold(),
        meta.backup_id,
        meta.total_actions,
        meta.total_domains
    );
    Ok(())
}
