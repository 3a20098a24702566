use anyhow::Result;
use clap::Parser;
use colored::*;

use crate::store::ActionsStore;

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Reconciles the action index against the files on disk."
)]
struct VerifyArgs {}

pub fn handle(args: Vec<String>, store: &mut ActionsStore) -> Result<()> {
    let _verify_args = VerifyArgs::try_parse_from(&args)?;

    let report = store.verify()?;

    println!("\n--- verify: {} entr(ies) checked ---", report.entries_checked);
    if report.is_clean() {
        println!("{} Index and files are consistent.", "OK".green().bold());
        return Ok(());
    }

    if !report.dangling_removed.is_empty() {
        println!(
            "  {} dangling index entr(ies) pruned:",
            report.dangling_removed.len()
        );
        for id in &report.dangling_removed {
            println!("    - {}", id.yellow());
        }
    }
    if !report.orphans_adopted.is_empty() {
        println!("  {} orphan file(s) adopted:", report.orphans_adopted.len());
        for id in &report.orphans_adopted {
            println!("    - {}", id.yellow());
        }
    }
    if report.usage_resynced > 0 {
        println!("  {} usage counter(s) resynced from files.", report.usage_resynced);
    }
    if !report.unreadable.is_empty() {
        println!("  {} unreadable file(s):", report.unreadable.len());
        for path in &report.unreadable {
            println!("    - {}", path.red());
        }
        println!("  Unreadable files are left in place; inspect or delete them manually.");
    }
    Ok(())
}
