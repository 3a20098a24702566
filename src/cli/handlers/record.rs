use anyhow::Result;
use clap::Parser;
use colored::*;

use crate::store::ActionsStore;

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true, about = "Records one use of an action.")]
struct RecordArgs {
    /// The id of the action that ran.
    id: String,
}

pub fn handle(args: Vec<String>, store: &mut ActionsStore) -> Result<()> {
    let record_args = RecordArgs::try_parse_from(&args)?;

    store.record_usage(&record_args.id)?;
    let count = store
        .get_action(&record_args.id)?
        .map(|a| a.metadata.usage_count)
        .unwrap_or(0);
    println!(
        "{} Usage recorded for '{}' (now {}).",
        "OK".green().bold(),
        record_args.id,
        count
    );
    Ok(())
}
