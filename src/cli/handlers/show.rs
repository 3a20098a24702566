use anyhow::{Result, anyhow};
use clap::Parser;
use colored::*;

use crate::store::ActionsStore;

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true, about = "Shows one action in full.")]
struct ShowArgs {
    /// The id of the action to display.
    id: String,

    /// Print the raw JSON document instead of the summary view.
    #[arg(long)]
    json: bool,
}

pub fn handle(args: Vec<String>, store: &mut ActionsStore) -> Result<()> {
    let show_args = ShowArgs::try_parse_from(&args)?;

    let action = store
        .get_action(&show_args.id)?
        .ok_or_else(|| anyhow!("Action '{}' not found.", show_args.id))?;

    if show_args.json {
        println!("{}", serde_json::to_string_pretty(&action)?);
        return Ok(());
    }

    println!("\n--- {} ---", action.name.yellow());
    println!("  {:<12} {}", "id".blue(), action.id);
    if !action.description.is_empty() {
        println!("  {:<12} {}", "description".blue(), action.description);
    }
    println!("  {:<12} {}", "category".blue(), action.category.as_str());
    println!("  {:<12} {}", "author".blue(), action.author.as_str());
    println!(
        "  {:<12} {} (priority {})",
        "scope".blue(),
        action.scope.kind.as_str(),
        action.scope.priority
    );
    if let Some(domain) = &action.scope.domain {
        println!("  {:<12} {}", "domain".blue(), domain);
    }
    if let Some(pattern) = &action.scope.url_pattern {
        println!("  {:<12} {}", "pattern".blue(), pattern);
    }
    if !action.tags.is_empty() {
        println!("  {:<12} {}", "tags".blue(), action.tags.join(", "));
    }
    println!("  {:<12} {}", "steps".blue(), action.steps.len());
    println!(
        "  {:<12} {} (created {}, updated {})",
        "usage".blue(),
        action.metadata.usage_count,
        action.metadata.created_at.format("%Y-%m-%d"),
        action.metadata.updated_at.format("%Y-%m-%d")
    );
    Ok(())
}
