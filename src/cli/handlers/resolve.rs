use anyhow::Result;
use clap::Parser;
use colored::*;

use crate::store::ActionsStore;

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Resolves the ordered set of actions applicable to a URL."
)]
struct ResolveArgs {
    /// The URL to resolve against.
    url: String,
}

pub fn handle(args: Vec<String>, store: &mut ActionsStore) -> Result<()> {
    let resolve_args = ResolveArgs::try_parse_from(&args)?;

    let resolved = store.get_actions_for_url(&resolve_args.url)?;
    if resolved.is_empty() {
        println!("No actions apply to '{}'.", resolve_args.url);
        return Ok(());
    }

    println!(
        "\n--- {} action(s) for {} ---",
        resolved.len(),
        resolve_args.url.cyan()
    );
    for (rank, item) in resolved.iter().enumerate() {
        println!(
            "  {}. {} {} via {} (priority {})",
            rank + 1,
            item.action.name.yellow(),
            format!("({})", item.action.id).dimmed(),
            item.matched.as_str().cyan(),
            item.action.scope.priority
        );
    }
    Ok(())
}
