use anyhow::Result;
use clap::Parser;
use colored::*;

use crate::store::ActionsStore;

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true, about = "Lists stored actions.")]
struct ListArgs {
    /// Only show actions scoped to this domain.
    #[arg(long)]
    domain: Option<String>,

    /// Case-insensitive search over names, descriptions, and tags.
    #[arg(long, short)]
    search: Option<String>,
}

pub fn handle(args: Vec<String>, store: &mut ActionsStore) -> Result<()> {
    let list_args = ListArgs::try_parse_from(&args)?;

    let actions = if let Some(query) = &list_args.search {
        store.search_actions(query)?
    } else if let Some(domain) = &list_args.domain {
        store.get_actions_for_domain(domain)?
    } else {
        store.get_all_actions()?
    };

    if actions.is_empty() {
        println!("No actions stored.");
        return Ok(());
    }

    println!("\n--- {} action(s) ---", actions.len());
    for action in &actions {
        let scope = match &action.scope.domain {
            Some(domain) => format!("{}:{}", action.scope.kind.as_str(), domain),
            None => action.scope.kind.as_str().to_string(),
        };
        println!(
            "  {} {} [{}] used {}x",
            action.name.yellow(),
            format!("({})", action.id).dimmed(),
            scope.cyan(),
            action.metadata.usage_count
        );
    }
    Ok(())
}
