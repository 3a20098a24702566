use anyhow::{Result, anyhow};
use clap::Parser;
use colored::*;
use dialoguer::{Confirm, theme::ColorfulTheme};

use crate::store::ActionsStore;

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true, about = "Deletes a stored action.")]
struct DeleteArgs {
    /// The id of the action to delete.
    id: String,

    /// Skip the confirmation prompt.
    #[arg(long, short)]
    yes: bool,
}

pub fn handle(args: Vec<String>, store: &mut ActionsStore) -> Result<()> {
    let delete_args = DeleteArgs::try_parse_from(&args)?;

    let action = store
        .get_action(&delete_args.id)?
        .ok_or_else(|| anyhow!("Action '{}' not found.", delete_args.id))?;

    if !delete_args.yes {
        let prompt = format!("Delete action '{}' ({})?", action.name, action.id);
        if !Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact()?
        {
            println!("\nOperation cancelled.");
            return Ok(());
        }
    }

    store.delete_action(&delete_args.id)?;
    println!("{} Deleted '{}'.", "OK".green().bold(), action.name);
    Ok(())
}
