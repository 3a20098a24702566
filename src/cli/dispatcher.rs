use anyhow::Result;
use colored::*;

use crate::cli::handlers;
use crate::store::ActionsStore;

// --- Command Definition and Registry ---

/// Defines a system command, its aliases, and its handler function.
/// The handler signature is kept consistent across all commands for
/// simplicity in the registry.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    summary: &'static str,
    handler: fn(Vec<String>, &mut ActionsStore) -> Result<()>,
}

/// The single source of truth for all system commands.
/// To add a new command, add a new entry to this static array.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "backup",
        aliases: &[],
        summary: "Snapshot all actions and domain configs.",
        handler: handlers::backup::handle,
    },
    CommandDefinition {
        name: "delete",
        aliases: &["del"],
        summary: "Delete a stored action.",
        handler: handlers::delete::handle,
    },
    CommandDefinition {
        name: "domains",
        aliases: &["dom"],
        summary: "Inspect and edit per-domain configuration.",
        handler: handlers::domains::handle,
    },
    CommandDefinition {
        name: "export",
        aliases: &[],
        summary: "Export actions as JSON or CSV.",
        handler: handlers::export::handle,
    },
    CommandDefinition {
        name: "import",
        aliases: &[],
        summary: "Import actions from a JSON or CSV file.",
        handler: handlers::import::handle,
    },
    CommandDefinition {
        name: "list",
        aliases: &["ls"],
        summary: "List stored actions.",
        handler: handlers::list::handle,
    },
    CommandDefinition {
        name: "record",
        aliases: &[],
        summary: "Record one use of an action.",
        handler: handlers::record::handle,
    },
    CommandDefinition {
        name: "resolve",
        aliases: &["res"],
        summary: "Resolve the actions applicable to a URL.",
        handler: handlers::resolve::handle,
    },
    CommandDefinition {
        name: "restore",
        aliases: &[],
        summary: "Restore a backup snapshot.",
        handler: handlers::restore::handle,
    },
    CommandDefinition {
        name: "show",
        aliases: &["info"],
        summary: "Show one action in full.",
        handler: handlers::show::handle,
    },
    CommandDefinition {
        name: "stats",
        aliases: &[],
        summary: "Usage and storage statistics.",
        handler: handlers::stats::handle,
    },
    CommandDefinition {
        name: "verify",
        aliases: &["check"],
        summary: "Reconcile the index against the action files.",
        handler: handlers::verify::handle,
    },
];

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// The main application dispatcher: `webact <command> [args...]`.
pub fn dispatch(all_args: Vec<String>, store: &mut ActionsStore) -> Result<()> {
    log::debug!("Dispatching args: {:?}", all_args);

    let mut args = all_args.into_iter();
    let command_name = match args.next() {
        Some(name) if name != "--help" && name != "-h" => name,
        _ => {
            print_usage();
            return Ok(());
        }
    };

    if command_name == "--version" || command_name == "-V" {
        println!("webact {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let handler_args: Vec<String> = args.collect();
    match find_command(&command_name) {
        Some(command) => (command.handler)(handler_args, store),
        None => {
            print_usage();
            Err(anyhow::anyhow!("Unknown command '{}'.", command_name))
        }
    }
}

fn print_usage() {
    println!(
        "{} {} - {}",
        "webact".yellow().bold(),
        env!("CARGO_PKG_VERSION"),
        "local store for browser automations"
    );
    println!("\n{}", "USAGE:".yellow().bold());
    println!("  webact <command> [args...]\n");
    println!("{}", "COMMANDS:".yellow().bold());
    for command in COMMAND_REGISTRY {
        let aliases = if command.aliases.is_empty() {
            String::new()
        } else {
            format!(" ({})", command.aliases.join(", "))
        };
        println!(
            "  {:<12}{}",
            format!("{}{}", command.name, aliases).cyan(),
            command.summary
        );
    }
    println!("\nRun 'webact <command> --help' for command options.");
}
