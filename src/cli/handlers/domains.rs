use anyhow::{Result, anyhow};
use clap::Parser;
use colored::*;
use dialoguer::{Confirm, theme::ColorfulTheme};

use crate::models::{PatternKind, UrlPatternDefinition};
use crate::store::ActionsStore;

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Inspects and edits per-domain configuration."
)]
struct DomainsArgs {
    /// The domain to operate on. Omit to list all configured domains.
    domain: Option<String>,

    /// Create a default configuration for the domain if none exists.
    #[arg(long)]
    init: bool,

    /// Register (or replace) a named URL pattern on the domain.
    #[arg(long, value_name = "NAME", requires = "pattern")]
    add_pattern: Option<String>,

    /// The pattern string for --add-pattern.
    #[arg(long, requires = "add_pattern")]
    pattern: Option<String>,

    /// The pattern kind for --add-pattern: 'glob', 'prefix', or 'regex'.
    #[arg(long, default_value = "glob")]
    kind: String,

    /// The priority for --add-pattern.
    #[arg(long, default_value_t = 0)]
    priority: i32,

    /// Remove a named URL pattern from the domain.
    #[arg(long, value_name = "NAME")]
    remove_pattern: Option<String>,

    /// Delete the domain's configuration entirely.
    #[arg(long)]
    delete: bool,

    /// Skip the confirmation prompt for --delete.
    #[arg(long, short)]
    yes: bool,
}

pub fn handle(args: Vec<String>, store: &mut ActionsStore) -> Result<()> {
    let domain_args = DomainsArgs::try_parse_from(&args)?;

    let Some(domain) = domain_args.domain else {
        let domains = store.list_domains()?;
        if domains.is_empty() {
            println!("No domains configured.");
        } else {
            println!("\n--- {} domain(s) ---", domains.len());
            for domain in &domains {
                println!("  {}", domain.cyan());
            }
        }
        return Ok(());
    };

    if domain_args.delete {
        if !domain_args.yes {
            let prompt = format!("Delete the configuration for '{}'?", domain);
            if !Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .default(false)
                .interact()?
            {
                println!("\nOperation cancelled.");
                return Ok(());
            }
        }
        if store.delete_domain(&domain)? {
            println!("{} Deleted configuration for '{}'.", "OK".green().bold(), domain);
        } else {
            println!("'{}' had no configuration.", domain);
        }
        return Ok(());
    }

    if domain_args.init {
        store.initialize_domain(&domain)?;
        println!("{} Initialized '{}'.", "OK".green().bold(), domain);
    }

    if let Some(name) = domain_args.add_pattern {
        let kind = match domain_args.kind.to_ascii_lowercase().as_str() {
            "glob" => PatternKind::Glob,
            "prefix" => PatternKind::Prefix,
            "regex" => PatternKind::Regex,
            other => return Err(anyhow!("Unknown pattern kind '{}'.", other)),
        };
        let definition = UrlPatternDefinition {
            name: name.clone(),
            // `requires` guarantees the pattern is present alongside the name.
            pattern: domain_args.pattern.clone().unwrap_or_default(),
            kind,
            priority: domain_args.priority,
            description: None,
        };
        store.add_url_pattern(&domain, definition)?;
        println!("{} Registered pattern '{}' on '{}'.", "OK".green().bold(), name, domain);
    }

    if let Some(name) = domain_args.remove_pattern {
        if store.remove_url_pattern(&domain, &name)? {
            println!("{} Removed pattern '{}'.", "OK".green().bold(), name);
        } else {
            println!("Pattern '{}' was not registered; nothing to do.", name);
        }
    }

    // Always end by showing the config as it now stands.
    match store.get_domain_config(&domain)? {
        Some(config) => {
            println!("\n--- {} ---", config.domain.yellow());
            if config.url_patterns.is_empty() {
                println!("  (no url patterns)");
            }
            for pattern in &config.url_patterns {
                println!(
                    "  {:<16} {} [{}] priority {}",
                    pattern.name.cyan(),
                    pattern.pattern,
                    match pattern.kind {
                        PatternKind::Glob => "glob",
                        PatternKind::Prefix => "prefix",
                        PatternKind::Regex => "regex",
                    },
                    pattern.priority
                );
            }
        }
        None => println!("'{}' has no configuration. Use --init to create one.", domain),
    }
    Ok(())
}
