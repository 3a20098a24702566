use anyhow::Result;
use clap::Parser;
use colored::*;

use crate::store::ActionsStore;

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true, about = "Usage and storage statistics.")]
struct StatsArgs {}

pub fn handle(args: Vec<String>, store: &mut ActionsStore) -> Result<()> {
    let _stats_args = StatsArgs::try_parse_from(&args)?;

    let stats = store.statistics()?;
    let storage = store.storage_stats()?;

    println!("\n--- store statistics ---");
    println!("  {:<14} {}", "actions".blue(), stats.total_actions);
    println!(
        "  {:<14} {} across {} file(s)",
        "storage".blue(),
        human_size(storage.total_size),
        storage.file_count
    );
    println!(
        "  {:<14} {} total, {:.1} average",
        "usage".blue(),
        stats.total_usage,
        stats.average_usage
    );

    let print_breakdown = |label: &str, counts: &std::collections::HashMap<String, usize>| {
        if counts.is_empty() {
            return;
        }
        let mut rows: Vec<_> = counts.iter().collect();
        rows.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        let joined: Vec<String> = rows.iter().map(|(k, v)| format!("{} {}", v, k)).collect();
        println!("  {:<14} {}", label.blue(), joined.join(", "));
    };
    print_breakdown("by scope", &stats.actions_by_scope);
    print_breakdown("by category", &stats.actions_by_category);
    print_breakdown("by author", &stats.actions_by_author);

    if !stats.most_used.is_empty() {
        println!("\n  {}", "most used".blue());
        for stat in &stats.most_used {
            println!("    {:>5}x {}", stat.usage_count, stat.name.yellow());
        }
    }
    Ok(())
}

fn human_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MiB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}
