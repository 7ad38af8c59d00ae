//! Cache command - inspect and clear the persistent cache

use super::open_storage;
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::{Config, ConfigManager};
use crate::error::QuarryResult;
use crate::storage::{CacheEntryInfo, StorageContext};
use chrono::Utc;
use console::style;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> QuarryResult<()> {
    match args.action {
        CacheAction::Path => println!("{}", ConfigManager::store_path(config).display()),
        CacheAction::List { format } => list_entries(&*open_storage(config)?, format)?,
        CacheAction::Remove { key } => {
            open_storage(config)?.remove(&key)?;
            println!("{} Removed {}", style("[OK]").green(), key);
        }
        CacheAction::Clear => {
            let storage = open_storage(config)?;
            let count = storage.entries()?.len();
            storage.clear()?;
            println!(
                "{} Cleared {} cached {}",
                style("[OK]").green(),
                count,
                entries_noun(count)
            );
        }
    }

    Ok(())
}

fn list_entries(storage: &StorageContext, format: OutputFormat) -> QuarryResult<()> {
    let entries = storage.entries()?;

    if entries.is_empty() {
        match format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => println!("No cached entries."),
        }
        return Ok(());
    }

    match format {
        OutputFormat::Table => print_table(&entries),
        OutputFormat::Json => print_json(&entries)?,
        OutputFormat::Plain => print_plain(&entries),
    }

    Ok(())
}

fn print_table(entries: &[CacheEntryInfo]) {
    println!(
        "{:<60} {:<20} {:>10}",
        style("KEY").bold(),
        style("STORED").bold(),
        style("AGE").bold()
    );
    println!("{}", "-".repeat(92));

    let now = Utc::now();
    for entry in entries {
        let age = (now - entry.stored_at).num_seconds().max(0);
        println!(
            "{:<60} {:<20} {:>9}s",
            entry.key,
            entry.stored_at.format("%Y-%m-%d %H:%M:%S"),
            age
        );
    }

    println!();
    println!("Total: {} {}", entries.len(), entries_noun(entries.len()));
}

fn print_json(entries: &[CacheEntryInfo]) -> QuarryResult<()> {
    #[derive(serde::Serialize)]
    struct EntryJson<'a> {
        key: &'a str,
        stored_at: String,
    }

    let json_entries: Vec<EntryJson<'_>> = entries
        .iter()
        .map(|e| EntryJson {
            key: &e.key,
            stored_at: e.stored_at.to_rfc3339(),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&json_entries)?);
    Ok(())
}

fn entries_noun(count: usize) -> &'static str {
    if count == 1 {
        "entry"
    } else {
        "entries"
    }
}

fn print_plain(entries: &[CacheEntryInfo]) {
    for entry in entries {
        println!("{}", entry.key);
    }
}
