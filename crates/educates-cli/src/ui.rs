//! UI helpers for the CLI.
//!
//! Provides consistent formatting for console output.

use colored::Colorize;

use crate::resources::WorkshopEntry;

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message.green());
}

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print an error message to stderr.
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message.red());
}

/// Print a key-value pair.
pub fn print_kv(key: &str, value: &str) {
    println!("  {}: {}", key.bright_black(), value);
}

/// Print the session settings stored for a workshop.
pub fn print_entry(entry: &WorkshopEntry) {
    let capacity = entry
        .capacity
        .map_or_else(|| "unlimited".to_string(), |capacity| capacity.to_string());

    print_kv("Capacity", &capacity);
    print_kv("Reserved", &entry.reserved.unwrap_or_default().to_string());
    print_kv("Initial", &entry.initial.unwrap_or_default().to_string());

    for (key, value) in [
        ("Expires", &entry.expires),
        ("Overtime", &entry.overtime),
        ("Deadline", &entry.deadline),
        ("Orphaned", &entry.orphaned),
        ("Overdue", &entry.overdue),
        ("Refresh", &entry.refresh),
    ] {
        if let Some(value) = value {
            print_kv(key, value);
        }
    }

    if let Some(registry) = &entry.registry {
        match &registry.namespace {
            Some(namespace) => print_kv("Registry", &format!("{}/{namespace}", registry.host)),
            None => print_kv("Registry", &registry.host),
        }
    }
}
