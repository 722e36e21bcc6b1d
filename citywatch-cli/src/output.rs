use citywatch_core::{RefreshReport, WatchlistEntry};

pub fn print_entry(entry: &WatchlistEntry) {
    println!(
        "{:>10}  {} ({})  {}°C (feels {}°C, {}..{}°C)  {}  [{}]  updated {}",
        entry.id,
        entry.display_name(),
        entry.country,
        entry.current_temp_c,
        entry.feels_like_c,
        entry.min_temp_c,
        entry.max_temp_c,
        entry.description,
        entry.icon,
        entry.last_updated,
    );
}

pub fn print_watchlist(entries: &[WatchlistEntry]) {
    if entries.is_empty() {
        println!("The watchlist is empty.");
        return;
    }
    for entry in entries {
        print_entry(entry);
    }
}

pub fn print_report(report: &RefreshReport) {
    println!(
        "Refreshed {}, skipped {}, failed {}.",
        report.updated.len(),
        report.discarded.len(),
        report.failed.len()
    );
    for (id, error) in &report.failed {
        eprintln!("  {id}: {error}");
    }
}
