// Pipeline status: artifact presence and row counts, then the store's
// verification queries.

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use crate::artifacts;
use crate::config::Config;
use crate::db::Database;

/// Display pipeline status to the terminal. `db` is None when no store exists yet.
pub async fn show(config: &Config, db: Option<&dyn Database>) -> Result<()> {
    println!("{}", format!("Data directory: {}", config.data_dir.display()).bold());
    for (label, path) in config.paths.labelled() {
        println!("  {:<18} {}", label, describe_artifact(path));
    }

    let Some(db) = db else {
        println!("\nStore: not initialized");
        println!("  Run `bank-reviews load` to create it");
        return Ok(());
    };

    println!("\n{}", "Store".bold());
    println!("  Tables: {}", db.table_count().await?);
    println!("  Total reviews: {}", db.review_count().await?);

    let per_bank = db.reviews_per_bank().await?;
    if !per_bank.is_empty() {
        println!("  Reviews per bank:");
        for stat in &per_bank {
            println!("    {:<32} {}", stat.bank_name, stat.value);
        }
    }

    let ratings = db.average_rating_per_bank().await?;
    if !ratings.is_empty() {
        println!("  Average rating per bank:");
        for stat in &ratings {
            println!("    {:<32} {:.2}", stat.bank_name, stat.value);
        }
    }

    let distribution = db.sentiment_distribution().await?;
    if !distribution.is_empty() {
        println!("  Sentiment distribution:");
        for (label, count) in &distribution {
            println!("    {:<10} {}", label, count);
        }
    }

    Ok(())
}

fn describe_artifact(path: &Path) -> String {
    if !path.exists() {
        return "missing".dimmed().to_string();
    }
    let size = std::fs::metadata(path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    match artifacts::count_rows(path) {
        Ok(rows) => format!("{rows} rows ({size})"),
        Err(e) => format!("unreadable: {e}").red().to_string(),
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn missing_artifact_is_reported() {
        colored::control::set_override(false);
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(describe_artifact(&dir.path().join("none.csv")), "missing");
    }
}
