// Colored terminal summaries, one per pipeline stage.
//
// Each stage returns a typed report; main.rs hands it to the matching
// display function here.

use colored::Colorize;

use crate::db::LoadReport;
use crate::normalize::NormalizeStats;
use crate::pipeline::{describe_fetch, SentimentSummary};
use crate::source::scrape::{FetchOutcome, ScrapeReport};
use crate::themes::ThemeReport;

use super::truncate_chars;

pub fn display_scrape_summary(report: &ScrapeReport) {
    println!("\n{}", "=== Scrape Summary ===".bold());
    for app in &report.apps {
        let line = truncate_chars(&describe_fetch(&app.outcome), 100);
        match app.outcome {
            FetchOutcome::Fetched { .. } => {
                println!("  {} {:<8} {}", "✓".green(), app.bank.code, line)
            }
            FetchOutcome::Exhausted { .. } => {
                println!("  {} {:<8} {}", "✗".red(), app.bank.code, line.red())
            }
        }
    }
    println!(
        "  Total reviews collected: {}",
        report.reviews.len().to_string().bold()
    );
    let failed = report.exhausted().count();
    if failed > 0 {
        println!(
            "  {} {} app(s) returned nothing after retries",
            "!".yellow().bold(),
            failed
        );
    }
}

pub fn display_normalize_summary(stats: &NormalizeStats) {
    println!("\n{}", "=== Preprocessing Summary ===".bold());
    println!("  Original rows:             {}", stats.original_count);
    println!("  Duplicates removed:        {}", stats.duplicates_removed);
    println!("  Rows with Ethiopic text:   {}", stats.ethiopic_rows_affected);

    let missing: Vec<String> = stats
        .missing_by_column
        .iter()
        .filter(|(_, n)| *n > 0)
        .map(|(col, n)| format!("{col}={n}"))
        .collect();
    if !missing.is_empty() {
        println!("  Missing values:            {}", missing.join(", ").dimmed());
    }

    if stats.ratings_out_of_range > 0 {
        println!("  Ratings outside 1-5:       {}", stats.ratings_out_of_range);
    }
    println!("  Removed (missing fields):  {}", stats.rows_removed_missing);
    println!("  After missing-data policy: {}", stats.count_after_missing);
    if stats.dates_unparsed > 0 {
        println!(
            "  {} {} date(s) kept unparsed",
            "!".yellow().bold(),
            stats.dates_unparsed
        );
    }
    println!("  Empty reviews removed:     {}", stats.empty_reviews_removed);
    println!(
        "  Final rows:                {}",
        stats.final_count.to_string().bold()
    );
}

pub fn display_sentiment_summary(summary: &SentimentSummary) {
    println!("\n{}", "=== Sentiment Summary ===".bold());
    println!("  Reviews scored: {}", summary.total.to_string().bold());
    println!(
        "  {} {}   {} {}   {} {}",
        "positive".green(),
        summary.positive,
        "neutral".dimmed(),
        summary.neutral,
        "negative".red(),
        summary.negative
    );
    for (bank, mean) in &summary.mean_by_bank {
        let score = format!("{mean:+.3}");
        let colored_score = if *mean >= 0.05 {
            score.green()
        } else if *mean <= -0.05 {
            score.red()
        } else {
            score.normal()
        };
        println!("  {:<32} mean {}", bank, colored_score);
    }
}

pub fn display_theme_report(report: &ThemeReport) {
    for bank in &report.banks {
        match &bank.result {
            Ok((keywords, topics)) => {
                keywords.display();
                topics.display();
            }
            Err(e) => println!(
                "\n{} {} ({} reviews): {}",
                "✗".red(),
                bank.bank_name.bold(),
                bank.review_count,
                e.to_string().red()
            ),
        }
    }
    if report.unassigned_reviews > 0 {
        println!(
            "\n  {} {} review(s) without a bank code were skipped",
            "!".yellow().bold(),
            report.unassigned_reviews
        );
    }
}

pub fn display_load_summary(report: &LoadReport) {
    println!("\n{}", "=== Load Summary ===".bold());
    println!("  Banks inserted:   {}", report.banks_inserted);
    println!(
        "  Reviews inserted: {}",
        report.reviews_inserted.to_string().green()
    );
    println!("  Already stored:   {}", report.reviews_existing);
    if report.reviews_skipped > 0 {
        println!(
            "  {} {} review(s) skipped (no id or bank)",
            "!".yellow().bold(),
            report.reviews_skipped
        );
    }
}
