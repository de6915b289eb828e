// Per-bank aggregate profiles and their artifact rows.

use colored::Colorize;
use serde::{Deserialize, Serialize};

/// Separator used when a list is flattened into one artifact cell.
pub const LIST_SEPARATOR: &str = ", ";

/// A bank's characteristic keywords and the themes they map to.
#[derive(Debug, Clone, PartialEq)]
pub struct BankKeywordProfile {
    pub bank_code: String,
    pub bank_name: String,
    /// Keywords in the extractor's ranking order
    pub keywords: Vec<String>,
    pub weights: Vec<f64>,
    pub themes: Vec<&'static str>,
}

/// One discovered topic, numbered from 1 within its bank.
#[derive(Debug, Clone, PartialEq)]
pub struct Topic {
    pub number: usize,
    pub words: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopicProfile {
    pub bank_code: String,
    pub bank_name: String,
    pub topics: Vec<Topic>,
}

/// Keyword artifact row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRow {
    pub bank_code: String,
    pub bank_name: String,
    pub keywords: String,
    pub themes: String,
}

/// Topic artifact row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicRow {
    pub bank_code: String,
    pub bank_name: String,
    pub topic_number: usize,
    pub topic_keywords: String,
}

impl BankKeywordProfile {
    pub fn keyword_string(&self) -> String {
        self.keywords.join(LIST_SEPARATOR)
    }

    pub fn to_row(&self) -> KeywordRow {
        KeywordRow {
            bank_code: self.bank_code.clone(),
            bank_name: self.bank_name.clone(),
            keywords: self.keyword_string(),
            themes: self.themes.join(LIST_SEPARATOR),
        }
    }

    /// Print keywords and themes, strongest keywords highlighted.
    pub fn display(&self) {
        println!(
            "\n{}",
            format!("=== {} ({}) ===", self.bank_name, self.bank_code).bold()
        );
        println!("  Themes:   {}", self.themes.join(LIST_SEPARATOR).bright_green());

        let mut by_weight: Vec<(&String, f64)> =
            self.keywords.iter().zip(self.weights.iter().copied()).collect();
        by_weight.sort_by(|a, b| b.1.total_cmp(&a.1));
        let top: Vec<&str> = by_weight.iter().take(10).map(|(k, _)| k.as_str()).collect();
        println!("  Strongest: {}", top.join(LIST_SEPARATOR).bright_yellow());
        println!(
            "  Keywords ({}): {}",
            self.keywords.len(),
            self.keyword_string().dimmed()
        );
    }
}

impl TopicProfile {
    pub fn to_rows(&self) -> Vec<TopicRow> {
        self.topics
            .iter()
            .map(|t| TopicRow {
                bank_code: self.bank_code.clone(),
                bank_name: self.bank_name.clone(),
                topic_number: t.number,
                topic_keywords: t.words.join(LIST_SEPARATOR),
            })
            .collect()
    }

    pub fn display(&self) {
        for topic in &self.topics {
            println!(
                "  Topic {}: {}",
                topic.number,
                topic.words.join(LIST_SEPARATOR).dimmed()
            );
        }
    }
}
