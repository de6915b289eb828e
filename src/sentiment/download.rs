// Lexicon download helper.
//
// Fetches the published VADER lexicon (~7,500 scored tokens) once and keeps
// it in a platform-appropriate directory
// (~/.local/share/bank-reviews/ on Linux) so it persists across runs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Published lexicon file.
const LEXICON_URL: &str =
    "https://raw.githubusercontent.com/cjhutto/vaderSentiment/master/vaderSentiment/vader_lexicon.txt";

const LEXICON_FILE: &str = "vader_lexicon.txt";

/// Default lexicon location under the platform data directory.
pub fn default_lexicon_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bank-reviews")
        .join(LEXICON_FILE)
}

/// Download the lexicon to `dest` unless it is already there.
///
/// Returns true when a download happened.
pub async fn download_lexicon(dest: &Path) -> Result<bool> {
    if dest.exists() {
        info!("Lexicon already exists at {}, skipping", dest.display());
        return Ok(false);
    }
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create lexicon directory: {}", parent.display())
            })?;
        }
    }

    let response = reqwest::Client::new()
        .get(LEXICON_URL)
        .send()
        .await
        .with_context(|| format!("Failed to download {LEXICON_URL}"))?;

    if !response.status().is_success() {
        anyhow::bail!(
            "Download failed with status {}: {}",
            response.status(),
            LEXICON_URL
        );
    }

    let pb = match response.content_length() {
        Some(size) => {
            let pb = ProgressBar::new(size);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("    [{bar:40.cyan/blue}] {bytes}/{total_bytes}")
                    .expect("valid template")
                    .progress_chars("=> "),
            );
            pb
        }
        None => ProgressBar::new_spinner(),
    };

    let bytes = response
        .bytes()
        .await
        .context("Failed to read response body")?;
    pb.set_position(bytes.len() as u64);

    // Write next to the target, then rename, so a failed download leaves nothing behind.
    let tmp = dest.with_extension("txt.part");
    std::fs::write(&tmp, &bytes).with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, dest)
        .with_context(|| format!("Failed to move lexicon into {}", dest.display()))?;
    pb.finish_and_clear();

    info!(bytes = bytes.len(), "Downloaded lexicon to {}", dest.display());
    Ok(true)
}
