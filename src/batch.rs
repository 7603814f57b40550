use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::Result;
use scraper::Html;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::{
    declare::{QuoteRecord, UrlEntry},
    extract, logging, output,
    render::PageRenderer,
};

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// 頁面載入後、擷取前的等待時間
    pub settle_delay: Duration,
    pub run_dir: PathBuf,
    /// 渲染失敗時是否留下 ERROR_*.txt
    pub write_error_files: bool,
}

/// Visits every entry in input order, one page at a time, and returns one
/// record per visited entry. A page that fails to render still yields a
/// record (all quote fields empty). Cancelling stops before the next page and
/// returns whatever was completed.
pub async fn run<R: PageRenderer + ?Sized>(
    entries: &[UrlEntry],
    renderer: &R,
    options: &BatchOptions,
    cancel: &CancellationToken,
) -> Vec<QuoteRecord> {
    let total = entries.len();
    let mut records = Vec::with_capacity(total);

    for (i, entry) in entries.iter().enumerate() {
        if cancel.is_cancelled() {
            break;
        }

        let start = Instant::now();
        let screenshot = output::screenshot_path(&options.run_dir, i + 1, &entry.url);
        let screenshot_path = screenshot.display().to_string();

        let visited = tokio::select! {
            _ = cancel.cancelled() => {
                logging::warn_file_async(format!("Cancelled while visiting {}", entry.url));
                break;
            }
            html = visit(renderer, &entry.url, &screenshot, options.settle_delay) => html,
        };

        let record = match visited {
            Ok(html) => extract_record(entry, &html, screenshot_path),
            Err(why) => failed_record(entry, why, screenshot_path, options),
        };

        logging::info_console(format!(
            "[{}/{}] {} resolved {}/4 fields in {:?}",
            i + 1,
            total,
            entry.url,
            record.resolved_fields(),
            start.elapsed()
        ));
        records.push(record);
    }

    if records.len() < total {
        logging::warn_file_async(format!(
            "Batch stopped after {} of {} urls",
            records.len(),
            total
        ));
    }

    records
}

async fn visit<R: PageRenderer + ?Sized>(
    renderer: &R,
    url: &str,
    screenshot: &Path,
    settle_delay: Duration,
) -> Result<String> {
    renderer.open(url).await?;
    if !settle_delay.is_zero() {
        time::sleep(settle_delay).await;
    }
    renderer.snapshot(screenshot).await
}

fn extract_record(entry: &UrlEntry, html: &str, screenshot_path: String) -> QuoteRecord {
    let document = Html::parse_document(html);
    let quote = extract::extract_quote(&document, entry);
    extract::build_record(entry, quote, screenshot_path)
}

fn failed_record(
    entry: &UrlEntry,
    why: anyhow::Error,
    screenshot_path: String,
    options: &BatchOptions,
) -> QuoteRecord {
    let reason = format!("{:#}", why);
    logging::error_file_async(format!("Failed to render {} because {}", entry.url, reason));

    if options.write_error_files {
        if let Err(why) = output::write_error_file(&options.run_dir, &entry.url, &reason) {
            logging::error_file_async(format!("{:?}", why));
        }
    }

    QuoteRecord::unresolved(&entry.url, screenshot_path, reason)
}
