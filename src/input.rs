use std::{fs, io, path::Path};

use anyhow::{anyhow, Result};
use csv::{ReaderBuilder, StringRecord, Trim};

use crate::{
    declare::{Selectors, UrlEntry},
    logging,
    util::map,
};

/// 網址欄位可接受的標題
const URL_HEADERS: &[&str] = &["url", "URL", "link"];
const NAME_SEL: &str = "name_sel";
const PRICE_SEL: &str = "price_sel";
const CHANGE_SEL: &str = "change_sel";
const DATETIME_SEL: &str = "datetime_sel";

/// Loads the URL list. `.csv` files carry optional per-URL selectors, anything
/// else is read as one URL per line. Duplicate URLs keep their first row.
pub fn load(path: &Path) -> Result<Vec<UrlEntry>> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    let entries = if is_csv {
        let file = fs::File::open(path)
            .map_err(|why| anyhow!("Failed to open {} because {:?}", path.display(), why))?;
        parse_csv(file)?
    } else {
        let content = fs::read_to_string(path)
            .map_err(|why| anyhow!("Failed to read {} because {:?}", path.display(), why))?;
        parse_text(&content)
    };

    let total = entries.len();
    let entries = map::dedup_by_key(entries);
    if entries.len() < total {
        logging::warn_file_async(format!(
            "{} duplicate urls in {} were ignored",
            total - entries.len(),
            path.display()
        ));
    }

    Ok(entries)
}

/// Rows without a URL are skipped. Selector columns are all optional.
pub fn parse_csv<R: io::Read>(reader: R) -> Result<Vec<UrlEntry>> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let url_idx = URL_HEADERS
        .iter()
        .find_map(|h| column(&headers, h))
        .ok_or_else(|| anyhow!("The csv input has no url column (url, URL or link)"))?;
    let name_idx = column(&headers, NAME_SEL);
    let price_idx = column(&headers, PRICE_SEL);
    let change_idx = column(&headers, CHANGE_SEL);
    let datetime_idx = column(&headers, DATETIME_SEL);

    let mut entries = Vec::new();
    for (i, row) in rdr.records().enumerate() {
        let row = row.map_err(|why| anyhow!("Failed to read csv row {} because {:?}", i + 2, why))?;
        let url = match row.get(url_idx) {
            Some(url) if !url.is_empty() => url,
            _ => continue,
        };

        let selectors = Selectors {
            name: cell(&row, name_idx),
            price: cell(&row, price_idx),
            change: cell(&row, change_idx),
            datetime: cell(&row, datetime_idx),
        };

        entries.push(UrlEntry::with_selectors(url, selectors));
    }

    Ok(entries)
}

/// 一行一個網址，忽略空行與 # 註解
pub fn parse_text(content: &str) -> Vec<UrlEntry> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(UrlEntry::new)
        .collect()
}

fn column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

fn cell(row: &StringRecord, idx: Option<usize>) -> Option<String> {
    idx.and_then(|i| row.get(i))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
