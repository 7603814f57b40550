use std::{
    fs,
    io::BufWriter,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};

use crate::{declare::QuoteRecord, util::text};

pub const CSV_FILE: &str = "quotes.csv";
pub const JSON_FILE: &str = "quotes.json";

/// csv 欄位順序，須與 `QuoteRecord` 的欄位一致
const COLUMNS: &[&str] = &[
    "url",
    "source",
    "name",
    "price",
    "change_pct",
    "observed_at",
    "screenshot_path",
    "extracted_at",
    "note",
];

/// Creates `<base>/<YYYYmmdd_HHMMSS>/` for one run.
pub fn create_run_dir(base: &Path, now: DateTime<Utc>) -> Result<PathBuf> {
    let run_dir = base.join(now.format("%Y%m%d_%H%M%S").to_string());
    fs::create_dir_all(&run_dir).map_err(|why| {
        anyhow!("Failed to create the run directory {} because {:?}", run_dir.display(), why)
    })?;

    Ok(run_dir)
}

/// `<run_dir>/<NNN>_<host>_<path>.png` with unsafe characters replaced.
/// `position` is the 1-based place of the URL in the batch, so URLs that
/// differ only by scheme or fragment never share a file.
pub fn screenshot_path(run_dir: &Path, position: usize, url: &str) -> PathBuf {
    let stem = match url::Url::parse(url) {
        Ok(parsed) => {
            let mut stem = format!("{}_{}", parsed.host_str().unwrap_or_default(), parsed.path());
            if let Some(query) = parsed.query() {
                stem.push('_');
                stem.push_str(query);
            }
            text::sanitize(&stem)
        }
        Err(_) => text::sanitize(url),
    };

    let stem = if stem.is_empty() { "page".to_string() } else { stem };
    run_dir.join(format!("{:03}_{}.png", position, stem))
}

/// Leaves `ERROR_<url>.txt` next to the screenshots.
pub fn write_error_file(run_dir: &Path, url: &str, reason: &str) -> Result<PathBuf> {
    let path = run_dir.join(format!("ERROR_{}.txt", text::sanitize(url)));
    fs::write(&path, format!("{}\n{}\n", url, reason))
        .map_err(|why| anyhow!("Failed to write {} because {:?}", path.display(), why))?;

    Ok(path)
}

/// Every column is written for every record; missing values stay empty cells.
pub fn write_csv(path: &Path, records: &[QuoteRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|why| anyhow!("Failed to create {} because {:?}", path.display(), why))?;

    if records.is_empty() {
        wtr.write_record(COLUMNS)?;
    }

    for record in records {
        wtr.serialize(record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Missing values are written as `null`.
pub fn write_json(path: &Path, records: &[QuoteRecord]) -> Result<()> {
    let file = fs::File::create(path)
        .map_err(|why| anyhow!("Failed to create {} because {:?}", path.display(), why))?;
    serde_json::to_writer_pretty(BufWriter::new(file), records)?;

    Ok(())
}

/// Writes both tables into the run directory and returns their paths.
pub fn persist(run_dir: &Path, records: &[QuoteRecord]) -> Result<(PathBuf, PathBuf)> {
    let csv_path = run_dir.join(CSV_FILE);
    let json_path = run_dir.join(JSON_FILE);

    write_csv(&csv_path, records)?;
    write_json(&json_path, records)?;

    Ok((csv_path, json_path))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    use super::*;

    fn record(url: &str) -> QuoteRecord {
        let mut record = QuoteRecord::unresolved(url, "shot.png".to_string(), "x".to_string());
        record.note = None;
        record
    }

    #[test]
    fn test_create_run_dir() {
        let base = tempfile::tempdir().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 9, 5, 3).unwrap();

        let run_dir = create_run_dir(base.path(), now).unwrap();
        assert_eq!(run_dir, base.path().join("20240115_090503"));
        assert!(run_dir.is_dir());
    }

    #[test]
    fn test_screenshot_path() {
        let dir = Path::new("out");
        assert_eq!(
            screenshot_path(dir, 1, "https://it.investing.com/equities/eni"),
            dir.join("001_it.investing.com__equities_eni.png")
        );
        assert_eq!(
            screenshot_path(dir, 12, "https://example.org/q?id=7#:~:text=1%2C0"),
            dir.join("012_example.org__q_id_7.png")
        );
        assert_eq!(screenshot_path(dir, 3, "%%%"), dir.join("003_page.png"));
    }

    #[test]
    fn test_screenshot_path_unique_per_position() {
        let dir = Path::new("out");
        let plain = screenshot_path(dir, 1, "https://example.org/q");
        let hinted = screenshot_path(dir, 2, "https://example.org/q#:~:text=12%2C50");
        let insecure = screenshot_path(dir, 3, "http://example.org/q");

        assert_ne!(plain, hinted);
        assert_ne!(plain, insecure);
        assert_ne!(hinted, insecure);
    }

    #[test]
    fn test_write_error_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_error_file(dir.path(), "https://example.org/a", "timeout").unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "ERROR_https_example.org_a.txt"
        );
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("timeout"));
    }

    #[test]
    fn test_persist_keeps_missing_values() {
        let dir = tempfile::tempdir().unwrap();
        let mut full = record("https://example.org/a");
        full.name = Some("Eni".to_string());
        full.price = Some(dec!(14.386));
        let empty = record("https://example.org/b");

        let (csv_path, json_path) = persist(dir.path(), &[full, empty]).unwrap();

        let csv = fs::read_to_string(csv_path).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], COLUMNS.join(","));
        assert!(lines[1].starts_with("https://example.org/a,example.org,Eni,14.386,,,shot.png,"));
        assert!(lines[2].starts_with("https://example.org/b,example.org,,,,,shot.png,"));

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(json_path).unwrap()).unwrap();
        let rows = json.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["price"], "14.386");
        assert!(rows[1]["price"].is_null());
        assert!(rows[1]["observed_at"].is_null());
        assert!(rows[1].get("note").is_some());
    }

    #[test]
    fn test_empty_csv_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CSV_FILE);

        write_csv(&path, &[]).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap().trim_end(), COLUMNS.join(","));
    }
}
