use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

/// headless Chrome 實作
pub mod chrome;

/// Drives a browser page for the batch.
///
/// `open` is always followed by `snapshot` for the same URL, after the settle
/// delay. Navigation timeouts are the renderer's own business and surface as
/// errors like any other failure.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Loads `url` and dismisses cookie banners on a best-effort basis.
    async fn open(&self, url: &str) -> Result<()>;

    /// Saves a full-page PNG to `screenshot_path` and returns the rendered HTML.
    async fn snapshot(&self, screenshot_path: &Path) -> Result<String>;
}
