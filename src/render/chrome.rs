use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use base64::{prelude::BASE64_STANDARD, Engine as _};
use headless_chrome::{protocol::cdp::Page, Browser, LaunchOptions, Tab};
use tokio::task;

use crate::{config::Viewport, logging, render::PageRenderer};

/// Chrome 閒置超過此時間會自行結束
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(600);

/// Clicks the first consent button it finds, by selector first and then by
/// button caption. Evaluates to `true` when something was clicked.
const DISMISS_COOKIE_BANNER_JS: &str = r##"
(() => {
    const selectors = [
        "[id*='onetrust-accept']",
        "#didomi-notice-agree-button",
        "[aria-label*='accept' i]",
        "[data-testid*='accept']",
    ];
    for (const selector of selectors) {
        const el = document.querySelector(selector);
        if (el && el.offsetParent !== null) {
            el.click();
            return true;
        }
    }
    const captions = ["accept", "accetta", "i agree", "agree", "accepter", "akzeptieren"];
    for (const button of document.querySelectorAll("button")) {
        const text = (button.innerText || "").trim().toLowerCase();
        if (button.offsetParent !== null && captions.some((c) => text.startsWith(c))) {
            button.click();
            return true;
        }
    }
    return false;
})()
"##;

const PAGE_HEIGHT_JS: &str =
    "Math.max(document.body ? document.body.scrollHeight : 0, document.documentElement.scrollHeight)";

#[derive(Debug, Clone)]
pub struct ChromeOptions {
    pub viewport: Viewport,
    /// navigation and element wait timeout
    pub timeout: Duration,
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
}

/// One Chrome process with a single tab reused for every URL.
pub struct ChromeRenderer {
    // 保持 browser 存活，drop 時 Chrome 會被關閉
    _browser: Browser,
    tab: Arc<Tab>,
    viewport: Viewport,
}

impl ChromeRenderer {
    /// Starts Chrome. This blocks; call it from `spawn_blocking`.
    pub fn launch(options: ChromeOptions) -> Result<Self> {
        let launch_options = LaunchOptions::default_builder()
            .headless(options.headless)
            .sandbox(false)
            .window_size(Some((options.viewport.width, options.viewport.height)))
            .path(options.chrome_path.clone())
            .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
            .build()
            .map_err(|why| anyhow!("Failed to build the Chrome launch options because {:?}", why))?;

        let browser = Browser::new(launch_options)?;
        let tab = browser.new_tab()?;
        tab.set_default_timeout(options.timeout);

        logging::info_file_async(format!(
            "Chrome started (headless: {}, viewport: {}, timeout: {:?})",
            options.headless, options.viewport, options.timeout
        ));

        Ok(ChromeRenderer {
            _browser: browser,
            tab,
            viewport: options.viewport,
        })
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn open(&self, url: &str) -> Result<()> {
        let tab = Arc::clone(&self.tab);
        let url = url.to_string();

        task::spawn_blocking(move || -> Result<()> {
            tab.navigate_to(&url)?.wait_until_navigated()?;
            dismiss_cookie_banner(&tab, &url);
            Ok(())
        })
        .await?
    }

    async fn snapshot(&self, screenshot_path: &Path) -> Result<String> {
        let tab = Arc::clone(&self.tab);
        let path = screenshot_path.to_path_buf();
        let width = self.viewport.width;

        task::spawn_blocking(move || -> Result<String> {
            let png = capture_full_page(&tab, width)?;
            fs::write(&path, png).map_err(|why| {
                anyhow!("Failed to write the screenshot {} because {:?}", path.display(), why)
            })?;
            Ok(tab.get_content()?)
        })
        .await?
    }
}

fn dismiss_cookie_banner(tab: &Tab, url: &str) {
    match tab.evaluate(DISMISS_COOKIE_BANNER_JS, false) {
        Ok(result) => {
            if result.value.and_then(|v| v.as_bool()).unwrap_or(false) {
                logging::debug_file_async(format!("Cookie banner dismissed on {}", url));
            }
        }
        Err(why) => {
            logging::debug_file_async(format!(
                "Failed to dismiss the cookie banner on {} because {:?}",
                url, why
            ));
        }
    }
}

fn capture_full_page(tab: &Tab, width: u32) -> Result<Vec<u8>> {
    let height = tab
        .evaluate(PAGE_HEIGHT_JS, false)?
        .value
        .and_then(|v| v.as_f64())
        .filter(|h| *h > 0.0);

    let data = tab.call_method(full_page_request(width, height))?.data;
    decode_png(&data)
}

/// 超出視窗的部分也要繪製，否則只會得到第一屏
fn full_page_request(width: u32, height: Option<f64>) -> Page::CaptureScreenshot {
    let clip = height.map(|height| Page::Viewport {
        x: 0.0,
        y: 0.0,
        width: width as f64,
        height,
        scale: 1.0,
    });

    Page::CaptureScreenshot {
        format: Some(Page::CaptureScreenshotFormatOption::Png),
        quality: None,
        clip,
        from_surface: Some(true),
        capture_beyond_viewport: Some(true),
        optimize_for_speed: None,
    }
}

fn decode_png(data: &str) -> Result<Vec<u8>> {
    BASE64_STANDARD
        .decode(data)
        .map_err(|why| anyhow!("Failed to decode the screenshot because {:?}", why))
}
