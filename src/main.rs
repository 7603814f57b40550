use std::{path::Path, time::Duration};

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use crate::{
    batch::BatchOptions,
    config::App,
    render::chrome::{ChromeOptions, ChromeRenderer},
};

pub mod batch;
pub mod config;
pub mod declare;
pub mod extract;
pub mod input;
pub mod logging;
pub mod output;
pub mod render;
pub mod util;

#[cfg(all(target_os = "linux", target_env = "musl"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Screenshots finance quote pages and extracts name, price, change and time.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// urls.csv (url,name_sel,price_sel,change_sel,datetime_sel) or urls.txt
    #[arg(short, long)]
    input: Option<String>,
    /// output root directory
    #[arg(short, long)]
    out: Option<String>,
    /// browser viewport, e.g. 1366x768
    #[arg(long)]
    viewport: Option<String>,
    /// settle delay after page load, in milliseconds
    #[arg(long)]
    delay: Option<u64>,
    /// navigation timeout, in milliseconds
    #[arg(long)]
    timeout: Option<u64>,
    /// print the records instead of writing quotes.csv/quotes.json
    #[arg(long)]
    no_persist: bool,
    /// show the browser window
    #[arg(long)]
    headed: bool,
    /// Chrome/Chromium executable
    #[arg(long)]
    chrome: Option<String>,
}

impl Args {
    /// 命令列參數優先於 app.json 與環境變數
    fn apply(self, mut app: App) -> App {
        if let Some(input) = self.input {
            app.input = input;
        }
        if let Some(out) = self.out {
            app.output.dir = out;
        }
        if let Some(viewport) = self.viewport {
            app.browser.viewport = viewport;
        }
        if let Some(delay) = self.delay {
            app.browser.delay_ms = delay;
        }
        if let Some(timeout) = self.timeout {
            app.browser.timeout_ms = timeout;
        }
        if self.no_persist {
            app.output.persist = false;
        }
        if self.headed {
            app.browser.headless = false;
        }
        if let Some(chrome) = self.chrome {
            app.browser.chrome_path = chrome;
        }
        app
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let app = Args::parse().apply(App::get()?);
    app.validate()?;
    if !app.output.persist {
        // 不寫檔時 records 以 JSON 印到 stdout
        logging::console_to_stderr(true);
    }

    let entries = input::load(Path::new(&app.input))?;
    if entries.is_empty() {
        logging::error_console(format!("No url found in {}", app.input));
        return Ok(());
    }

    let run_dir = output::create_run_dir(Path::new(&app.output.dir), Utc::now())?;
    logging::info_console(format!(
        "{} urls, saving screenshots to {}",
        entries.len(),
        run_dir.display()
    ));

    let chrome_options = ChromeOptions {
        viewport: app.viewport()?,
        timeout: Duration::from_millis(app.browser.timeout_ms),
        headless: app.browser.headless,
        chrome_path: app.chrome_path(),
    };
    let renderer = tokio::task::spawn_blocking(move || ChromeRenderer::launch(chrome_options)).await??;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            logging::info_console("Interrupted, stopping after the current page".to_string());
            ctrl_c.cancel();
        }
    });

    let options = BatchOptions {
        settle_delay: Duration::from_millis(app.browser.delay_ms),
        run_dir: run_dir.clone(),
        write_error_files: app.output.persist,
    };
    let records = batch::run(&entries, &renderer, &options, &cancel).await;

    if app.output.persist {
        let (csv_path, json_path) = output::persist(&run_dir, &records)?;
        logging::info_console(format!(
            "Saved {} and {}",
            csv_path.display(),
            json_path.display()
        ));
    } else {
        println!("{}", serde_json::to_string_pretty(&records)?);
    }

    let resolved = records.iter().filter(|r| r.price.is_some()).count();
    logging::info_file_async(format!(
        "Run finished: {}/{} urls visited, {} with a price",
        records.len(),
        entries.len(),
        resolved
    ));
    logging::info_console(format!(
        "Done: {}/{} urls visited, {} with a price",
        records.len(),
        entries.len(),
        resolved
    ));

    Ok(())
}
