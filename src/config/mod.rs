use std::{env, fmt, path::PathBuf, str::FromStr};

use anyhow::{anyhow, Result};
use config::{Config as config_config, File as config_file};
use serde::{Deserialize, Serialize};

const CONFIG_PATH: &str = "app.json";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct App {
    /// urls.csv (url,name_sel,price_sel,change_sel,datetime_sel) or urls.txt
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub browser: Browser,
}

const WEBSHOT_INPUT: &str = "WEBSHOT_INPUT";
const WEBSHOT_OUTPUT_DIR: &str = "WEBSHOT_OUTPUT_DIR";
const WEBSHOT_PERSIST: &str = "WEBSHOT_PERSIST";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Output {
    /// 輸出的根目錄，每次執行會在底下建立一個時間戳記目錄
    #[serde(default = "default_output_dir")]
    pub dir: String,
    /// false 時只輸出到 console，不寫入 csv/json
    #[serde(default = "default_true")]
    pub persist: bool,
}

impl Default for Output {
    fn default() -> Self {
        Output {
            dir: default_output_dir(),
            persist: true,
        }
    }
}

const WEBSHOT_VIEWPORT: &str = "WEBSHOT_VIEWPORT";
const WEBSHOT_DELAY_MS: &str = "WEBSHOT_DELAY_MS";
const WEBSHOT_TIMEOUT_MS: &str = "WEBSHOT_TIMEOUT_MS";
const WEBSHOT_HEADLESS: &str = "WEBSHOT_HEADLESS";
const WEBSHOT_CHROME_PATH: &str = "WEBSHOT_CHROME_PATH";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Browser {
    /// "1366x768"
    #[serde(default = "default_viewport")]
    pub viewport: String,
    /// settle delay between page load and extraction
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_true")]
    pub headless: bool,
    /// empty: let headless_chrome locate the binary
    #[serde(default)]
    pub chrome_path: String,
}

impl Default for Browser {
    fn default() -> Self {
        Browser {
            viewport: default_viewport(),
            delay_ms: default_delay_ms(),
            timeout_ms: default_timeout_ms(),
            headless: true,
            chrome_path: String::new(),
        }
    }
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_viewport() -> String {
    "1366x768".to_string()
}

fn default_delay_ms() -> u64 {
    1500
}

fn default_timeout_ms() -> u64 {
    45000
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl FromStr for Viewport {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        let (w, h) = lower
            .split_once('x')
            .ok_or_else(|| anyhow!("The viewport '{}' is not in WIDTHxHEIGHT form", s))?;
        let width = u32::from_str(w.trim())
            .map_err(|why| anyhow!("Failed to parse viewport width '{}' because {:?}", w, why))?;
        let height = u32::from_str(h.trim())
            .map_err(|why| anyhow!("Failed to parse viewport height '{}' because {:?}", h, why))?;

        if width == 0 || height == 0 {
            return Err(anyhow!("The viewport '{}' must not be empty", s));
        }

        Ok(Viewport { width, height })
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl App {
    /// Reads `app.json` when it exists, then lets the environment override it.
    pub fn get() -> Result<Self> {
        let config_path = config_path();
        if config_path.exists() {
            let config: App = config_config::builder()
                .add_source(config_file::from(config_path))
                .build()?
                .try_deserialize()?;
            return Ok(config.override_with_env());
        }

        Ok(App::default().override_with_env())
    }

    /// 將來至於 env 的設定值覆蓋掉 json 上的設定值
    fn override_with_env(mut self) -> Self {
        if let Ok(input) = env::var(WEBSHOT_INPUT) {
            self.input = input;
        }

        if let Ok(dir) = env::var(WEBSHOT_OUTPUT_DIR) {
            self.output.dir = dir;
        }

        if let Ok(persist) = env::var(WEBSHOT_PERSIST) {
            self.output.persist = parse_bool(&persist).unwrap_or(self.output.persist);
        }

        if let Ok(viewport) = env::var(WEBSHOT_VIEWPORT) {
            self.browser.viewport = viewport;
        }

        if let Ok(delay) = env::var(WEBSHOT_DELAY_MS) {
            self.browser.delay_ms = u64::from_str(delay.trim()).unwrap_or(self.browser.delay_ms);
        }

        if let Ok(timeout) = env::var(WEBSHOT_TIMEOUT_MS) {
            self.browser.timeout_ms =
                u64::from_str(timeout.trim()).unwrap_or(self.browser.timeout_ms);
        }

        if let Ok(headless) = env::var(WEBSHOT_HEADLESS) {
            self.browser.headless = parse_bool(&headless).unwrap_or(self.browser.headless);
        }

        if let Ok(path) = env::var(WEBSHOT_CHROME_PATH) {
            self.browser.chrome_path = path;
        }

        self
    }

    /// Checks everything the run needs before any page is visited.
    pub fn validate(&self) -> Result<()> {
        if self.input.trim().is_empty() {
            return Err(anyhow!("No input file was given (--input or {})", WEBSHOT_INPUT));
        }

        if self.output.dir.trim().is_empty() {
            return Err(anyhow!("The output directory must not be empty"));
        }

        self.viewport()?;
        Ok(())
    }

    pub fn viewport(&self) -> Result<Viewport> {
        Viewport::from_str(&self.browser.viewport)
    }

    pub fn chrome_path(&self) -> Option<PathBuf> {
        let path = self.browser.chrome_path.trim();
        if path.is_empty() {
            None
        } else {
            Some(PathBuf::from(path))
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// 回傳設定檔的路徑
fn config_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_from_str() {
        let v = Viewport::from_str("1366x768").unwrap();
        assert_eq!(v, Viewport { width: 1366, height: 768 });
        assert_eq!(Viewport::from_str(" 1920X1080 ").unwrap().height, 1080);
        assert_eq!(v.to_string(), "1366x768");

        assert!(Viewport::from_str("1366").is_err());
        assert!(Viewport::from_str("0x768").is_err());
        assert!(Viewport::from_str("wide x tall").is_err());
    }

    #[test]
    fn test_defaults() {
        let app = App::default();
        assert_eq!(app.output.dir, "output");
        assert!(app.output.persist);
        assert_eq!(app.browser.delay_ms, 1500);
        assert_eq!(app.browser.timeout_ms, 45000);
        assert!(app.chrome_path().is_none());
        assert!(app.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial_json() {
        let app: App = serde_json::from_str(
            r#"{"input":"urls.csv","browser":{"viewport":"800x600","delay_ms":0}}"#,
        )
        .unwrap();

        assert_eq!(app.input, "urls.csv");
        assert_eq!(app.output.dir, "output");
        assert_eq!(app.browser.delay_ms, 0);
        assert_eq!(app.browser.timeout_ms, 45000);
        assert_eq!(app.viewport().unwrap(), Viewport { width: 800, height: 600 });
        assert!(app.validate().is_ok());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
