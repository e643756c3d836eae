use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Viewport must be WIDTHxHEIGHT")]
    Viewport,
}

/// Browser window size in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1440,
            height: 900,
        }
    }
}

impl FromStr for Viewport {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let (w, h) = lower.split_once('x').ok_or(ConfigError::Viewport)?;
        let width = w.trim().parse().map_err(|_| ConfigError::Viewport)?;
        let height = h.trim().parse().map_err(|_| ConfigError::Viewport)?;
        if width == 0 || height == 0 {
            return Err(ConfigError::Viewport);
        }
        Ok(Self { width, height })
    }
}

impl TryFrom<String> for Viewport {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Viewport> for String {
    fn from(viewport: Viewport) -> Self {
        viewport.to_string()
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Browser driven behind the WebDriver endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chrome,
    Firefox,
}

/// Configuration for a screenshot crawl
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// URL to start crawling from; also defines the crawl origin
    pub start_url: String,

    /// Directory receiving screenshots, manifest and run log
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,

    /// Maximum number of pages to capture
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Sitemap to seed the crawl from instead of following links
    #[serde(default)]
    pub sitemap: Option<String>,

    /// CSS selector that must be present before a page is captured
    #[serde(default)]
    pub ready_selector: Option<String>,

    /// Selector scoping link discovery (accepted but not enforced)
    #[serde(default)]
    pub nav_selector: Option<String>,

    #[serde(default)]
    pub viewport: Viewport,

    /// Per-page timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Emulate a mobile device
    #[serde(default)]
    pub mobile: bool,

    #[serde(default)]
    pub user_agent: Option<String>,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(default)]
    pub browser: Browser,

    #[serde(default = "default_headless")]
    pub headless: bool,
}

/// Default value for out_dir
fn default_out_dir() -> PathBuf {
    PathBuf::from("output")
}

/// Default value for max_pages
fn default_max_pages() -> usize {
    100
}

/// Default value for timeout_secs
fn default_timeout_secs() -> u64 {
    45
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_headless() -> bool {
    true
}

impl CrawlConfig {
    /// Create a new configuration with default values
    pub fn new(start_url: &str) -> Self {
        Self {
            start_url: start_url.to_string(),
            out_dir: default_out_dir(),
            max_pages: default_max_pages(),
            sitemap: None,
            ready_selector: None,
            nav_selector: None,
            viewport: Viewport::default(),
            timeout_secs: default_timeout_secs(),
            mobile: false,
            user_agent: None,
            webdriver_url: default_webdriver_url(),
            browser: Browser::default(),
            headless: default_headless(),
        }
    }

    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut contents = String::new();
        File::open(path)
            .and_then(|mut file| file.read_to_string(&mut contents))
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Override the WebDriver URL with the WEBDRIVER_URL environment variable if set
    pub fn apply_env(&mut self) {
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                self.webdriver_url = webdriver_url;
            }
        }
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn screenshots_dir(&self) -> PathBuf {
        self.out_dir.join("screenshots")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.out_dir.join("manifest.json")
    }

    pub fn log_path(&self) -> PathBuf {
        self.out_dir.join("run.log")
    }
}
