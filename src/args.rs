use clap::{Parser, ValueEnum};
use site_shot::config::{Browser, ConfigError, CrawlConfig, Viewport};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "site-shot")]
#[command(about = "Crawls a website and captures a full-page screenshot of every page")]
#[command(version)]
pub struct Args {
    /// URL to start crawling from; also bounds the crawl to its host
    #[arg(long, required_unless_present = "config")]
    pub start_url: Option<String>,

    /// Output directory [default: output]
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Maximum number of pages to capture [default: 100]
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Sitemap URL to seed the crawl from (disables link discovery)
    #[arg(long)]
    pub sitemap: Option<String>,

    /// Selector scoping navigation links (reserved, not enforced)
    #[arg(long)]
    pub nav_selector: Option<String>,

    /// CSS selector that must be present before a page is captured
    #[arg(long)]
    pub ready_selector: Option<String>,

    /// Browser viewport as WIDTHxHEIGHT [default: 1440x900]
    #[arg(long)]
    pub viewport: Option<Viewport>,

    /// Per-page timeout in seconds [default: 45]
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Emulate a mobile device
    #[arg(long)]
    pub mobile: bool,

    /// Override the browser user agent
    #[arg(long)]
    pub user_agent: Option<String>,

    /// WebDriver endpoint [default: http://localhost:4444, env: WEBDRIVER_URL]
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Browser behind the WebDriver endpoint [default: chrome]
    #[arg(long, value_enum)]
    pub browser: Option<BrowserArg>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub headed: bool,

    /// JSON configuration file; flags given on the command line take precedence
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Exit with status 2 when any page failed to capture
    #[arg(long)]
    pub strict: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum BrowserArg {
    Chrome,
    Firefox,
}

/// Convert from CLI argument browser to the configured browser
pub fn convert_browser(arg: BrowserArg) -> Browser {
    match arg {
        BrowserArg::Chrome => Browser::Chrome,
        BrowserArg::Firefox => Browser::Firefox,
    }
}

impl Args {
    /// Builds the crawl configuration: config file (if any), then the
    /// environment, then explicit command-line flags
    pub fn to_config(&self) -> Result<CrawlConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => CrawlConfig::from_file(path)?,
            None => CrawlConfig::new(self.start_url.as_deref().unwrap_or_default()),
        };
        config.apply_env();

        if let Some(start_url) = &self.start_url {
            config.start_url = start_url.clone();
        }
        if let Some(out_dir) = &self.out_dir {
            config.out_dir = out_dir.clone();
        }
        if let Some(max_pages) = self.max_pages {
            config.max_pages = max_pages;
        }
        if self.sitemap.is_some() {
            config.sitemap = self.sitemap.clone();
        }
        if self.nav_selector.is_some() {
            config.nav_selector = self.nav_selector.clone();
        }
        if self.ready_selector.is_some() {
            config.ready_selector = self.ready_selector.clone();
        }
        if let Some(viewport) = self.viewport {
            config.viewport = viewport;
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }
        if self.mobile {
            config.mobile = true;
        }
        if self.user_agent.is_some() {
            config.user_agent = self.user_agent.clone();
        }
        if let Some(webdriver_url) = &self.webdriver_url {
            config.webdriver_url = webdriver_url.clone();
        }
        if let Some(browser) = self.browser {
            config.browser = convert_browser(browser);
        }
        if self.headed {
            config.headless = false;
        }

        Ok(config)
    }
}
