#![allow(clippy::too_many_arguments)]

// Re-export modules
pub mod config;
pub mod crawlers;
pub mod error;
pub mod filter;
pub mod frontier;
pub mod manifest;
pub mod parsers;
pub mod render;
pub mod results;
pub mod runlog;
pub mod sitemap;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::CrawlConfig;
pub use error::CrawlError;
pub use results::{CaptureRecord, CaptureStatus, RunSummary};

use config::ConfigError;
use render::{PageRenderer, WebDriverRenderer};
use runlog::RunLog;
use std::path::{Path, PathBuf};

/// Main builder for a screenshot crawl
pub struct SiteShot {
    config: CrawlConfig,
}

impl SiteShot {
    /// Create a new SiteShot builder crawling from `start_url`
    pub fn new(start_url: &str) -> Self {
        Self {
            config: CrawlConfig::new(start_url),
        }
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: CrawlConfig) -> Self {
        self.config = config;
        self
    }

    /// Load configuration from a file
    pub fn with_config_file(self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = CrawlConfig::from_file(path)?;
        Ok(self.with_config(config))
    }

    /// Set the directory receiving screenshots, manifest and run log
    pub fn with_out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.config.out_dir = out_dir.into();
        self
    }

    /// Set the maximum number of pages to capture
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    /// Seed the crawl from a sitemap instead of following links
    pub fn with_sitemap(mut self, sitemap_url: &str) -> Self {
        self.config.sitemap = Some(sitemap_url.to_string());
        self
    }

    /// Require a selector to be present before capturing
    pub fn with_ready_selector(mut self, selector: &str) -> Self {
        self.config.ready_selector = Some(selector.to_string());
        self
    }

    /// Set the per-page timeout
    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.config.timeout_secs = timeout_seconds;
        self
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Start a browser session through WebDriver and run the crawl
    pub async fn run(self) -> Result<RunSummary, CrawlError> {
        prepare_output(&self.config)?;
        let log_path = self.config.log_path();
        let mut log = RunLog::create(&log_path)
            .map_err(|source| CrawlError::OutputDir {
                path: log_path,
                source,
            })?;

        let renderer = WebDriverRenderer::connect(&self.config).await?;
        let result = self.crawl_and_record(&renderer, &mut log).await;

        if let Err(e) = renderer.shutdown().await {
            ::log::warn!("Failed to close browser session: {}", e);
        }
        result
    }

    /// Run the crawl against an already started renderer and write the manifest
    pub async fn run_with_renderer(
        &self,
        renderer: &dyn PageRenderer,
        log: &mut RunLog,
    ) -> Result<RunSummary, CrawlError> {
        prepare_output(&self.config)?;
        self.crawl_and_record(renderer, log).await
    }

    async fn crawl_and_record(
        &self,
        renderer: &dyn PageRenderer,
        log: &mut RunLog,
    ) -> Result<RunSummary, CrawlError> {
        let mut http = reqwest::Client::builder().timeout(self.config.page_timeout());
        if let Some(user_agent) = &self.config.user_agent {
            http = http.user_agent(user_agent.clone());
        }
        let http = http.build()?;

        let manifest = crawlers::crawl(&self.config, renderer, &http, log).await?;

        let manifest_path = self.config.manifest_path();
        manifest::write_manifest(&manifest_path, &manifest.records).map_err(|source| {
            CrawlError::Manifest {
                path: manifest_path.clone(),
                source,
            }
        })?;

        let summary = manifest.summary;
        log.info(&format!(
            "FINISHED | total={} success={} failed={} elapsed={:.2}s",
            summary.total,
            summary.success,
            summary.failed,
            summary.elapsed.as_secs_f64()
        ));
        Ok(summary)
    }
}

/// Create the output and screenshot directories
pub fn prepare_output(config: &CrawlConfig) -> Result<(), CrawlError> {
    let screenshots_dir = config.screenshots_dir();
    std::fs::create_dir_all(&screenshots_dir).map_err(|source| CrawlError::OutputDir {
        path: screenshots_dir,
        source,
    })
}
