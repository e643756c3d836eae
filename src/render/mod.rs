//! The page-rendering capability the crawl core depends on.
//!
//! A [`PageRenderer`] hands out short-lived [`RenderedPage`] sessions. The
//! crawler opens one session per capture and one per link-discovery pass and
//! always closes it before moving on to the next URL.

pub mod webdriver;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use webdriver::WebDriverRenderer;

/// Failures raised by a renderer
#[derive(Debug, Error)]
pub enum RenderError {
    /// Navigation or a readiness condition did not finish in time
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Page(String),

    #[error(transparent)]
    WebDriver(#[from] fantoccini::error::CmdError),

    #[error("failed to start browser session: {0}")]
    Session(#[from] fantoccini::error::NewSessionError),

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl RenderError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RenderError::Timeout(_))
    }
}

/// Factory for page sessions, alive for the whole run
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Open a fresh browsing context
    async fn new_page(&self) -> Result<Box<dyn RenderedPage>, RenderError>;

    /// Release the renderer once the crawl is over
    async fn shutdown(&self) -> Result<(), RenderError> {
        Ok(())
    }
}

/// A single browsing context
#[async_trait]
pub trait RenderedPage: Send {
    /// Navigate to `url`, failing with [`RenderError::Timeout`] after `timeout`
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<(), RenderError>;

    /// Wait for network idle and, if given, for `selector` to be present
    async fn wait_ready(
        &mut self,
        selector: Option<&str>,
        timeout: Duration,
    ) -> Result<(), RenderError>;

    /// Text of the first `h1` on the page when it is visible
    async fn visible_heading(&mut self) -> Result<Option<String>, RenderError>;

    async fn title(&mut self) -> Result<String, RenderError>;

    /// Write a full-page PNG screenshot to `path`
    async fn screenshot(&mut self, path: &Path) -> Result<(), RenderError>;

    /// Serialized rendered DOM
    async fn content(&mut self) -> Result<String, RenderError>;

    async fn close(self: Box<Self>) -> Result<(), RenderError>;
}
