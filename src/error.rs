use crate::render::RenderError;
use std::path::PathBuf;
use thiserror::Error;

/// Run-level failures. Anything that goes wrong with a single page is
/// recorded in the manifest instead.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("invalid start URL: {0}")]
    InvalidStartUrl(String),

    #[error("failed to create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to start renderer: {0}")]
    Renderer(#[from] RenderError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("failed to write manifest {}: {source}", path.display())]
    Manifest {
        path: PathBuf,
        source: std::io::Error,
    },
}
