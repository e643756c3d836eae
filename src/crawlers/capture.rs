use crate::filter::NormalizedUrl;
use crate::parsers;
use crate::render::{PageRenderer, RenderError, RenderedPage};
use crate::results::CaptureRecord;
use crate::utils::screenshot_filename;
use chrono::Utc;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Error recorded when navigation or readiness does not finish in time
pub const READINESS_TIMEOUT_MESSAGE: &str = "Timeout waiting for page readiness";

/// Page name used for the site root when nothing better is available
pub const ROOT_PAGE_NAME: &str = "home";

/// Directory name of the screenshots, relative to the output directory
pub const SCREENSHOTS_DIR: &str = "screenshots";

/// Per-run settings for the capture step
#[derive(Debug, Clone, Copy)]
pub struct CaptureOptions<'a> {
    pub screenshots_dir: &'a Path,
    pub ready_selector: Option<&'a str>,
    pub timeout: Duration,
}

struct Captured {
    page_name: String,
    title: String,
    screenshot_file: String,
}

/// Renders `url` in a fresh page and screenshots it as the `index`-th capture.
///
/// Never fails: renderer errors end up in a `fail` record. The page session
/// is closed on every path before returning.
pub async fn capture_page(
    renderer: &dyn PageRenderer,
    index: usize,
    url: &NormalizedUrl,
    options: &CaptureOptions<'_>,
) -> CaptureRecord {
    let captured_at = Utc::now();

    let result = match renderer.new_page().await {
        Ok(mut page) => {
            let result = render_and_capture(page.as_mut(), index, url, options).await;
            if let Err(e) = page.close().await {
                ::log::warn!("Failed to close page for {}: {}", url, e);
            }
            result
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(captured) => CaptureRecord::success(
            url.to_string(),
            captured.page_name,
            captured.title,
            captured.screenshot_file,
            captured_at,
        ),
        Err(e) if e.is_timeout() => {
            ::log::debug!("Readiness timeout for {}: {}", url, e);
            CaptureRecord::failure(
                url.to_string(),
                READINESS_TIMEOUT_MESSAGE.to_string(),
                captured_at,
            )
        }
        Err(e) => {
            ::log::error!("Failed to capture {}: {}", url, e);
            CaptureRecord::failure(url.to_string(), e.to_string(), captured_at)
        }
    }
}

async fn render_and_capture(
    page: &mut dyn RenderedPage,
    index: usize,
    url: &NormalizedUrl,
    options: &CaptureOptions<'_>,
) -> Result<Captured, RenderError> {
    page.goto(url.as_str(), options.timeout).await?;
    page.wait_ready(options.ready_selector, options.timeout).await?;

    let page_name = resolve_page_name(page, url.as_str()).await;
    let title = page.title().await?;

    let filename = screenshot_filename(index, &page_name);
    let path = options.screenshots_dir.join(&filename);
    page.screenshot(&path).await?;

    Ok(Captured {
        page_name,
        title,
        screenshot_file: format!("{SCREENSHOTS_DIR}/{filename}"),
    })
}

/// Visible `h1`, then the title, then the last path segment, then `home`.
///
/// Errors while reading the heading or title only move on to the next source.
pub async fn resolve_page_name(page: &mut dyn RenderedPage, url: &str) -> String {
    match page.visible_heading().await {
        Ok(Some(heading)) if !heading.trim().is_empty() => return heading.trim().to_string(),
        Ok(_) => {}
        Err(e) => ::log::debug!("Could not read heading of {}: {}", url, e),
    }

    match page.title().await {
        Ok(title) if !title.trim().is_empty() => return title.trim().to_string(),
        Ok(_) => {}
        Err(e) => ::log::debug!("Could not read title of {}: {}", url, e),
    }

    path_page_name(url)
}

/// Last non-empty path segment of `url`, or `home` for the root
pub fn path_page_name(url: &str) -> String {
    let path = Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_default();

    path.trim_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or(ROOT_PAGE_NAME)
        .to_string()
}

/// Re-renders `url` in its own page and lists its anchor hrefs.
///
/// Any renderer failure yields an empty list; the capture record of the page
/// is already final at this point.
pub async fn discover_links(
    renderer: &dyn PageRenderer,
    url: &NormalizedUrl,
    timeout: Duration,
) -> Vec<String> {
    let mut page = match renderer.new_page().await {
        Ok(page) => page,
        Err(e) => {
            ::log::debug!("Link discovery skipped for {}: {}", url, e);
            return Vec::new();
        }
    };

    let links = match read_links(page.as_mut(), url, timeout).await {
        Ok(links) => {
            ::log::info!("Found {} links in {}", links.len(), url);
            links
        }
        Err(e) => {
            ::log::debug!("Link discovery failed for {}: {}", url, e);
            Vec::new()
        }
    };

    if let Err(e) = page.close().await {
        ::log::warn!("Failed to close page for {}: {}", url, e);
    }
    links
}

async fn read_links(
    page: &mut dyn RenderedPage,
    url: &NormalizedUrl,
    timeout: Duration,
) -> Result<Vec<String>, RenderError> {
    page.goto(url.as_str(), timeout).await?;
    let html = page.content().await?;
    Ok(parsers::extract_links(&html))
}
