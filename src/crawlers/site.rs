use crate::config::CrawlConfig;
use crate::crawlers::capture::{self, CaptureOptions};
use crate::error::CrawlError;
use crate::filter::{NormalizedUrl, UrlFilter, normalize_url};
use crate::frontier::Frontier;
use crate::render::PageRenderer;
use crate::results::{CaptureRecord, Manifest};
use crate::runlog::RunLog;
use crate::sitemap;
use std::time::Instant;

/// Crawls a site breadth-first, one page at a time, and returns the manifest.
///
/// The frontier is seeded from the sitemap when one is configured (and link
/// discovery is skipped), otherwise from the start URL. The loop stops when
/// the frontier runs dry or `max_pages` captures were attempted. Page-level
/// failures are recorded and never abort the run.
///
/// # Arguments
///
/// * `config` - crawl configuration
/// * `renderer` - page renderer used for captures and link discovery
/// * `http` - client used to fetch the sitemap
/// * `log` - run log receiving one line per capture
pub async fn crawl(
    config: &CrawlConfig,
    renderer: &dyn PageRenderer,
    http: &reqwest::Client,
    log: &mut RunLog,
) -> Result<Manifest, CrawlError> {
    let started = Instant::now();

    let root = normalize_url(&config.start_url, None, false)
        .ok_or_else(|| CrawlError::InvalidStartUrl(config.start_url.clone()))?;
    let url_filter = UrlFilter::new(root.clone());
    let timeout = config.page_timeout();
    let screenshots_dir = config.screenshots_dir();
    let options = CaptureOptions {
        screenshots_dir: &screenshots_dir,
        ready_selector: config.ready_selector.as_deref(),
        timeout,
    };

    let frontier = seed_frontier(config, &root, http, log).await;
    let discover = config.sitemap.is_none();
    if let Some(nav_selector) = &config.nav_selector {
        ::log::debug!("Navigation selector {} is accepted but not enforced", nav_selector);
    }

    let records = drain(frontier, &url_filter, renderer, &options, config, discover, log).await;

    Ok(Manifest::new(records, started.elapsed()))
}

/// Fills the frontier from the sitemap, or with the start URL alone
async fn seed_frontier(
    config: &CrawlConfig,
    root: &NormalizedUrl,
    http: &reqwest::Client,
    log: &mut RunLog,
) -> Frontier {
    let mut frontier = Frontier::new();

    match &config.sitemap {
        Some(sitemap_url) => {
            let entries = sitemap::load_sitemap(http, sitemap_url, config.page_timeout()).await;
            if entries.is_empty() {
                log.warn(&format!(
                    "Sitemap {} produced no URLs, nothing will be captured",
                    sitemap_url
                ));
            }
            // Sitemap entries are taken as they are; only normalization applies
            for entry in entries {
                frontier.enqueue(normalize_url(&entry, None, false));
            }
        }
        None => {
            frontier.enqueue(Some(root.clone()));
        }
    }

    ::log::info!("Seeded frontier with {} URLs", frontier.pending());
    frontier
}

async fn drain(
    mut frontier: Frontier,
    url_filter: &UrlFilter,
    renderer: &dyn PageRenderer,
    options: &CaptureOptions<'_>,
    config: &CrawlConfig,
    discover: bool,
    log: &mut RunLog,
) -> Vec<CaptureRecord> {
    let mut records = Vec::new();

    while !frontier.is_exhausted_or_bounded(config.max_pages, records.len()) {
        let Some(url) = frontier.dequeue() else {
            break;
        };
        if !url_filter.should_crawl(&url) {
            ::log::debug!("Skipping URL outside {}: {}", url_filter.root().origin(), url);
            continue;
        }

        let index = records.len() + 1;
        let record = capture::capture_page(renderer, index, &url, options).await;
        log.info(&format!("[{}] {} -> {}", index, url, record.status.as_str()));
        records.push(record);

        if !discover {
            continue;
        }

        let mut queued = 0;
        for href in capture::discover_links(renderer, &url, options.timeout).await {
            if let Some(link) = url_filter.resolve_link(&href, &url) {
                if frontier.enqueue(Some(link)) {
                    queued += 1;
                }
            }
        }
        ::log::debug!(
            "Queued {} new links from {}, {} pending",
            queued,
            url,
            frontier.pending()
        );
    }

    if frontier.pending() > 0 {
        ::log::info!(
            "Page limit of {} reached with {} URLs left in the frontier",
            config.max_pages,
            frontier.pending()
        );
    }

    records
}
