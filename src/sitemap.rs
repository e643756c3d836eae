//! Sitemap seeding: fetch an XML sitemap and list its `<loc>` entries.

use std::time::Duration;

use quick_xml::Reader;
use quick_xml::events::Event as XmlEvent;
use reqwest::{Client, StatusCode};
use thiserror::Error;

/// Why a sitemap could not be turned into a seed list
#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid sitemap xml: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Fetches and parses a sitemap, reporting why it failed.
pub async fn fetch_sitemap(
    client: &Client,
    url: &str,
    timeout: Duration,
) -> Result<Vec<String>, SitemapError> {
    let fetch = async {
        let response = client.get(url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(SitemapError::Status(response.status()));
        }
        Ok::<_, SitemapError>(response.text().await?)
    };

    let xml = tokio::time::timeout(timeout, fetch)
        .await
        .map_err(|_| SitemapError::Timeout(timeout))??;

    parse_sitemap(&xml)
}

/// Best-effort seed source: any failure yields an empty list.
///
/// The reason is logged but never surfaced to the caller.
pub async fn load_sitemap(client: &Client, url: &str, timeout: Duration) -> Vec<String> {
    match fetch_sitemap(client, url, timeout).await {
        Ok(urls) => {
            ::log::info!("Loaded {} URLs from sitemap {}", urls.len(), url);
            urls
        }
        Err(e) => {
            ::log::warn!("Ignoring sitemap {}: {}", url, e);
            Vec::new()
        }
    }
}

/// Collects the text of every `<loc>` element, whatever its namespace prefix.
///
/// Values are trimmed but otherwise returned verbatim. Malformed XML fails the
/// whole document; no partial list is returned.
pub fn parse_sitemap(xml: &str) -> Result<Vec<String>, SitemapError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut in_loc = false;
    let mut current = String::new();
    let mut locs = Vec::new();

    loop {
        match reader.read_event()? {
            XmlEvent::Start(e) if e.local_name().as_ref() == b"loc" => {
                in_loc = true;
                current.clear();
            }
            XmlEvent::End(e) if e.local_name().as_ref() == b"loc" => {
                in_loc = false;
                let value = current.trim();
                if !value.is_empty() {
                    locs.push(value.to_string());
                }
            }
            XmlEvent::Text(t) if in_loc => {
                current.push_str(&t.unescape()?);
            }
            XmlEvent::CData(t) if in_loc => {
                current.push_str(&String::from_utf8_lossy(&t.into_inner()));
            }
            XmlEvent::Eof => break,
            _ => {}
        }
    }

    Ok(locs)
}
