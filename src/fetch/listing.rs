//! Listing open/closed watch.
//!
//! Checks each watched association page for a signup link to the booking
//! app. Values: "open" (signup link present), "closed" (page up, no signup
//! link), "gone" (HTTP 404/410). A closed page that opens shows up as
//! Changed(closed -> open) in the delta.

use regex::Regex;
use reqwest::StatusCode;

use crate::config::{self, Config};
use super::source::{Observation, Source, SourceKind, SourceResult};

pub const STATUS_OPEN: &str = "open";
pub const STATUS_CLOSED: &str = "closed";
pub const STATUS_GONE: &str = "gone";

pub struct ListingSource;

impl Source for ListingSource {
    fn name(&self) -> &'static str {
        "listings"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Listing
    }

    fn available(&self, config: &Config) -> bool {
        config.watch_file.is_some()
    }

    fn fetch(&self, config: &Config) -> Result<SourceResult, Box<dyn std::error::Error>> {
        let watch_file = config
            .watch_file
            .as_ref()
            .ok_or("listing source requires a watch_file")?;
        let urls = config::read_watch_urls(watch_file)?;

        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let mut result = SourceResult::empty();

        for url in urls {
            let response = match client.get(&url).send() {
                Ok(r) => r,
                Err(e) => {
                    // transient failure: keep last known state for this URL
                    result.diagnostics.push(format!("fetch failed for {url}: {e}"));
                    result.unobserved.push(url);
                    continue;
                }
            };

            let status = response.status();
            let value = if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
                STATUS_GONE
            } else {
                let html = response.text().unwrap_or_default();
                if page_is_open(&html) {
                    STATUS_OPEN
                } else {
                    STATUS_CLOSED
                }
            };

            result.observations.push(Observation {
                kind: SourceKind::Listing,
                key: url,
                value: value.to_string(),
                label: None,
            });
        }

        Ok(result)
    }
}

/// A listing is open when the page links to the booking app.
///
/// Primary signal: a "Tilmeld" (signup) anchor pointing at app.waitly.dk/eu.
/// Fallback: any mention of the booking app host, since some pages render the
/// link without the visible signup text.
pub fn page_is_open(html: &str) -> bool {
    let anchor_re = Regex::new(r#"(?is)<a\b[^>]*href\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a>"#).unwrap();

    for caps in anchor_re.captures_iter(html) {
        let href = caps[1].to_lowercase();
        let text = caps[2].to_lowercase();
        if text.contains("tilmeld") && (href.contains("app.waitly.dk") || href.contains("app.waitly.eu")) {
            return true;
        }
    }

    let lower = html.to_lowercase();
    lower.contains("app.waitly.dk") || lower.contains("app.waitly.eu")
}
