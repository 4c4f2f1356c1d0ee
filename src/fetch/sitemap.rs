//! Sitemap discovery source.
//!
//! Diffs the public sitemap for new association pages: every relevant URL is
//! observed with the value "listed", so a page that appears in the sitemap
//! since the last run surfaces as New in the delta.

use regex::Regex;

use crate::config::Config;
use super::source::{Observation, Source, SourceKind, SourceResult};

pub struct SitemapSource;

impl Source for SitemapSource {
    fn name(&self) -> &'static str {
        "sitemap"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Sitemap
    }

    fn available(&self, config: &Config) -> bool {
        !config.sitemap_url.is_empty()
    }

    fn fetch(&self, config: &Config) -> Result<SourceResult, Box<dyn std::error::Error>> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let body = client
            .get(&config.sitemap_url)
            .send()?
            .error_for_status()?
            .text()?;

        let urls = extract_urls(&body);

        let mut result = SourceResult::empty();
        for url in &urls {
            if let Some(area) = relevant_area(url, config) {
                result.observations.push(Observation {
                    kind: SourceKind::Sitemap,
                    key: url.clone(),
                    value: "listed".to_string(),
                    label: Some(area.to_string()),
                });
            }
        }

        result.diagnostics.push(format!(
            "sitemap: total={} relevant={}",
            urls.len(),
            result.observations.len()
        ));

        Ok(result)
    }
}

/// Pull URLs out of the sitemap body. The page can be XML-ish or HTML:
/// prefer `<loc>` entries, fall back to hrefs.
pub fn extract_urls(body: &str) -> Vec<String> {
    let loc_re = Regex::new(r"<loc>\s*(https?://[^<\s]+)\s*</loc>").unwrap();

    let mut urls: Vec<String> = loc_re
        .captures_iter(body)
        .map(|c| c[1].to_string())
        .collect();

    if urls.is_empty() {
        let href_re = Regex::new(r#"href\s*=\s*["'](https?://[^"']+)["']"#).unwrap();
        urls = href_re
            .captures_iter(body)
            .map(|c| c[1].to_string())
            .collect();
    }

    urls.sort();
    urls.dedup();
    urls
}

/// Association pages carry their postcode in the path:
/// `/da/foreninger/<postcode>-<slug>/...`. Returns the configured area label
/// covering that postcode, or None for out-of-scope pages.
pub fn relevant_area<'a>(url: &str, config: &'a Config) -> Option<&'a str> {
    let forening_re = Regex::new(r"(?i)/da/foreninger/(\d{4})-[^/]+").unwrap();

    let caps = forening_re.captures(url)?;
    let postcode: u32 = caps[1].parse().ok()?;
    config.area_for_postcode(postcode)
}
