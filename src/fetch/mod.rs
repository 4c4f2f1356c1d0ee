pub mod source;
pub mod sitemap;
pub mod listing;
pub mod positions;

use serde::Serialize;

use crate::config::Config;
use source::{Observation, Source, SourceKind, SourceResult};

#[derive(Serialize)]
pub struct FetchResult {
    pub observations: Vec<Observation>,
    pub diagnostics: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,

    /// Individual keys that could not be observed this run; the pipeline
    /// carries their previous values forward.
    #[serde(skip)]
    pub carry_keys: Vec<(SourceKind, String)>,

    /// Kinds whose whole source failed (optional sources only); the pipeline
    /// carries every previous observation of these kinds forward.
    #[serde(skip)]
    pub carry_kinds: Vec<SourceKind>,
}

impl FetchResult {
    pub fn empty() -> Self {
        FetchResult {
            observations: Vec::new(),
            diagnostics: Vec::new(),
            duration_ms: None,
            carry_keys: Vec::new(),
            carry_kinds: Vec::new(),
        }
    }

    fn merge(&mut self, kind: SourceKind, result: SourceResult) {
        self.observations.extend(result.observations);
        self.diagnostics.extend(result.diagnostics);
        self.carry_keys
            .extend(result.unobserved.into_iter().map(|key| (kind, key)));
    }
}

/// The default source set: sitemap discovery, listing open/closed watch,
/// queue positions.
pub fn default_sources() -> Vec<Box<dyn Source>> {
    vec![
        Box::new(sitemap::SitemapSource),
        Box::new(listing::ListingSource),
        Box::new(positions::PositionsSource),
    ]
}

/// Run every available source in sequence and merge what they observed.
///
/// An error from a required source aborts the whole run so nothing gets
/// persisted on partial data. An optional source's error degrades to a
/// diagnostic plus a carry-over marker for its kind.
pub fn run(config: &Config, sources: &[Box<dyn Source>]) -> Result<FetchResult, Box<dyn std::error::Error>> {
    let start = std::time::Instant::now();
    let mut fetch_result = FetchResult::empty();

    for source in sources {
        if !source.available(config) {
            let msg = format!("{}: skipped (not configured)", source.name());
            fetch_result.diagnostics.push(msg.clone());
            if config.verbose {
                eprintln!("{msg}");
            }
            continue;
        }

        if config.verbose {
            eprintln!("Fetching {}...", source.name());
        }

        match source.fetch(config) {
            Ok(result) => {
                if config.verbose {
                    eprintln!(
                        "{} complete: {} observations",
                        source.name(),
                        result.observations.len()
                    );
                }
                fetch_result.merge(source.kind(), result);
            }
            Err(e) if source.required() => {
                return Err(format!("{} failed: {e}", source.name()).into());
            }
            Err(e) => {
                fetch_result
                    .diagnostics
                    .push(format!("{} failed: {e}", source.name()));
                fetch_result.carry_kinds.push(source.kind());
            }
        }
    }

    fetch_result.duration_ms = Some(start.elapsed().as_millis());
    Ok(fetch_result)
}
