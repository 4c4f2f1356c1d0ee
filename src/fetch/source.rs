use serde::{Serialize, Deserialize};

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Sitemap,
    Listing,
    Positions,
    Other,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Sitemap => "Sitemap",
            SourceKind::Listing => "Listing",
            SourceKind::Positions => "Positions",
            SourceKind::Other => "Other",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "Sitemap" => SourceKind::Sitemap,
            "Listing" => SourceKind::Listing,
            "Positions" => SourceKind::Positions,
            _ => SourceKind::Other,
        }
    }
}

/// A single observed fact: one key of the target system and its current value.
///
/// The value is an opaque string so the differ stays total over anything a
/// source produces: "open"/"closed"/"gone" for listings, "listed" for sitemap
/// discoveries, "12/480" for queue positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub kind: SourceKind,
    pub key: String,
    pub value: String,
    pub label: Option<String>,
}

pub struct SourceResult {
    pub observations: Vec<Observation>,
    pub diagnostics: Vec<String>,
    /// Keys this source watches but could not observe this run (transient
    /// fetch error on one URL). The pipeline carries the previous snapshot's
    /// value forward for these keys so they do not show up as Removed.
    pub unobserved: Vec<String>,
}

impl SourceResult {
    pub fn empty() -> Self {
        SourceResult {
            observations: Vec::new(),
            diagnostics: Vec::new(),
            unobserved: Vec::new(),
        }
    }
}

/// A producer of current observations from the live target system.
///
/// Sources that lack their required configuration report unavailable and are
/// skipped with a diagnostic. `required` controls failure semantics: an error
/// from a required source aborts the whole run (nothing is persisted), while
/// an optional source's error surfaces as a diagnostic and the previous
/// snapshot's observations of that kind are carried forward unchanged.
pub trait Source {
    fn name(&self) -> &'static str;
    fn kind(&self) -> SourceKind;
    fn available(&self, config: &Config) -> bool;
    fn required(&self) -> bool {
        false
    }
    fn fetch(&self, config: &Config) -> Result<SourceResult, Box<dyn std::error::Error>>;
}
