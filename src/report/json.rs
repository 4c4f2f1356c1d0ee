//! JSON output for snapshots and deltas, for scripting and piping.

use crate::fetch::source::Observation;
use crate::store::diff::DiffResult;

pub fn render_observations(observations: &[Observation]) -> String {
    serde_json::to_string_pretty(observations).unwrap_or_else(|_| String::from("[]"))
}

pub fn render_delta(result: &DiffResult) -> String {
    serde_json::to_string_pretty(result).unwrap_or_else(|_| String::from("{}"))
}
