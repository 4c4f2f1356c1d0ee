//! Table rendering for snapshots and deltas.

use crate::fetch::source::{Observation, SourceKind};
use crate::store::diff::{DiffResult, DiffType};
use crate::util::truncate;
use std::collections::HashMap;

/// Render a snapshot's observations grouped by source kind.
pub fn render_observations(observations: &[Observation]) -> String {
    if observations.is_empty() {
        return String::from("No observations in this snapshot.\n");
    }

    let mut output = String::new();

    let mut by_kind: HashMap<SourceKind, Vec<&Observation>> = HashMap::new();
    for obs in observations {
        by_kind.entry(obs.kind).or_default().push(obs);
    }

    let mut kinds: Vec<_> = by_kind.keys().copied().collect();
    kinds.sort_by_key(|k| k.as_str());

    for kind in kinds {
        let entries = &by_kind[&kind];

        output.push_str(&format!("\n{}\n", kind.as_str()));
        output.push_str(&"-".repeat(40));
        output.push('\n');

        let mut sorted: Vec<_> = entries.iter().collect();
        sorted.sort_by(|a, b| a.key.cmp(&b.key));

        for obs in sorted {
            let name = obs.label.as_deref().unwrap_or(&obs.key);
            output.push_str(&format!(
                "  {:50} {:>10}\n",
                truncate(name, 50),
                obs.value
            ));
        }
    }

    output.push_str(&format!("\n{} observation(s)\n", observations.len()));
    output
}

/// Render a delta grouped by source kind and change type.
pub fn render_delta(result: &DiffResult) -> String {
    let mut output = String::new();

    let mut by_kind: HashMap<SourceKind, Vec<_>> = HashMap::new();
    for entry in &result.entries {
        by_kind.entry(entry.kind).or_default().push(entry);
    }

    let mut kinds: Vec<_> = by_kind.keys().copied().collect();
    kinds.sort_by_key(|k| k.as_str());

    for kind in kinds {
        let entries = &by_kind[&kind];

        output.push_str(&format!("{}:\n", kind.as_str()));

        for entry in entries {
            let name = entry.label.as_deref().unwrap_or(&entry.key);
            match entry.diff_type {
                DiffType::New => {
                    output.push_str(&format!(
                        "  [new] {} ({})\n",
                        name,
                        entry.new_value.as_deref().unwrap_or("?")
                    ));
                }
                DiffType::Changed => {
                    output.push_str(&format!(
                        "  [changed] {}: {} -> {}\n",
                        name,
                        entry.old_value.as_deref().unwrap_or("?"),
                        entry.new_value.as_deref().unwrap_or("?")
                    ));
                }
                DiffType::Removed => {
                    output.push_str(&format!(
                        "  [gone] {} (was {})\n",
                        name,
                        entry.old_value.as_deref().unwrap_or("?")
                    ));
                }
            }
        }

        output.push('\n');
    }

    output
}
