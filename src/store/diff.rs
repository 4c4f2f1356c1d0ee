//! Snapshot comparison engine.
//!
//! Compares two snapshots of observations and reports changes:
//! - Matches observations by source kind and key
//! - Keys only in the current snapshot are New, only in the previous are
//!   Removed, present in both with a different value are Changed
//! - Identical values produce no entry, so diff(S, S) is empty

use crate::fetch::source::{Observation, SourceKind};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiffType {
    New,
    Changed,
    Removed,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiffEntry {
    pub kind: SourceKind,
    pub key: String,
    pub label: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub diff_type: DiffType,
}

#[derive(Serialize)]
pub struct DiffResult {
    pub entries: Vec<DiffEntry>,
    pub from_id: i64,
    /// None while the current side has not been persisted (dry runs).
    pub to_id: Option<i64>,
    pub from_timestamp: i64,
    pub to_timestamp: i64,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Unique key for matching observations across snapshots.
fn make_key(obs: &Observation) -> String {
    format!("{}:{}", obs.kind.as_str(), obs.key)
}

/// Compare two sets of observations and produce diff entries. Pure and total:
/// any two well-formed observation slices diff without error.
pub fn compare_observations(
    previous: &[Observation],
    current: &[Observation],
    from_id: i64,
    to_id: Option<i64>,
    from_timestamp: i64,
    to_timestamp: i64,
) -> DiffResult {
    let mut prev_map: HashMap<String, &Observation> = HashMap::new();
    for obs in previous {
        prev_map.insert(make_key(obs), obs);
    }

    let mut curr_map: HashMap<String, &Observation> = HashMap::new();
    for obs in current {
        curr_map.insert(make_key(obs), obs);
    }

    let mut entries = Vec::new();

    // new and changed
    for (key, curr) in &curr_map {
        match prev_map.get(key) {
            Some(prev) if prev.value == curr.value => {}
            Some(prev) => {
                entries.push(DiffEntry {
                    kind: curr.kind,
                    key: curr.key.clone(),
                    label: curr.label.clone(),
                    old_value: Some(prev.value.clone()),
                    new_value: Some(curr.value.clone()),
                    diff_type: DiffType::Changed,
                });
            }
            None => {
                entries.push(DiffEntry {
                    kind: curr.kind,
                    key: curr.key.clone(),
                    label: curr.label.clone(),
                    old_value: None,
                    new_value: Some(curr.value.clone()),
                    diff_type: DiffType::New,
                });
            }
        }
    }

    // removed
    for (key, prev) in &prev_map {
        if !curr_map.contains_key(key) {
            entries.push(DiffEntry {
                kind: prev.kind,
                key: prev.key.clone(),
                label: prev.label.clone(),
                old_value: Some(prev.value.clone()),
                new_value: None,
                diff_type: DiffType::Removed,
            });
        }
    }

    // deterministic order for rendering and tests
    entries.sort_by(|a, b| (a.kind.as_str(), &a.key).cmp(&(b.kind.as_str(), &b.key)));

    DiffResult {
        entries,
        from_id,
        to_id,
        from_timestamp,
        to_timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(key: &str, value: &str) -> Observation {
        Observation {
            kind: SourceKind::Listing,
            key: key.to_string(),
            value: value.to_string(),
            label: None,
        }
    }

    fn diff(previous: &[Observation], current: &[Observation]) -> DiffResult {
        compare_observations(previous, current, 1, Some(2), 0, 100)
    }

    #[test]
    fn new_observation_detected() {
        let result = diff(&[], &[obs("slotA", "open")]);
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].diff_type, DiffType::New);
        assert_eq!(result.entries[0].old_value, None);
        assert_eq!(result.entries[0].new_value.as_deref(), Some("open"));
    }

    #[test]
    fn removed_observation_detected() {
        let result = diff(&[obs("slotA", "open")], &[]);
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].diff_type, DiffType::Removed);
        assert_eq!(result.entries[0].old_value.as_deref(), Some("open"));
        assert_eq!(result.entries[0].new_value, None);
    }

    #[test]
    fn changed_observation_detected() {
        let result = diff(&[obs("slotA", "closed")], &[obs("slotA", "open")]);
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].diff_type, DiffType::Changed);
        assert_eq!(result.entries[0].old_value.as_deref(), Some("closed"));
        assert_eq!(result.entries[0].new_value.as_deref(), Some("open"));
    }

    #[test]
    fn unchanged_observation_not_reported() {
        let result = diff(&[obs("slotA", "open")], &[obs("slotA", "open")]);
        assert!(result.is_empty());
    }

    #[test]
    fn identical_snapshots_diff_empty() {
        let snapshot = vec![obs("a", "open"), obs("b", "closed"), obs("c", "5/120")];
        let result = diff(&snapshot, &snapshot);
        assert!(result.is_empty());
    }

    #[test]
    fn same_key_different_kind_not_matched() {
        let mut sitemap = obs("https://x.example", "listed");
        sitemap.kind = SourceKind::Sitemap;
        let listing = obs("https://x.example", "open");

        let result = diff(&[sitemap], &[listing]);
        let types: Vec<DiffType> = result.entries.iter().map(|e| e.diff_type).collect();
        assert_eq!(result.entries.len(), 2);
        assert!(types.contains(&DiffType::New));
        assert!(types.contains(&DiffType::Removed));
    }

    #[test]
    fn first_run_marks_every_key_new() {
        let current = vec![obs("a", "open"), obs("b", "closed")];
        let result = diff(&[], &current);
        assert_eq!(result.entries.len(), 2);
        assert!(result.entries.iter().all(|e| e.diff_type == DiffType::New));
    }

    #[test]
    fn changed_and_new_in_same_delta() {
        // previous = {slotA: closed}, current = {slotA: open, slotB: closed}
        let result = diff(
            &[obs("slotA", "closed")],
            &[obs("slotA", "open"), obs("slotB", "closed")],
        );
        assert_eq!(result.entries.len(), 2);
        assert_eq!(result.entries[0].key, "slotA");
        assert_eq!(result.entries[0].diff_type, DiffType::Changed);
        assert_eq!(result.entries[1].key, "slotB");
        assert_eq!(result.entries[1].diff_type, DiffType::New);
    }

    #[test]
    fn entries_sorted_by_kind_then_key() {
        let result = diff(&[], &[obs("b", "open"), obs("a", "open")]);
        let keys: Vec<&str> = result.entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn snapshot_ids_preserved() {
        let result = compare_observations(&[], &[], 7, Some(13), 1000, 2000);
        assert_eq!(result.from_id, 7);
        assert_eq!(result.to_id, Some(13));
        assert_eq!(result.from_timestamp, 1000);
        assert_eq!(result.to_timestamp, 2000);
    }
}
