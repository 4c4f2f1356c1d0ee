//! Positions export.
//!
//! Writes the latest queue positions as a small JSON document for anything
//! downstream that reads the repo (dashboards, the committed current.json).
//! Write-then-rename, so a reader never sees a partial file.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::fetch::source::{Observation, SourceKind};

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct ExportedQueue {
    pub id: String,
    pub name: String,
    pub position: i64,
    pub total: i64,
}

#[derive(Serialize)]
pub struct PositionsExport {
    pub updated_at: String,
    pub queues: Vec<ExportedQueue>,
}

/// Build the export document from a run's observations. Position observations
/// carry their value as "position/total"; anything else is ignored.
pub fn build(observations: &[Observation], updated_at: String) -> PositionsExport {
    let mut queues: Vec<ExportedQueue> = observations
        .iter()
        .filter(|o| o.kind == SourceKind::Positions)
        .filter_map(|o| {
            let (position, total) = o.value.split_once('/')?;
            Some(ExportedQueue {
                id: o.key.clone(),
                name: o.label.clone().unwrap_or_else(|| o.key.clone()),
                position: position.parse().ok()?,
                total: total.parse().ok()?,
            })
        })
        .collect();

    queues.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

    PositionsExport { updated_at, queues }
}

pub fn write(export: &PositionsExport, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut json = serde_json::to_string_pretty(export)?;
    json.push('\n');

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;

    Ok(())
}
