//! The watch pipeline.
//!
//! One run: fetch current observations, load the previous snapshot, diff,
//! notify when something changed, persist the new baseline, prune the watch
//! list. Failure semantics follow the scheduler contract: a failed fetch
//! aborts before persistence so the prior snapshot stays the baseline for the
//! next attempt, while a failed notification does not block persistence (the
//! change stays auditable through the snapshot history).

use std::collections::HashSet;

use crate::config::{self, Config};
use crate::export;
use crate::fetch::{self, FetchResult};
use crate::fetch::source::{Observation, Source, SourceKind};
use crate::notify::{self, Notifier};
use crate::store::Store;
use crate::store::diff::{self, DiffResult, DiffType};

pub struct WatchOutcome {
    pub delta: DiffResult,
    pub first_run: bool,
    pub notified: bool,
    /// None under --dry-run.
    pub snapshot_id: Option<i64>,
    pub diagnostics: Vec<String>,
}

/// Copy previous values forward for keys (or whole kinds) the fetch could not
/// observe this run, so transient errors do not read as removals.
fn apply_carry(previous: &[Observation], fetched: &mut FetchResult) {
    let observed: HashSet<(SourceKind, &str)> = fetched
        .observations
        .iter()
        .map(|o| (o.kind, o.key.as_str()))
        .collect();

    let mut carried: Vec<Observation> = Vec::new();

    for prev in previous {
        if observed.contains(&(prev.kind, prev.key.as_str())) {
            continue;
        }

        let whole_kind = fetched.carry_kinds.contains(&prev.kind);
        let single_key = fetched
            .carry_keys
            .iter()
            .any(|(kind, key)| *kind == prev.kind && key == &prev.key);

        if whole_kind || single_key {
            carried.push(prev.clone());
        }
    }

    fetched.observations.extend(carried);
}

/// Watched URLs to drop after a successful run: pages that are gone, and
/// pages observed open (reported once, then retired to avoid repeat alerts).
/// A page that is already open the first time it is watched counts as opened,
/// not just a closed -> open transition.
fn prune_keys(delta: &DiffResult) -> HashSet<String> {
    delta
        .entries
        .iter()
        .filter(|e| e.kind == SourceKind::Listing)
        .filter(|e| {
            let opened = matches!(e.diff_type, DiffType::Changed | DiffType::New)
                && e.new_value.as_deref() == Some(crate::fetch::listing::STATUS_OPEN);
            let gone = e.new_value.as_deref() == Some(crate::fetch::listing::STATUS_GONE);
            opened || gone
        })
        .map(|e| e.key.clone())
        .collect()
}

pub fn run(
    config: &Config,
    sources: &[Box<dyn Source>],
    store: &mut Store,
    notifier: &dyn Notifier,
) -> Result<WatchOutcome, Box<dyn std::error::Error>> {
    let mut fetched = fetch::run(config, sources)?;

    let previous = store.latest_snapshot()?;
    let first_run = previous.is_none();
    let previous_observations = match &previous {
        Some(snapshot) => store.load_observations(snapshot.id)?,
        None => Vec::new(),
    };

    apply_carry(&previous_observations, &mut fetched);

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_secs() as i64;

    let (from_id, from_timestamp) = previous
        .as_ref()
        .map(|s| (s.id, s.timestamp))
        .unwrap_or((0, 0));

    let mut delta = diff::compare_observations(
        &previous_observations,
        &fetched.observations,
        from_id,
        None,
        from_timestamp,
        now,
    );

    let mut diagnostics = std::mem::take(&mut fetched.diagnostics);
    let mut notified = false;

    let suppress_first = first_run && !config.notify_on_first_run;
    if !delta.is_empty() && !suppress_first && !config.dry_run {
        let (subject, body) = notify::render_message(&delta);
        match notifier.send(&subject, &body) {
            Ok(()) => notified = true,
            Err(e) => {
                diagnostics.push(format!("notification via {} failed: {e}", notifier.name()));
            }
        }
    } else if !delta.is_empty() && suppress_first {
        diagnostics.push("first run: notification suppressed".to_string());
    }

    if config.dry_run {
        return Ok(WatchOutcome {
            delta,
            first_run,
            notified,
            snapshot_id: None,
            diagnostics,
        });
    }

    // retire opened and gone listings before persisting, so they do not show
    // up as removals on the next run
    let pruned = prune_keys(&delta);
    if !pruned.is_empty() {
        fetched
            .observations
            .retain(|o| o.kind != SourceKind::Listing || !pruned.contains(&o.key));
    }

    let snapshot_id = store.save_snapshot(&fetched)?;
    delta.to_id = Some(snapshot_id);

    if let Some(watch_file) = &config.watch_file {
        let urls = config::read_watch_urls(watch_file)?;
        let kept: Vec<String> = urls.into_iter().filter(|u| !pruned.contains(u)).collect();
        config::write_watch_urls(watch_file, &kept)?;
    }

    if let Some(export_path) = &config.export_path {
        let updated_at = chrono::Utc::now().format("%Y-%m-%d").to_string();
        let document = export::build(&fetched.observations, updated_at);
        export::write(&document, export_path)?;
    }

    Ok(WatchOutcome {
        delta,
        first_run,
        notified,
        snapshot_id: Some(snapshot_id),
        diagnostics,
    })
}
