//! Change notification.
//!
//! A non-empty delta becomes one message: a subject line plus a body that
//! groups entries by source and change type. Delivery is behind the
//! `Notifier` trait; the crate ships a webhook poster and a console printer.

pub mod webhook;

use crate::fetch::source::SourceKind;
use crate::store::diff::{DiffEntry, DiffResult, DiffType};
use crate::util::format_timestamp;
use std::collections::HashMap;

pub trait Notifier {
    fn name(&self) -> &'static str;
    fn send(&self, subject: &str, body: &str) -> Result<(), Box<dyn std::error::Error>>;
}

/// Fallback delivery when no webhook is configured: print to stdout so the
/// scheduler's log captures the change.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn name(&self) -> &'static str {
        "console"
    }

    fn send(&self, subject: &str, body: &str) -> Result<(), Box<dyn std::error::Error>> {
        println!("{subject}\n\n{body}");
        Ok(())
    }
}

fn kind_label(kind: &SourceKind) -> &'static str {
    match kind {
        SourceKind::Sitemap => "New waitlist pages",
        SourceKind::Listing => "Watched listings",
        SourceKind::Positions => "Queue positions",
        SourceKind::Other => "Other",
    }
}

fn entry_line(entry: &DiffEntry) -> String {
    let name = entry.label.as_deref().unwrap_or(&entry.key);

    match entry.diff_type {
        DiffType::New => {
            let value = entry.new_value.as_deref().unwrap_or("?");
            if name == entry.key {
                format!("  [new] {} ({})", entry.key, value)
            } else {
                format!("  [new] {name} ({value}) {}", entry.key)
            }
        }
        DiffType::Changed => format!(
            "  [changed] {name}: {} -> {}",
            entry.old_value.as_deref().unwrap_or("?"),
            entry.new_value.as_deref().unwrap_or("?")
        ),
        DiffType::Removed => format!(
            "  [gone] {name} (was {})",
            entry.old_value.as_deref().unwrap_or("?")
        ),
    }
}

/// Render a delta into a (subject, body) pair.
pub fn render_message(result: &DiffResult) -> (String, String) {
    let opened = result
        .entries
        .iter()
        .filter(|e| {
            e.kind == SourceKind::Listing
                && matches!(e.diff_type, DiffType::Changed | DiffType::New)
                && e.new_value.as_deref() == Some("open")
        })
        .count();

    let subject = if opened > 0 {
        format!("vigil: {opened} waitlist(s) opened")
    } else {
        format!("vigil: {} change(s) detected", result.entries.len())
    };

    let mut by_kind: HashMap<SourceKind, Vec<&DiffEntry>> = HashMap::new();
    for entry in &result.entries {
        by_kind.entry(entry.kind).or_default().push(entry);
    }

    let mut kinds: Vec<_> = by_kind.keys().copied().collect();
    kinds.sort_by_key(|k| kind_label(k));

    let mut body = String::new();
    body.push_str(&format!(
        "Changes since snapshot #{} ({}):\n\n",
        result.from_id,
        format_timestamp(result.from_timestamp)
    ));

    for kind in kinds {
        let Some(entries) = by_kind.get(&kind) else { continue };

        body.push_str(kind_label(&kind));
        body.push_str(":\n");
        for entry in entries {
            body.push_str(&entry_line(entry));
            body.push('\n');
        }
        body.push('\n');
    }

    (subject, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::diff::compare_observations;
    use crate::fetch::source::Observation;

    fn obs(kind: SourceKind, key: &str, value: &str, label: Option<&str>) -> Observation {
        Observation {
            kind,
            key: key.to_string(),
            value: value.to_string(),
            label: label.map(|s| s.to_string()),
        }
    }

    #[test]
    fn opened_listing_drives_the_subject() {
        let result = compare_observations(
            &[obs(SourceKind::Listing, "https://a.example", "closed", None)],
            &[obs(SourceKind::Listing, "https://a.example", "open", None)],
            1,
            Some(2),
            0,
            100,
        );

        let (subject, body) = render_message(&result);
        assert_eq!(subject, "vigil: 1 waitlist(s) opened");
        assert!(body.contains("closed -> open"));
    }

    #[test]
    fn generic_subject_without_openings() {
        let result = compare_observations(
            &[],
            &[obs(SourceKind::Sitemap, "https://b.example", "listed", Some("København N"))],
            1,
            Some(2),
            0,
            100,
        );

        let (subject, body) = render_message(&result);
        assert_eq!(subject, "vigil: 1 change(s) detected");
        assert!(body.contains("New waitlist pages"));
        assert!(body.contains("https://b.example"));
    }

    #[test]
    fn body_groups_by_source() {
        let result = compare_observations(
            &[obs(SourceKind::Positions, "queue-a", "12/480", Some("Queue A"))],
            &[
                obs(SourceKind::Positions, "queue-a", "11/480", Some("Queue A")),
                obs(SourceKind::Listing, "https://c.example", "closed", None),
            ],
            1,
            Some(2),
            0,
            100,
        );

        let (_, body) = render_message(&result);
        assert!(body.contains("Queue positions:"));
        assert!(body.contains("Watched listings:"));
        assert!(body.contains("12/480 -> 11/480"));
    }

    #[test]
    fn removed_entry_rendered_as_gone() {
        let result = compare_observations(
            &[obs(SourceKind::Listing, "https://d.example", "closed", None)],
            &[],
            1,
            Some(2),
            0,
            100,
        );

        let (_, body) = render_message(&result);
        assert!(body.contains("[gone] https://d.example (was closed)"));
    }
}
