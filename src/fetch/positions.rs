//! Queue positions source.
//!
//! Pulls the account's waitlist positions from a JSON endpoint. The payload
//! shape varies between dashboard versions, so instead of a fixed schema the
//! whole value tree is walked for queue-shaped objects: anything with a name,
//! a position, and a total under their known key variants.

use serde_json::Value;

use crate::config::Config;
use crate::util::slugify;
use super::source::{Observation, Source, SourceKind, SourceResult};

const NAME_KEYS: &[&str] = &["name", "title", "waitlistName", "listName"];
const POSITION_KEYS: &[&str] = &["position", "spot", "rank", "place"];
const TOTAL_KEYS: &[&str] = &["total", "size", "capacity", "spots", "waitlistSize"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Queue {
    pub id: String,
    pub name: String,
    pub position: i64,
    pub total: i64,
}

pub struct PositionsSource;

impl Source for PositionsSource {
    fn name(&self) -> &'static str {
        "positions"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Positions
    }

    fn available(&self, config: &Config) -> bool {
        config.positions_url.is_some() && config.positions_token.is_some()
    }

    // the positions export is the critical leg of the run
    fn required(&self) -> bool {
        true
    }

    fn fetch(&self, config: &Config) -> Result<SourceResult, Box<dyn std::error::Error>> {
        let url = config
            .positions_url
            .as_ref()
            .ok_or("positions source requires positions_url")?;
        let token = config
            .positions_token
            .as_ref()
            .ok_or("positions source requires a token")?;

        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let payload: Value = client
            .get(url)
            .bearer_auth(token)
            .send()?
            .error_for_status()?
            .json()?;

        let queues = extract_queues(&payload);

        let mut result = SourceResult::empty();
        for queue in queues {
            result.observations.push(Observation {
                kind: SourceKind::Positions,
                key: queue.id,
                value: format!("{}/{}", queue.position, queue.total),
                label: Some(queue.name),
            });
        }

        Ok(result)
    }
}

/// Depth-first walk over every value in the tree.
fn walk(value: &Value, visit: &mut dyn FnMut(&Value)) {
    visit(value);
    match value {
        Value::Object(map) => {
            for v in map.values() {
                walk(v, visit);
            }
        }
        Value::Array(items) => {
            for v in items {
                walk(v, visit);
            }
        }
        _ => {}
    }
}

fn best_str(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(Value::String(s)) = obj.get(*key) {
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

fn best_int(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<i64> {
    for key in keys {
        match obj.get(*key) {
            Some(Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    return Some(i);
                }
                if let Some(f) = n.as_f64() {
                    return Some(f as i64);
                }
            }
            Some(Value::String(s)) if s.trim().chars().all(|c| c.is_ascii_digit()) && !s.trim().is_empty() => {
                if let Ok(i) = s.trim().parse() {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Find queue-shaped objects anywhere in the payload, deduplicated by
/// (id, position, total) and sorted by name.
pub fn extract_queues(payload: &Value) -> Vec<Queue> {
    let mut queues: Vec<Queue> = Vec::new();

    walk(payload, &mut |value| {
        let Value::Object(obj) = value else { return };

        let Some(name) = best_str(obj, NAME_KEYS) else { return };
        let Some(position) = best_int(obj, POSITION_KEYS) else { return };
        let Some(total) = best_int(obj, TOTAL_KEYS) else { return };

        let id = slugify(&name);
        if id.is_empty() {
            return;
        }

        let queue = Queue { id, name, position, total };
        if !queues.contains(&queue) {
            queues.push(queue);
        }
    });

    queues.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    queues
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_nested_queue_objects() {
        let payload = json!({
            "data": {
                "waitlists": [
                    {"name": "Andelsforening A", "position": 12, "total": 480},
                    {"title": "Boligforening B", "rank": 3, "capacity": 90}
                ]
            }
        });

        let queues = extract_queues(&payload);
        assert_eq!(queues.len(), 2);
        assert_eq!(queues[0].id, "andelsforening-a");
        assert_eq!(queues[0].position, 12);
        assert_eq!(queues[0].total, 480);
        assert_eq!(queues[1].id, "boligforening-b");
        assert_eq!(queues[1].position, 3);
        assert_eq!(queues[1].total, 90);
    }

    #[test]
    fn string_numbers_accepted() {
        let payload = json!([{"name": "Q", "position": "7", "total": "100"}]);
        let queues = extract_queues(&payload);
        assert_eq!(queues.len(), 1);
        assert_eq!(queues[0].position, 7);
        assert_eq!(queues[0].total, 100);
    }

    #[test]
    fn incomplete_objects_skipped() {
        let payload = json!([
            {"name": "no numbers"},
            {"position": 1, "total": 10},
            {"name": "ok", "position": 1, "total": 10}
        ]);
        let queues = extract_queues(&payload);
        assert_eq!(queues.len(), 1);
        assert_eq!(queues[0].name, "ok");
    }

    #[test]
    fn duplicates_collapsed() {
        let payload = json!({
            "a": {"name": "Q", "position": 5, "total": 50},
            "b": {"name": "Q", "position": 5, "total": 50}
        });
        assert_eq!(extract_queues(&payload).len(), 1);
    }

    #[test]
    fn booleans_not_treated_as_numbers() {
        let payload = json!([{"name": "Q", "position": true, "total": 10}]);
        assert!(extract_queues(&payload).is_empty());
    }

    #[test]
    fn sorted_by_name_case_insensitive() {
        let payload = json!([
            {"name": "zebra", "position": 1, "total": 2},
            {"name": "Alpha", "position": 1, "total": 2}
        ]);
        let queues = extract_queues(&payload);
        assert_eq!(queues[0].name, "Alpha");
    }
}
