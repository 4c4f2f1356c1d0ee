use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};

use crate::fetch::FetchResult;
use crate::fetch::source::{Observation, SourceKind};

/// Snapshot metadata stored in the database.
#[derive(Debug)]
pub struct Snapshot {
    pub id: i64,
    pub timestamp: i64,
    pub observation_count: u64,
    pub run_duration_ms: u64,
}

/// Get the database path (~/.local/share/vigil/vigil.db or platform equivalent)
fn default_db_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let data_dir = directories::ProjectDirs::from("", "", "vigil")
        .ok_or("Could not determine data directory")?
        .data_dir()
        .to_path_buf();

    std::fs::create_dir_all(&data_dir)?;
    Ok(data_dir.join("vigil.db"))
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS snapshots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp INTEGER NOT NULL,
            observation_count INTEGER NOT NULL,
            run_duration_ms INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS observations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            snapshot_id INTEGER NOT NULL,
            kind TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            label TEXT,
            FOREIGN KEY(snapshot_id) REFERENCES snapshots(id) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_observations_snapshot_id ON observations(snapshot_id)",
        [],
    )?;

    Ok(())
}

/// Database handle. Open once per command, reuse across all operations.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        Store::open_at(&default_db_path()?)
    }

    /// Open a store at an explicit path. Tests point this at a temp dir.
    pub fn open_at(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        init_schema(&conn)?;
        Ok(Store { conn })
    }

    /// Save a run's observations as a new snapshot. One transaction: the
    /// snapshot row and every observation land together or not at all, so a
    /// reader only ever sees the old baseline or the complete new one.
    pub fn save_snapshot(&mut self, result: &FetchResult) -> Result<i64, Box<dyn std::error::Error>> {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)?
            .as_secs() as i64;

        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO snapshots (timestamp, observation_count, run_duration_ms)
             VALUES (?1, ?2, ?3)",
            params![
                timestamp,
                i64::try_from(result.observations.len()).unwrap_or(i64::MAX),
                i64::try_from(result.duration_ms.unwrap_or(0)).unwrap_or(i64::MAX)
            ],
        )?;

        let snapshot_id = tx.last_insert_rowid();

        let mut stmt = tx.prepare_cached(
            "INSERT INTO observations (snapshot_id, kind, key, value, label)
             VALUES (?1, ?2, ?3, ?4, ?5)"
        )?;

        for obs in &result.observations {
            stmt.execute(params![
                snapshot_id,
                obs.kind.as_str(),
                obs.key,
                obs.value,
                obs.label.as_deref()
            ])?;
        }

        drop(stmt);
        tx.commit()?;

        Ok(snapshot_id)
    }

    /// List all snapshots, most recent first.
    pub fn list_snapshots(&self) -> Result<Vec<Snapshot>, Box<dyn std::error::Error>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, observation_count, run_duration_ms
             FROM snapshots
             ORDER BY timestamp DESC, id DESC"
        )?;

        let snapshots = stmt.query_map([], snapshot_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(snapshots)
    }

    /// Get a specific snapshot by ID.
    pub fn get_snapshot(&self, id: i64) -> Result<Option<Snapshot>, Box<dyn std::error::Error>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, observation_count, run_duration_ms
             FROM snapshots
             WHERE id = ?1"
        )?;

        let mut rows = stmt.query(params![id])?;

        if let Some(row) = rows.next()? {
            Ok(Some(snapshot_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Get the most recent snapshot. Returns None on a fresh database, which
    /// is what makes the first run a graceful everything-is-new diff.
    pub fn latest_snapshot(&self) -> Result<Option<Snapshot>, Box<dyn std::error::Error>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, observation_count, run_duration_ms
             FROM snapshots
             ORDER BY timestamp DESC, id DESC
             LIMIT 1"
        )?;

        let mut rows = stmt.query([])?;

        if let Some(row) = rows.next()? {
            Ok(Some(snapshot_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Load the observations of a specific snapshot.
    pub fn load_observations(&self, snapshot_id: i64) -> Result<Vec<Observation>, Box<dyn std::error::Error>> {
        let mut stmt = self.conn.prepare(
            "SELECT kind, key, value, label
             FROM observations
             WHERE snapshot_id = ?1"
        )?;

        let observations = stmt.query_map(params![snapshot_id], |row| {
            let kind_str: String = row.get(0)?;

            Ok(Observation {
                kind: SourceKind::parse(&kind_str),
                key: row.get(1)?,
                value: row.get(2)?,
                label: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

        Ok(observations)
    }
}

fn snapshot_from_row(row: &rusqlite::Row) -> rusqlite::Result<Snapshot> {
    Ok(Snapshot {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        observation_count: row.get::<_, i64>(2)?.max(0) as u64,
        run_duration_ms: row.get::<_, i64>(3)?.max(0) as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(kind: SourceKind, key: &str, value: &str) -> Observation {
        Observation {
            kind,
            key: key.to_string(),
            value: value.to_string(),
            label: Some("label".to_string()),
        }
    }

    fn result(observations: Vec<Observation>) -> FetchResult {
        let mut result = FetchResult::empty();
        result.observations = observations;
        result.duration_ms = Some(42);
        result
    }

    fn temp_store(dir: &tempfile::TempDir) -> Store {
        Store::open_at(&dir.path().join("vigil.db")).unwrap()
    }

    #[test]
    fn empty_store_has_no_latest() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        assert!(store.latest_snapshot().unwrap().is_none());
        assert!(store.list_snapshots().unwrap().is_empty());
    }

    #[test]
    fn save_and_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = temp_store(&dir);

        let id = store
            .save_snapshot(&result(vec![
                obs(SourceKind::Listing, "https://a.example", "open"),
                obs(SourceKind::Positions, "queue-a", "12/480"),
            ]))
            .unwrap();

        let snapshot = store.get_snapshot(id).unwrap().unwrap();
        assert_eq!(snapshot.observation_count, 2);
        assert_eq!(snapshot.run_duration_ms, 42);

        let observations = store.load_observations(id).unwrap();
        assert_eq!(observations.len(), 2);
        assert!(observations.iter().any(|o| {
            o.kind == SourceKind::Listing && o.key == "https://a.example" && o.value == "open"
        }));
        assert!(observations.iter().any(|o| {
            o.kind == SourceKind::Positions && o.key == "queue-a" && o.value == "12/480"
        }));
    }

    #[test]
    fn latest_is_most_recent_save() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = temp_store(&dir);

        store.save_snapshot(&result(vec![])).unwrap();
        let second = store.save_snapshot(&result(vec![])).unwrap();

        let latest = store.latest_snapshot().unwrap().unwrap();
        assert_eq!(latest.id, second);
        assert_eq!(store.list_snapshots().unwrap().len(), 2);
    }

    #[test]
    fn missing_snapshot_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir);
        assert!(store.get_snapshot(99).unwrap().is_none());
    }

    #[test]
    fn saves_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vigil.db");

        let id = {
            let mut store = Store::open_at(&path).unwrap();
            store
                .save_snapshot(&result(vec![obs(SourceKind::Sitemap, "u", "listed")]))
                .unwrap()
        };

        let store = Store::open_at(&path).unwrap();
        let observations = store.load_observations(id).unwrap();
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].kind, SourceKind::Sitemap);
    }
}
