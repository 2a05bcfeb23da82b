use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::models::{Draw, PredictionRecord, PredictionSource};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS kv (
    key    TEXT PRIMARY KEY,
    value  TEXT NOT NULL
);
";

pub const PREDICTIONS_KEY: &str = "predictions";
/// Ancienne clé, remplacée par `PREDICTIONS_KEY` lors de la migration.
pub const LEGACY_HISTORY_KEY: &str = "history";
pub const SCHEMA_VERSION: u32 = 2;

#[derive(Debug, Serialize, Deserialize)]
struct StoredPredictions {
    version: u32,
    entries: Vec<PredictionRecord>,
}

/// v1: bare array, timestamp in epoch milliseconds.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct V1Record {
    red_balls: [u8; 6],
    blue_ball: u8,
    timestamp: i64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredShape {
    Versioned(StoredPredictions),
    Bare(Vec<V1Record>),
}

#[derive(Debug, Deserialize)]
struct LegacyEntry {
    red: Vec<u8>,
    blue: u8,
    #[serde(default)]
    time: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum Decoded {
    Current,
    Upgraded,
    Corrupt,
}

pub fn db_path() -> std::path::PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("ssq.db");
    path
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Impossible de créer le répertoire {:?}", parent))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Impossible d'ouvrir la base {:?}", path))?;
    Ok(conn)
}

/// Create the schema, upgrade a v1 prediction list and fold the legacy
/// `history` key into the current list. Returns the number of entries moved.
pub fn migrate(conn: &Connection) -> Result<usize> {
    conn.execute_batch(SCHEMA).context("Échec de la migration")?;

    let tx = conn
        .unchecked_transaction()
        .context("Impossible de démarrer la transaction")?;

    let (mut entries, decoded) = match get_value(&tx, PREDICTIONS_KEY)? {
        Some(json) => decode_predictions(&json),
        None => (Vec::new(), Decoded::Current),
    };
    let mut dirty = decoded == Decoded::Upgraded;

    let mut moved = 0;
    if let Some(json) = get_value(&tx, LEGACY_HISTORY_KEY)? {
        let legacy = decode_legacy(&json);
        moved = legacy.len();
        entries.extend(legacy);
        delete_value(&tx, LEGACY_HISTORY_KEY)?;
        dirty = true;
        log::info!("{moved} entrées migrées depuis la clé '{LEGACY_HISTORY_KEY}'");
    }

    if dirty {
        put_predictions(&tx, entries)?;
    }
    tx.commit().context("Échec du commit")?;
    Ok(moved)
}

/// Read the stored predictions. A corrupt list reads as empty.
pub fn load_predictions(conn: &Connection) -> Result<Vec<PredictionRecord>> {
    let entries = match get_value(conn, PREDICTIONS_KEY)? {
        Some(json) => decode_predictions(&json).0,
        None => Vec::new(),
    };
    Ok(entries)
}

/// Append a batch in a single read-modify-write. Returns the new list length.
pub fn append_predictions(conn: &Connection, batch: &[PredictionRecord]) -> Result<usize> {
    let tx = conn
        .unchecked_transaction()
        .context("Impossible de démarrer la transaction")?;

    let mut entries = match get_value(&tx, PREDICTIONS_KEY)? {
        Some(json) => decode_predictions(&json).0,
        None => Vec::new(),
    };
    entries.extend_from_slice(batch);
    let total = entries.len();
    put_predictions(&tx, entries)?;

    tx.commit().context("Échec du commit")?;
    Ok(total)
}

pub fn count_predictions(conn: &Connection) -> Result<usize> {
    Ok(load_predictions(conn)?.len())
}

fn put_predictions(conn: &Connection, entries: Vec<PredictionRecord>) -> Result<()> {
    let stored = StoredPredictions {
        version: SCHEMA_VERSION,
        entries,
    };
    let json = serde_json::to_string(&stored)?;
    put_value(conn, PREDICTIONS_KEY, &json)
}

fn decode_predictions(json: &str) -> (Vec<PredictionRecord>, Decoded) {
    match serde_json::from_str::<StoredShape>(json) {
        Ok(StoredShape::Versioned(stored)) => {
            if stored.version > SCHEMA_VERSION {
                log::warn!(
                    "Version de schéma {} plus récente que {}",
                    stored.version,
                    SCHEMA_VERSION
                );
            }
            (stored.entries, Decoded::Current)
        }
        Ok(StoredShape::Bare(records)) => {
            let entries = records
                .into_iter()
                .map(|r| PredictionRecord {
                    red_balls: r.red_balls,
                    blue_ball: r.blue_ball,
                    timestamp: DateTime::from_timestamp_millis(r.timestamp).unwrap_or_default(),
                    source: PredictionSource::Unknown,
                })
                .collect();
            (entries, Decoded::Upgraded)
        }
        Err(e) => {
            log::warn!("Liste de prédictions illisible, traitée comme vide : {e}");
            (Vec::new(), Decoded::Corrupt)
        }
    }
}

fn decode_legacy(json: &str) -> Vec<PredictionRecord> {
    let entries: Vec<LegacyEntry> = match serde_json::from_str(json) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Ancien historique illisible, ignoré : {e}");
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .filter_map(|entry| {
            let red: [u8; 6] = match entry.red.as_slice().try_into() {
                Ok(red) => red,
                Err(_) => {
                    log::warn!("Entrée ignorée : {} boules rouges", entry.red.len());
                    return None;
                }
            };
            let draw = match Draw::new(red, entry.blue) {
                Ok(draw) => draw,
                Err(e) => {
                    log::warn!("Entrée ignorée : {e}");
                    return None;
                }
            };
            let timestamp = entry
                .time
                .as_deref()
                .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_default();
            Some(PredictionRecord::new(draw, PredictionSource::Unknown, timestamp))
        })
        .collect()
}

fn get_value(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
        .optional()
        .with_context(|| format!("Échec de lecture de la clé '{key}'"))?;
    Ok(value)
}

fn put_value(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO kv (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        rusqlite::params![key, value],
    )
    .with_context(|| format!("Échec d'écriture de la clé '{key}'"))?;
    Ok(())
}

fn delete_value(conn: &Connection, key: &str) -> Result<()> {
    conn.execute("DELETE FROM kv WHERE key = ?1", [key])
        .with_context(|| format!("Échec de suppression de la clé '{key}'"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_record(red: [u8; 6], blue: u8) -> PredictionRecord {
        let draw = Draw::new(red, blue).unwrap();
        let timestamp = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        PredictionRecord::new(draw, PredictionSource::Randomized, timestamp)
    }

    fn fresh_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn
    }

    #[test]
    fn test_empty_store() {
        let conn = fresh_db();
        assert_eq!(count_predictions(&conn).unwrap(), 0);
    }

    #[test]
    fn test_append_grows_by_batch_len() {
        let conn = fresh_db();
        let batch = vec![
            test_record([1, 2, 3, 4, 5, 6], 1),
            test_record([7, 8, 9, 10, 11, 12], 2),
        ];
        assert_eq!(append_predictions(&conn, &batch).unwrap(), 2);
        assert_eq!(append_predictions(&conn, &batch[..1]).unwrap(), 3);

        let loaded = load_predictions(&conn).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0], batch[0]);
        assert_eq!(loaded[1], batch[1]);
        assert_eq!(loaded[2], batch[0]);
    }

    #[test]
    fn test_stored_blob_is_versioned() {
        let conn = fresh_db();
        append_predictions(&conn, &[test_record([1, 2, 3, 4, 5, 6], 1)]).unwrap();
        let json = get_value(&conn, PREDICTIONS_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], SCHEMA_VERSION);
        assert_eq!(value["entries"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_store_reads_empty() {
        let conn = fresh_db();
        put_value(&conn, PREDICTIONS_KEY, "{not json").unwrap();
        assert!(load_predictions(&conn).unwrap().is_empty());

        // The next append replaces the corrupt blob.
        append_predictions(&conn, &[test_record([1, 2, 3, 4, 5, 6], 1)]).unwrap();
        assert_eq!(count_predictions(&conn).unwrap(), 1);
    }

    #[test]
    fn test_v1_bare_array_upgraded() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        put_value(
            &conn,
            PREDICTIONS_KEY,
            r#"[{"redBalls":[1,5,9,13,17,21],"blueBall":3,"timestamp":1700000000000}]"#,
        )
        .unwrap();

        migrate(&conn).unwrap();

        let json = get_value(&conn, PREDICTIONS_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], SCHEMA_VERSION);

        let loaded = load_predictions(&conn).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].red_balls, [1, 5, 9, 13, 17, 21]);
        assert_eq!(loaded[0].timestamp.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(loaded[0].source, PredictionSource::Unknown);
    }

    #[test]
    fn test_legacy_history_migrated_once() {
        let conn = fresh_db();
        append_predictions(&conn, &[test_record([1, 2, 3, 4, 5, 6], 1)]).unwrap();
        put_value(
            &conn,
            LEGACY_HISTORY_KEY,
            r#"[
                {"red":[3,8,14,20,27,33],"blue":9,"time":"2024-03-01T10:00:00Z"},
                {"red":[3,3,14,20,27,33],"blue":9},
                {"red":[1,2,3],"blue":9},
                {"red":[30,2,14,20,27,11],"blue":16}
            ]"#,
        )
        .unwrap();

        assert_eq!(migrate(&conn).unwrap(), 2);
        assert!(get_value(&conn, LEGACY_HISTORY_KEY).unwrap().is_none());

        let loaded = load_predictions(&conn).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[1].red_balls, [3, 8, 14, 20, 27, 33]);
        assert_eq!(loaded[1].timestamp.to_rfc3339(), "2024-03-01T10:00:00+00:00");
        assert_eq!(loaded[2].red_balls, [2, 11, 14, 20, 27, 30]);

        assert_eq!(migrate(&conn).unwrap(), 0);
        assert_eq!(count_predictions(&conn).unwrap(), 3);
    }

    #[test]
    fn test_corrupt_legacy_dropped() {
        let conn = fresh_db();
        put_value(&conn, LEGACY_HISTORY_KEY, "oops").unwrap();
        assert_eq!(migrate(&conn).unwrap(), 0);
        assert!(get_value(&conn, LEGACY_HISTORY_KEY).unwrap().is_none());
        assert_eq!(count_predictions(&conn).unwrap(), 0);
    }
}
