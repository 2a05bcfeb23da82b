use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::models::Draw;

const SAMPLE_ROWS: [[i64; 7]; 3] = [
    [2, 9, 12, 19, 21, 31, 4],
    [6, 10, 11, 18, 20, 32, 5],
    [1, 3, 4, 11, 12, 21, 16],
];

#[derive(Debug, Deserialize)]
struct HistoryDocument {
    #[serde(rename = "historyData")]
    history_data: Vec<Vec<i64>>,
}

/// What to hand back when the history file cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fallback {
    /// Small embedded sample, enough to train on.
    #[default]
    Sample,
    /// No draws: the predictor stays in random mode.
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryOrigin {
    File,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct HistoryLoad {
    pub draws: Vec<Draw>,
    pub origin: HistoryOrigin,
}

pub fn sample_draws() -> Vec<Draw> {
    SAMPLE_ROWS
        .iter()
        .filter_map(|row| Draw::from_row(row).ok())
        .collect()
}

/// Parse a `{ "historyData": [[r1..r6, blue], ...] }` document, oldest draw first.
/// Rows that are not valid draws are skipped.
pub fn parse_history(json: &str) -> Result<Vec<Draw>> {
    let doc: HistoryDocument = serde_json::from_str(json).context("JSON d'historique invalide")?;

    let mut draws = Vec::with_capacity(doc.history_data.len());
    for (i, row) in doc.history_data.iter().enumerate() {
        match Draw::from_row(row) {
            Ok(draw) => draws.push(draw),
            Err(e) => log::warn!("Ligne {} ignorée : {}", i + 1, e),
        }
    }
    Ok(draws)
}

/// Load the draw history. Never fails: any read or parse error yields the fallback.
pub fn load_history(path: &Path, fallback: Fallback) -> HistoryLoad {
    let loaded = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {:?}", path))
        .and_then(|json| parse_history(&json));

    match loaded {
        Ok(draws) => {
            log::info!("{} tirages chargés depuis {:?}", draws.len(), path);
            HistoryLoad {
                draws,
                origin: HistoryOrigin::File,
            }
        }
        Err(e) => {
            log::warn!("Échec du chargement de l'historique : {e:#}");
            let draws = match fallback {
                Fallback::Sample => sample_draws(),
                Fallback::Empty => Vec::new(),
            };
            HistoryLoad {
                draws,
                origin: HistoryOrigin::Fallback,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_draws() {
        let draws = sample_draws();
        assert_eq!(draws.len(), 3);
        assert_eq!(draws[0].numbers(), [2, 9, 12, 19, 21, 31, 4]);
        assert_eq!(draws[2].blue, 16);
    }

    #[test]
    fn test_parse_history_ok() {
        let json = r#"{ "historyData": [[2,9,12,19,21,31,4],[6,10,11,18,20,32,5]] }"#;
        let draws = parse_history(json).unwrap();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[1].red, [6, 10, 11, 18, 20, 32]);
    }

    #[test]
    fn test_parse_history_skips_invalid_rows() {
        let json = r#"{ "historyData": [[2,9,12,19,21,31,4],[1,1,2,3,4,5,6],[1,2,3,4,5,6,17],[1,2]] }"#;
        let draws = parse_history(json).unwrap();
        assert_eq!(draws.len(), 1);
    }

    #[test]
    fn test_parse_history_missing_field() {
        assert!(parse_history(r#"{ "draws": [] }"#).is_err());
        assert!(parse_history("not json").is_err());
    }

    #[test]
    fn test_load_missing_file_falls_back_to_sample() {
        let path = Path::new("/nonexistent/ssq/lottery-data.json");
        let load = load_history(path, Fallback::Sample);
        assert_eq!(load.origin, HistoryOrigin::Fallback);
        assert_eq!(load.draws.len(), 3);
    }

    #[test]
    fn test_load_missing_file_strict_is_empty() {
        let path = Path::new("/nonexistent/ssq/lottery-data.json");
        let load = load_history(path, Fallback::Empty);
        assert_eq!(load.origin, HistoryOrigin::Fallback);
        assert!(load.draws.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("ssq-history-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "historyData": [[2,9,12,19,21,31,4]] }"#).unwrap();
        let load = load_history(&path, Fallback::Sample);
        std::fs::remove_file(&path).unwrap();

        assert_eq!(load.origin, HistoryOrigin::File);
        assert_eq!(load.draws.len(), 1);
    }
}
