//! The predictions file consumed by the benchmark evaluator.

use super::write_pretty_json;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionsFormat {
    /// `["<sql>\t----- bird -----\t<db_id>", ...]`
    #[default]
    Array,
    /// `{"0": "...", "1": "..."}` keyed by dataset index.
    Object,
}

/// In-memory view of the predictions file, flushed in full on every append.
#[derive(Debug)]
pub struct PredictionsWriter {
    path: PathBuf,
    format: PredictionsFormat,
    entries: BTreeMap<usize, String>,
}

impl PredictionsWriter {
    /// Starts empty; an existing file at `path` is replaced on first append.
    pub fn new(path: impl Into<PathBuf>, format: PredictionsFormat) -> Self {
        Self {
            path: path.into(),
            format,
            entries: BTreeMap::new(),
        }
    }

    /// Continues the file at `path` when it exists. Array elements are
    /// keyed by position, object entries by their index key; new entries
    /// replace earlier ones with the same index.
    pub fn open(path: impl Into<PathBuf>, format: PredictionsFormat) -> anyhow::Result<Self> {
        let mut writer = Self::new(path, format);
        let raw = match std::fs::read_to_string(&writer.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(writer),
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "failed to read {}: {}",
                    writer.path.display(),
                    e
                ))
            }
        };
        if !raw.trim().is_empty() {
            writer.entries = parse_existing(&raw).map_err(|e| {
                ConfigError(format!(
                    "existing predictions file {}: {}",
                    writer.path.display(),
                    e
                ))
            })?;
        }
        tracing::info!(
            path = %writer.path.display(),
            existing = writer.entries.len(),
            "continuing predictions file"
        );
        Ok(writer)
    }

    pub fn append(&mut self, idx: usize, entry: String) -> anyhow::Result<()> {
        self.entries.insert(idx, entry);
        self.flush()
    }

    pub fn flush(&self) -> anyhow::Result<()> {
        match self.format {
            PredictionsFormat::Array => {
                let list: Vec<&String> = self.entries.values().collect();
                write_pretty_json(&self.path, &list)
            }
            // integer keys serialize as strings, in numeric order
            PredictionsFormat::Object => write_pretty_json(&self.path, &self.entries),
        }
    }
}

fn parse_existing(raw: &str) -> Result<BTreeMap<usize, String>, String> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    let entry = |v: serde_json::Value| match v {
        serde_json::Value::String(s) => Ok(s),
        other => Err(format!("expected a string entry, found {}", other)),
    };
    match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, v)| -> Result<(usize, String), String> { Ok((i, entry(v)?)) })
            .collect(),
        serde_json::Value::Object(map) => map
            .into_iter()
            .map(|(k, v)| -> Result<(usize, String), String> {
                let idx = k
                    .parse::<usize>()
                    .map_err(|_| format!("key {:?} is not a dataset index", k))?;
                Ok((idx, entry(v)?))
            })
            .collect(),
        _ => Err("expected a JSON array or object".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_is_rewritten_after_each_append() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("out/predictions.json");
        let mut w = PredictionsWriter::new(&path, PredictionsFormat::Array);

        w.append(0, "SELECT 1\t----- bird -----\tfinancial".into())?;
        let v: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(v.as_array().map(|a| a.len()), Some(1));

        w.append(1, "FAILED\t----- bird -----\tcard_games".into())?;
        let raw = std::fs::read_to_string(&path)?;
        assert!(raw.starts_with("[\n  \""));
        let v: Vec<String> = serde_json::from_str(&raw)?;
        assert_eq!(v[1], "FAILED\t----- bird -----\tcard_games");
        Ok(())
    }

    #[test]
    fn object_keys_follow_numeric_order() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("predictions.json");
        let mut w = PredictionsWriter::new(&path, PredictionsFormat::Object);
        w.append(10, "b".into())?;
        w.append(2, "a".into())?;

        let raw = std::fs::read_to_string(&path)?;
        let two = raw.find("\"2\"").unwrap();
        let ten = raw.find("\"10\"").unwrap();
        assert!(two < ten);
        Ok(())
    }

    #[test]
    fn open_continues_an_array_file() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("predictions.json");
        std::fs::write(&path, r#"["SELECT 1\t----- bird -----\tfinancial", "FAILED\t----- bird -----\tfinancial"]"#)?;

        let mut w = PredictionsWriter::open(&path, PredictionsFormat::Array)?;
        w.append(1, "SELECT 2\t----- bird -----\tfinancial".into())?;
        w.append(2, "SELECT 3\t----- bird -----\tfinancial".into())?;

        let v: Vec<String> = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(v.len(), 3);
        assert!(v[0].starts_with("SELECT 1"));
        assert!(v[1].starts_with("SELECT 2"));
        Ok(())
    }

    #[test]
    fn open_continues_an_object_file() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("predictions.json");
        std::fs::write(&path, r#"{"148": "a", "3": "b"}"#)?;

        let mut w = PredictionsWriter::open(&path, PredictionsFormat::Object)?;
        w.append(149, "c".into())?;

        let v: BTreeMap<usize, String> = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(v.keys().copied().collect::<Vec<_>>(), vec![3, 148, 149]);
        Ok(())
    }

    #[test]
    fn open_tolerates_missing_or_empty_file() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("predictions.json");
        let mut w = PredictionsWriter::open(&path, PredictionsFormat::Array)?;
        w.append(0, "x".into())?;

        std::fs::write(&path, "\n")?;
        let mut w = PredictionsWriter::open(&path, PredictionsFormat::Array)?;
        w.append(5, "y".into())?;
        let v: Vec<String> = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(v, vec!["y"]);
        Ok(())
    }

    #[test]
    fn open_rejects_unreadable_content() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("predictions.json");
        std::fs::write(&path, r#"{"first": "a"}"#).unwrap();
        let err = PredictionsWriter::open(&path, PredictionsFormat::Object).unwrap_err();
        assert!(err.to_string().starts_with("config error:"));
        // left untouched
        assert_eq!(std::fs::read_to_string(&path).unwrap(), r#"{"first": "a"}"#);
    }
}
