use crate::errors::ConfigError;
use crate::model::Question;
use std::path::Path;

/// Loads the question list: a JSON array of records, or an object whose
/// values are records. Object keys that parse as integers are ordered
/// numerically and come before any other keys.
pub fn load_dataset(path: &Path) -> anyhow::Result<Vec<Question>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        ConfigError(format!("failed to read dataset {}: {}", path.display(), e))
    })?;
    parse_dataset(&raw)
        .map_err(|e| anyhow::anyhow!("{} ({})", e, path.display()))
}

pub fn parse_dataset(raw: &str) -> anyhow::Result<Vec<Question>> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| ConfigError(format!("dataset is not valid JSON: {}", e)))?;

    let records: Vec<serde_json::Value> = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(map) => {
            let mut entries: Vec<(String, serde_json::Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| match (a.parse::<u64>(), b.parse::<u64>()) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                (Ok(_), Err(_)) => std::cmp::Ordering::Less,
                (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
                (Err(_), Err(_)) => a.cmp(b),
            });
            entries.into_iter().map(|(_, v)| v).collect()
        }
        _ => {
            return Err(ConfigError("dataset must be a JSON array or object".into()).into());
        }
    };

    records
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            serde_json::from_value::<Question>(v).map_err(|e| {
                anyhow::Error::from(ConfigError(format!("dataset record {}: {}", i, e)))
            })
        })
        .collect()
}
