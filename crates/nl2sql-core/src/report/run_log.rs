//! Append-only JSONL trace of solver invocations.

use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum LogStep {
    Agent { role: String, output: String },
    Validation { sql: String, ok: bool, error: Option<String> },
}

/// One record per `solve` call.
#[derive(Debug, Clone, Serialize)]
pub struct SolveRecord {
    pub db_id: String,
    pub question: String,
    pub plan: String,
    pub steps: Vec<LogStep>,
    pub final_sql: Option<String>,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct RunLog {
    file: Option<Arc<Mutex<File>>>,
}

impl RunLog {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| anyhow::anyhow!("failed to open run log {}: {}", path.display(), e))?;
        Ok(Self {
            file: Some(Arc::new(Mutex::new(file))),
        })
    }

    /// Sink that drops every record.
    pub fn disabled() -> Self {
        Self { file: None }
    }

    pub fn append(&self, record: &SolveRecord) -> anyhow::Result<()> {
        let Some(file) = &self.file else {
            return Ok(());
        };
        let mut line = serde_json::to_value(record)?;
        line["timestamp"] = serde_json::json!(chrono::Utc::now().to_rfc3339());
        let mut raw = serde_json::to_string(&line)?;
        raw.push('\n');

        let mut f = file
            .lock()
            .map_err(|_| anyhow::anyhow!("run log lock poisoned"))?;
        f.write_all(raw.as_bytes())?;
        f.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(q: &str) -> SolveRecord {
        SolveRecord {
            db_id: "financial".into(),
            question: q.into(),
            plan: String::new(),
            steps: vec![
                LogStep::Agent {
                    role: "nl2sql".into(),
                    output: "SELECT 1".into(),
                },
                LogStep::Validation {
                    sql: "SELECT 1".into(),
                    ok: true,
                    error: None,
                },
            ],
            final_sql: Some("SELECT 1".into()),
            error: None,
        }
    }

    #[test]
    fn appends_one_line_per_record() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("logs/run.jsonl");
        let log = RunLog::open(&path)?;
        log.append(&record("a"))?;
        log.append(&record("b"))?;
        // reopening appends instead of truncating
        RunLog::open(&path)?.append(&record("c"))?;

        let raw = std::fs::read_to_string(&path)?;
        let lines: Vec<serde_json::Value> = raw
            .lines()
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()?;
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2]["question"], "c");
        assert_eq!(lines[0]["steps"][1]["kind"], "validation");
        assert!(chrono::DateTime::parse_from_rfc3339(
            lines[0]["timestamp"].as_str().unwrap()
        )
        .is_ok());
        Ok(())
    }

    #[test]
    fn disabled_log_is_a_no_op() {
        assert!(RunLog::disabled().append(&record("x")).is_ok());
    }
}
