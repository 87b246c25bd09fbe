use crate::model::{LlmResponse, QuestionResultRow, QuestionStatus};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Run history and completion cache.
#[derive(Clone)]
pub struct Store {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunRow {
    pub id: i64,
    pub dataset: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: String,
    pub summary: Option<serde_json::Value>,
}

impl Store {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> anyhow::Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("store connection lock poisoned"))
    }

    pub fn init_schema(&self) -> anyhow::Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(crate::storage::schema::DDL)?;
        Ok(())
    }

    pub fn create_run(&self, dataset: &str, config_json: &str) -> anyhow::Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO runs(dataset, started_at, status, config_json) VALUES (?1, ?2, ?3, ?4)",
            params![dataset, now_rfc3339(), "running", config_json],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn finalize_run(
        &self,
        run_id: i64,
        status: &str,
        summary: &serde_json::Value,
    ) -> anyhow::Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE runs SET status=?1, finished_at=?2, summary_json=?3 WHERE id=?4",
            params![status, now_rfc3339(), serde_json::to_string(summary)?, run_id],
        )?;
        Ok(())
    }

    pub fn insert_result(&self, run_id: i64, row: &QuestionResultRow) -> anyhow::Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO results(run_id, idx, db_id, status, attempts, sql, error, duration_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                run_id,
                row.idx as i64,
                row.db_id,
                status_to_str(row.status),
                row.attempts,
                row.sql,
                row.error,
                row.duration_ms.map(|v| v as i64),
            ],
        )?;
        Ok(())
    }

    pub fn recent_runs(&self, limit: u32) -> anyhow::Result<Vec<RunRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, dataset, started_at, finished_at, status, summary_json
             FROM runs ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |r| {
            Ok((
                r.get::<_, i64>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, Option<String>>(3)?,
                r.get::<_, String>(4)?,
                r.get::<_, Option<String>>(5)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, dataset, started_at, finished_at, status, summary) = row?;
            let summary = match summary {
                Some(s) => Some(serde_json::from_str(&s)?),
                None => None,
            };
            out.push(RunRow {
                id,
                dataset,
                started_at,
                finished_at,
                status,
                summary,
            });
        }
        Ok(out)
    }

    pub fn run_results(&self, run_id: i64) -> anyhow::Result<Vec<QuestionResultRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT idx, db_id, status, attempts, sql, error, duration_ms
             FROM results WHERE run_id=?1 ORDER BY idx",
        )?;
        let rows = stmt.query_map(params![run_id], |r| {
            Ok((
                r.get::<_, i64>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, u32>(3)?,
                r.get::<_, String>(4)?,
                r.get::<_, Option<String>>(5)?,
                r.get::<_, Option<i64>>(6)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (idx, db_id, status, attempts, sql, error, duration_ms) = row?;
            out.push(QuestionResultRow {
                idx: idx as usize,
                db_id,
                status: status_from_str(&status)?,
                attempts,
                sql,
                error,
                duration_ms: duration_ms.map(|v| v as u64),
            });
        }
        Ok(out)
    }

    // cache
    pub fn cache_get(&self, key: &str) -> anyhow::Result<Option<LlmResponse>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT response_json FROM llm_cache WHERE key=?1")?;
        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            let s: String = row.get(0)?;
            let mut resp: LlmResponse = serde_json::from_str(&s)?;
            resp.cached = true;
            Ok(Some(resp))
        } else {
            Ok(None)
        }
    }

    pub fn cache_put(&self, key: &str, resp: &LlmResponse) -> anyhow::Result<()> {
        let conn = self.conn()?;
        let mut to_store = resp.clone();
        to_store.cached = false;
        conn.execute(
            "INSERT INTO llm_cache(key, provider, model, response_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(key) DO UPDATE SET response_json=excluded.response_json, created_at=excluded.created_at",
            params![
                key,
                resp.provider,
                resp.model,
                serde_json::to_string(&to_store)?,
                now_rfc3339()
            ],
        )?;
        Ok(())
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn status_to_str(s: QuestionStatus) -> &'static str {
    match s {
        QuestionStatus::Solved => "solved",
        QuestionStatus::Refined => "refined",
        QuestionStatus::Failed => "failed",
    }
}

fn status_from_str(s: &str) -> anyhow::Result<QuestionStatus> {
    match s {
        "solved" => Ok(QuestionStatus::Solved),
        "refined" => Ok(QuestionStatus::Refined),
        "failed" => Ok(QuestionStatus::Failed),
        other => anyhow::bail!("unknown question status in store: {}", other),
    }
}
