use super::solver::Solver;
use crate::agents::clean::strip_db_qualifier;
use crate::model::{prediction_entry, Question, QuestionResultRow, QuestionStatus, ResultRecord};
use crate::on_error::{log_question_failed, FailurePolicy};
use crate::report::predictions::PredictionsWriter;
use crate::report::results::write_result;
use crate::report::BatchSummary;
use crate::schema::{Schema, SchemaSource};
use crate::storage::Store;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct BatchReport {
    pub summary: BatchSummary,
    pub rows: Vec<QuestionResultRow>,
}

/// Sequential loop over the dataset. A failing question is recorded and
/// the loop moves on; only output I/O errors stop the batch.
pub struct BatchDriver {
    solver: Solver,
    schemas: Arc<dyn SchemaSource>,
    schema_cache: HashMap<String, Arc<Schema>>,
    predictions: PredictionsWriter,
    results_dir: PathBuf,
    policy: FailurePolicy,
    store: Option<(Store, i64)>,
}

impl BatchDriver {
    pub fn new(
        solver: Solver,
        schemas: Arc<dyn SchemaSource>,
        predictions: PredictionsWriter,
        results_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            solver,
            schemas,
            schema_cache: HashMap::new(),
            predictions,
            results_dir: results_dir.into(),
            policy: FailurePolicy::default(),
            store: None,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Records one row per question under `run_id`.
    pub fn with_store(mut self, store: Store, run_id: i64) -> Self {
        self.store = Some((store, run_id));
        self
    }

    /// Processes `questions[start..]`, at most `limit` of them. Indices in
    /// every output are dataset positions.
    pub async fn run(
        &mut self,
        questions: &[Question],
        start: usize,
        limit: Option<usize>,
    ) -> anyhow::Result<BatchReport> {
        let end = match limit {
            Some(n) => start.saturating_add(n).min(questions.len()),
            None => questions.len(),
        };
        let mut summary = BatchSummary::default();
        let mut rows = Vec::new();

        if start >= end {
            tracing::warn!(start, total = questions.len(), "nothing to process");
        }

        for (idx, q) in questions.iter().enumerate().take(end).skip(start) {
            let row = self.process(idx, q).await?;
            summary.processed += 1;
            match row.status {
                QuestionStatus::Solved => summary.solved_first_try += 1,
                QuestionStatus::Refined => summary.solved_after_refine += 1,
                QuestionStatus::Failed => summary.failed += 1,
            }
            if let Some((store, run_id)) = &self.store {
                store.insert_result(*run_id, &row)?;
            }
            rows.push(row);
        }

        tracing::info!(
            processed = summary.processed,
            solved = summary.solved_first_try,
            refined = summary.solved_after_refine,
            failed = summary.failed,
            "batch finished"
        );
        Ok(BatchReport { summary, rows })
    }

    async fn process(&mut self, idx: usize, q: &Question) -> anyhow::Result<QuestionResultRow> {
        let started = Instant::now();
        tracing::info!(idx, db_id = %q.db_id, "solving question");

        let schema = match self.schema_for(&q.db_id) {
            Ok(s) => s,
            Err(e) => {
                let reason = e.to_string();
                log_question_failed(idx, &q.db_id, "schema", &reason);
                let sql = self.policy.recorded_sql_without_attempt();
                let record = ResultRecord {
                    question: q.question.clone(),
                    schema: String::new(),
                    evidence: q.evidence.clone(),
                    sql: prediction_entry(&sql, &q.db_id),
                    plan: None,
                    initial_sql: None,
                    attempts: None,
                    error: Some(reason.clone()),
                };
                return self.emit(idx, q, record, QuestionStatus::Failed, 0, Some(reason), started);
            }
        };
        let schema_text = schema.render();

        match self.solver.solve(q, &schema).await {
            Ok(solution) => {
                let sql = strip_db_qualifier(&solution.sql, &q.db_id);
                let status = if solution.attempts == 0 {
                    QuestionStatus::Solved
                } else {
                    QuestionStatus::Refined
                };
                let record = ResultRecord {
                    question: q.question.clone(),
                    schema: schema_text,
                    evidence: q.evidence.clone(),
                    sql: prediction_entry(&sql, &q.db_id),
                    plan: (!solution.plan.is_empty()).then(|| solution.plan.clone()),
                    initial_sql: solution.initial_sql.clone(),
                    attempts: Some(solution.attempts),
                    error: None,
                };
                self.emit(idx, q, record, status, solution.attempts, None, started)
            }
            Err(e) => {
                let reason = e.to_string();
                log_question_failed(idx, &q.db_id, "solve", &reason);
                let sql = strip_db_qualifier(&self.policy.recorded_sql(&e), &q.db_id);
                let attempts = e.attempts;
                let record = ResultRecord {
                    question: q.question.clone(),
                    schema: schema_text,
                    evidence: q.evidence.clone(),
                    sql: prediction_entry(&sql, &q.db_id),
                    plan: (!e.plan.is_empty()).then(|| e.plan.clone()),
                    initial_sql: e.initial_sql.clone(),
                    attempts: Some(attempts),
                    error: Some(reason.clone()),
                };
                self.emit(idx, q, record, QuestionStatus::Failed, attempts, Some(reason), started)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn emit(
        &mut self,
        idx: usize,
        q: &Question,
        record: ResultRecord,
        status: QuestionStatus,
        attempts: u32,
        error: Option<String>,
        started: Instant,
    ) -> anyhow::Result<QuestionResultRow> {
        write_result(&self.results_dir, idx, &q.db_id, &record)?;
        self.predictions.append(idx, record.sql.clone())?;

        Ok(QuestionResultRow {
            idx,
            db_id: q.db_id.clone(),
            status,
            attempts,
            sql: record.sql,
            error,
            duration_ms: Some(started.elapsed().as_millis() as u64),
        })
    }

    fn schema_for(&mut self, db_id: &str) -> Result<Arc<Schema>, crate::errors::SchemaError> {
        if let Some(s) = self.schema_cache.get(db_id) {
            return Ok(s.clone());
        }
        let schema = Arc::new(self.schemas.load(db_id)?);
        self.schema_cache.insert(db_id.to_string(), schema.clone());
        Ok(schema)
    }
}
