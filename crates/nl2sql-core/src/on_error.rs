// on_error.rs - what gets recorded when a question cannot be solved
//
// A single question never aborts the batch; this policy only chooses the
// SQL written into its prediction record.

use crate::errors::SolveFailure;
use crate::model::FAILED_SQL;
use serde::{Deserialize, Serialize};

/// Recording policy for unsolved questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the `FAILED` sentinel (default).
    #[default]
    Sentinel,

    /// Record the last candidate that reached the database, falling back to
    /// the sentinel when none did.
    BestEffort,
}

impl FailurePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sentinel" => Some(Self::Sentinel),
            "best_effort" | "best-effort" => Some(Self::BestEffort),
            _ => None,
        }
    }

    /// SQL to record for a failed solve.
    pub fn recorded_sql(&self, failure: &SolveFailure) -> String {
        match (self, failure.last_sql.as_deref()) {
            (FailurePolicy::BestEffort, Some(sql)) if !sql.trim().is_empty() => sql.to_string(),
            _ => FAILED_SQL.to_string(),
        }
    }

    /// SQL to record when no solve was attempted (e.g. schema failure).
    pub fn recorded_sql_without_attempt(&self) -> String {
        FAILED_SQL.to_string()
    }
}

/// Emits the structured event for a question recorded as failed.
pub fn log_question_failed(idx: usize, db_id: &str, stage: &str, reason: &str) {
    tracing::warn!(
        event = "nl2sql.question.failed",
        idx,
        db_id = %db_id,
        stage = %stage,
        reason = %reason,
        "question {} failed during {}: {}", idx, stage, reason
    );
}
