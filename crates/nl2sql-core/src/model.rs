use crate::errors::SqlExecutionError;
use serde::{Deserialize, Serialize};

pub const FAILED_SQL: &str = "FAILED";
pub const BIRD_SEPARATOR: &str = "\t----- bird -----\t";

/// One benchmark record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub db_id: String,
    pub question: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub evidence: String,
    #[serde(default)]
    pub question_id: Option<u64>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub provider: String,
    pub model: String,
    pub cached: bool,
    #[serde(default)]
    pub meta: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ExecutionOutcome {
    Success,
    Failure(SqlExecutionError),
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success)
    }
}

/// One candidate that went through validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRow {
    pub attempt_no: u32,
    pub sql: String,
    pub outcome: ExecutionOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionStatus {
    Solved,
    Refined,
    Failed,
}

/// `"<SQL>\t----- bird -----\t<db_id>"`
pub fn prediction_entry(sql: &str, db_id: &str) -> String {
    format!("{}{}{}", sql, BIRD_SEPARATOR, db_id)
}

/// Per-question artifact written under the results directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    pub question: String,
    pub schema: String,
    pub evidence: String,
    pub sql: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_sql: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Row kept in the run store for one processed question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionResultRow {
    pub idx: usize,
    pub db_id: String,
    pub status: QuestionStatus,
    pub attempts: u32,
    pub sql: String,
    pub error: Option<String>,
    pub duration_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prediction_entry_uses_bird_separator() {
        assert_eq!(
            prediction_entry("SELECT 1", "financial"),
            "SELECT 1\t----- bird -----\tfinancial"
        );
    }

    #[test]
    fn question_evidence_defaults_to_empty() {
        let q: Question =
            serde_json::from_str(r#"{"db_id":"card_games","question":"How many cards?"}"#)
                .unwrap();
        assert_eq!(q.evidence, "");
        assert!(q.question_id.is_none());
    }

    #[test]
    fn null_evidence_reads_as_empty() {
        let q: Question = serde_json::from_str(
            r#"{"db_id":"card_games","question":"How many cards?","evidence":null}"#,
        )
        .unwrap();
        assert_eq!(q.evidence, "");
    }
}
