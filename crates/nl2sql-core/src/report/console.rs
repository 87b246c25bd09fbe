use super::BatchSummary;
use crate::model::{QuestionResultRow, QuestionStatus};

pub fn print_summary(summary: &BatchSummary, rows: &[QuestionResultRow]) {
    for r in rows {
        if r.status == QuestionStatus::Failed {
            eprintln!(
                "FAILED [{} {}]: {}",
                r.idx,
                r.db_id,
                r.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    eprintln!(
        "Results: processed={} solved={} refined={} failed={}",
        summary.processed, summary.solved_first_try, summary.solved_after_refine, summary.failed
    );
}
