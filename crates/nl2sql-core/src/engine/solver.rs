use crate::agents::clean::{clean_sql, parse_table_list};
use crate::agents::{AgentSet, PromptContext, Role};
use crate::errors::{SolveError, SolveFailure, SqlExecutionError};
use crate::model::{AttemptRow, ExecutionOutcome, Question};
use crate::report::run_log::{LogStep, RunLog, SolveRecord};
use crate::schema::Schema;
use crate::sqlrun::SqlRunner;

#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Refine cycles allowed after the first failed validation.
    pub max_retries: u32,
    pub plan: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_retries: crate::config::DEFAULT_MAX_RETRIES,
            plan: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Solution {
    pub sql: String,
    pub plan: String,
    /// First generated candidate, kept only when refinement replaced it.
    pub initial_sql: Option<String>,
    /// Refine cycles performed.
    pub attempts: u32,
    pub history: Vec<AttemptRow>,
}

/// Plan, generate, then validate and refine until the database accepts the
/// candidate or the retry budget runs out.
///
/// Per call: at most `1 + [1] + 1 + max_retries` LLM calls (plan, optional
/// select, generate, refines) and `1 + max_retries` executions.
pub struct Solver {
    config: SolverConfig,
    agents: AgentSet,
    runner: SqlRunner,
    log: RunLog,
}

impl Solver {
    pub fn new(config: SolverConfig, agents: AgentSet, runner: SqlRunner, log: RunLog) -> Self {
        Self {
            config,
            agents,
            runner,
            log,
        }
    }

    pub async fn solve(&self, q: &Question, schema: &Schema) -> Result<Solution, SolveFailure> {
        let mut record = SolveRecord {
            db_id: q.db_id.clone(),
            question: q.question.clone(),
            plan: String::new(),
            steps: Vec::new(),
            final_sql: None,
            error: None,
        };

        let mut progress = Progress::default();

        let result = self.solve_inner(q, schema, &mut record, &mut progress).await;
        match &result {
            Ok(solution) => record.final_sql = Some(solution.sql.clone()),
            Err(e) => record.error = Some(e.to_string()),
        }
        if let Err(e) = self.log.append(&record) {
            tracing::warn!(error = %e, "failed to append run log record");
        }
        result.map_err(|error| SolveFailure {
            error,
            plan: record.plan,
            initial_sql: progress.initial_sql,
            last_sql: progress.last_sql,
            attempts: progress.attempts,
        })
    }

    async fn solve_inner(
        &self,
        q: &Question,
        full_schema: &Schema,
        record: &mut SolveRecord,
        progress: &mut Progress,
    ) -> Result<Solution, SolveError> {
        let full_text = full_schema.render();

        let plan = if self.config.plan {
            self.plan(q, &full_text, record).await
        } else {
            String::new()
        };
        record.plan = plan.clone();

        let schema_text = match self.select(q, full_schema, &full_text, &plan, record).await {
            Some(narrowed) => narrowed.render(),
            None => full_text,
        };

        let generated = self
            .agents
            .complete(
                Role::Nl2Sql,
                &PromptContext {
                    question: &q.question,
                    schema: &schema_text,
                    evidence: &q.evidence,
                    plan: &plan,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| agent_error(Role::Nl2Sql, e))?;
        record.steps.push(LogStep::Agent {
            role: Role::Nl2Sql.to_string(),
            output: generated.clone(),
        });

        let first = clean_sql(&generated);
        progress.initial_sql = Some(first.clone());
        let mut sql = first.clone();
        let mut history = Vec::new();
        let mut attempts = 0u32;

        loop {
            let outcome = self.runner.validate(&q.db_id, &sql)?;
            progress.last_sql = Some(sql.clone());
            record.steps.push(LogStep::Validation {
                sql: sql.clone(),
                ok: outcome.is_success(),
                error: match &outcome {
                    ExecutionOutcome::Failure(e) => Some(e.to_string()),
                    ExecutionOutcome::Success => None,
                },
            });
            history.push(AttemptRow {
                attempt_no: attempts,
                sql: sql.clone(),
                outcome: outcome.clone(),
            });

            let error = match outcome {
                ExecutionOutcome::Success => {
                    return Ok(Solution {
                        initial_sql: (attempts > 0).then_some(first),
                        sql,
                        plan,
                        attempts,
                        history,
                    });
                }
                ExecutionOutcome::Failure(e) => e,
            };

            if attempts >= self.config.max_retries {
                tracing::debug!(
                    db_id = %q.db_id,
                    attempts,
                    error = %error,
                    "retry budget exhausted"
                );
                return Err(SolveError::RetryBudgetExhausted {
                    attempts,
                    last_sql: sql,
                    last_error: error,
                });
            }

            sql = self.refine(q, &schema_text, &sql, &error, record).await?;
            attempts += 1;
            progress.attempts = attempts;
        }
    }

    /// Planner failure degrades to an empty plan.
    async fn plan(&self, q: &Question, schema: &str, record: &mut SolveRecord) -> String {
        let ctx = PromptContext {
            question: &q.question,
            schema,
            evidence: &q.evidence,
            ..Default::default()
        };
        match self.agents.complete(Role::Planner, &ctx).await {
            Ok(plan) => {
                record.steps.push(LogStep::Agent {
                    role: Role::Planner.to_string(),
                    output: plan.clone(),
                });
                plan
            }
            Err(e) => {
                tracing::warn!(db_id = %q.db_id, error = %e, "planner failed; continuing without a plan");
                String::new()
            }
        }
    }

    /// `None` keeps the full schema.
    async fn select(
        &self,
        q: &Question,
        schema: &Schema,
        schema_text: &str,
        plan: &str,
        record: &mut SolveRecord,
    ) -> Option<Schema> {
        if !self.agents.has_role(Role::Selector) {
            return None;
        }
        let ctx = PromptContext {
            question: &q.question,
            schema: schema_text,
            evidence: &q.evidence,
            plan,
            ..Default::default()
        };
        let reply = match self.agents.complete(Role::Selector, &ctx).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(db_id = %q.db_id, error = %e, "selector failed; using full schema");
                return None;
            }
        };
        record.steps.push(LogStep::Agent {
            role: Role::Selector.to_string(),
            output: reply.clone(),
        });

        let narrowed = schema.narrowed_to(&parse_table_list(&reply));
        if narrowed.is_none() {
            tracing::warn!(db_id = %q.db_id, "selector named no known table; using full schema");
        }
        narrowed
    }

    async fn refine(
        &self,
        q: &Question,
        schema: &str,
        sql: &str,
        error: &SqlExecutionError,
        record: &mut SolveRecord,
    ) -> Result<String, SolveError> {
        let ctx = PromptContext {
            question: &q.question,
            schema,
            evidence: &q.evidence,
            sql,
            error: &error.message,
            error_class: &error.class,
            ..Default::default()
        };
        let raw = self
            .agents
            .complete(Role::Refiner, &ctx)
            .await
            .map_err(|e| agent_error(Role::Refiner, e))?;
        record.steps.push(LogStep::Agent {
            role: Role::Refiner.to_string(),
            output: raw.clone(),
        });
        Ok(clean_sql(&raw))
    }
}

/// What a solve got through before failing.
#[derive(Default)]
struct Progress {
    initial_sql: Option<String>,
    last_sql: Option<String>,
    attempts: u32,
}

fn agent_error(role: Role, e: anyhow::Error) -> SolveError {
    SolveError::Agent {
        role,
        message: e.to_string(),
    }
}
