use super::args::*;
use nl2sql_core::agents::clean::strip_db_qualifier;
use nl2sql_core::engine::{BatchDriver, Solver, SolverConfig};
use nl2sql_core::errors::{SolveError, SqlRunError};
use nl2sql_core::model::{prediction_entry, Question};
use nl2sql_core::on_error::FailurePolicy;
use nl2sql_core::report::predictions::PredictionsWriter;
use nl2sql_core::report::run_log::RunLog;
use nl2sql_core::schema::{CsvSchemaSource, SchemaSource};
use nl2sql_core::sqlrun::SqlRunner;
use std::path::Path;
use std::sync::Arc;

pub mod build;

pub mod exit_codes {
    pub const OK: i32 = 0;
    pub const QUESTIONS_FAILED: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let result = match cli.cmd {
        Command::Init(args) => cmd_init(args),
        Command::Run(args) => cmd_run(args).await,
        Command::Solve(args) => cmd_solve(args).await,
        Command::Schema(args) => cmd_schema(args),
        Command::Exec(args) => cmd_exec(args),
        Command::Runs(args) => cmd_runs(args),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(exit_codes::OK)
        }
    };

    match result {
        Err(e) if e.to_string().contains("config error") => {
            eprintln!("{}", e);
            Ok(exit_codes::CONFIG_ERROR)
        }
        other => other,
    }
}

fn cmd_init(args: InitArgs) -> anyhow::Result<i32> {
    if !args.config.exists() {
        ensure_parent_dir(&args.config)?;
        nl2sql_core::config::write_sample_config(&args.config)?;
        eprintln!("created {}", args.config.display());
    } else {
        eprintln!("note: {} already exists", args.config.display());
    }

    if args.gitignore {
        write_file_if_missing(Path::new(".gitignore"), crate::templates::GITIGNORE)?;
    }
    Ok(exit_codes::OK)
}

async fn cmd_run(args: RunArgs) -> anyhow::Result<i32> {
    let mut cfg = build::load_config(&args.common)?;
    build::apply_agent_args(&mut cfg, &args.agent);
    if let Some(p) = &args.dataset {
        cfg.paths.dataset = p.clone();
    }
    if let Some(p) = &args.predictions {
        cfg.paths.predictions = p.clone();
    }
    if let Some(p) = &args.results_dir {
        cfg.paths.results_dir = p.clone();
    }
    if let Some(s) = &args.on_failure {
        cfg.settings.on_failure = FailurePolicy::parse(s).ok_or_else(|| {
            nl2sql_core::errors::ConfigError(format!(
                "unknown failure policy '{}' (expected sentinel or best_effort)",
                s
            ))
        })?;
    }
    let start = args.start.unwrap_or(cfg.settings.start);
    let limit = args.limit.or(cfg.settings.limit);

    let questions = nl2sql_core::dataset::load_dataset(&cfg.paths.dataset)?;
    let store = build::open_store(&cfg.paths.store)?;
    let agents = build::build_agents(&cfg, &args.agent, Some(&store))?;

    let solver = Solver::new(
        SolverConfig {
            max_retries: cfg.settings.max_retries,
            plan: cfg.settings.plan,
        },
        agents,
        SqlRunner::new(&cfg.paths.databases),
        RunLog::open(&cfg.paths.log_file)?,
    );

    let predictions = if args.fresh {
        PredictionsWriter::new(&cfg.paths.predictions, cfg.settings.predictions_format)
    } else {
        PredictionsWriter::open(&cfg.paths.predictions, cfg.settings.predictions_format)?
    };

    let run_id = store.create_run(
        &cfg.paths.dataset.display().to_string(),
        &serde_json::to_string(&cfg)?,
    )?;
    tracing::info!(
        run_id,
        questions = questions.len(),
        start,
        limit = ?limit,
        provider = %cfg.agents.provider,
        "starting run"
    );

    let mut driver = BatchDriver::new(
        solver,
        Arc::new(CsvSchemaSource::new(&cfg.paths.databases)),
        predictions,
        &cfg.paths.results_dir,
    )
    .with_policy(cfg.settings.on_failure)
    .with_store(store.clone(), run_id);

    let report = match driver.run(&questions, start, limit).await {
        Ok(r) => r,
        Err(e) => {
            store.finalize_run(run_id, "aborted", &serde_json::json!({ "error": e.to_string() }))?;
            return Err(e);
        }
    };

    let status = if report.summary.failed > 0 {
        "completed_with_failures"
    } else {
        "completed"
    };
    store.finalize_run(run_id, status, &serde_json::to_value(&report.summary)?)?;

    nl2sql_core::report::console::print_summary(&report.summary, &report.rows);
    eprintln!("predictions: {}", cfg.paths.predictions.display());

    if args.strict && report.summary.failed > 0 {
        return Ok(exit_codes::QUESTIONS_FAILED);
    }
    Ok(exit_codes::OK)
}

async fn cmd_solve(args: SolveArgs) -> anyhow::Result<i32> {
    let mut cfg = build::load_config(&args.common)?;
    build::apply_agent_args(&mut cfg, &args.agent);

    let store = if cfg.settings.cache {
        Some(build::open_store(&cfg.paths.store)?)
    } else {
        None
    };
    let agents = build::build_agents(&cfg, &args.agent, store.as_ref())?;
    let schema = CsvSchemaSource::new(&cfg.paths.databases).load(&args.db_id)?;

    let solver = Solver::new(
        SolverConfig {
            max_retries: cfg.settings.max_retries,
            plan: cfg.settings.plan,
        },
        agents,
        SqlRunner::new(&cfg.paths.databases),
        RunLog::open(&cfg.paths.log_file)?,
    );
    let question = Question {
        db_id: args.db_id.clone(),
        question: args.question.clone(),
        evidence: args.evidence.clone(),
        question_id: None,
    };

    match solver.solve(&question, &schema).await {
        Ok(solution) => {
            let sql = strip_db_qualifier(&solution.sql, &args.db_id);
            if args.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "sql": sql,
                        "entry": prediction_entry(&sql, &args.db_id),
                        "plan": solution.plan,
                        "initial_sql": solution.initial_sql,
                        "attempts": solution.attempts,
                        "history": solution.history,
                    }))?
                );
            } else {
                println!("{}", sql);
            }
            Ok(exit_codes::OK)
        }
        Err(failure) => match failure.error {
            SolveError::Database(SqlRunError::DatabaseNotFound { path }) => {
                eprintln!("config error: database {} does not exist", path.display());
                Ok(exit_codes::CONFIG_ERROR)
            }
            e => {
                eprintln!("FAILED: {}", e);
                Ok(exit_codes::QUESTIONS_FAILED)
            }
        },
    }
}

fn cmd_schema(args: SchemaArgs) -> anyhow::Result<i32> {
    let cfg = build::load_config(&args.common)?;
    match CsvSchemaSource::new(&cfg.paths.databases).load(&args.db_id) {
        Ok(schema) => {
            println!("{}", schema.render());
            Ok(exit_codes::OK)
        }
        Err(e) => {
            eprintln!("config error: {}", e);
            Ok(exit_codes::CONFIG_ERROR)
        }
    }
}

fn cmd_exec(args: ExecArgs) -> anyhow::Result<i32> {
    let cfg = build::load_config(&args.common)?;
    let runner = SqlRunner::new(&cfg.paths.databases);
    match runner.run_sql(&args.db_id, &args.sql, Some(args.max_rows)) {
        Ok(rows) => {
            println!("{}", serde_json::to_string_pretty(&rows)?);
            Ok(exit_codes::OK)
        }
        Err(SqlRunError::Execution(e)) => {
            eprintln!("{}", e);
            Ok(exit_codes::QUESTIONS_FAILED)
        }
        Err(e) => {
            eprintln!("config error: {}", e);
            Ok(exit_codes::CONFIG_ERROR)
        }
    }
}

fn cmd_runs(args: RunsArgs) -> anyhow::Result<i32> {
    let cfg = build::load_config(&args.common)?;
    let store = build::open_store(&cfg.paths.store)?;

    if let Some(run_id) = args.run_id {
        let rows = store.run_results(run_id)?;
        if rows.is_empty() {
            eprintln!("no results for run {}", run_id);
        }
        for r in rows {
            println!(
                "{}\t{}\t{:?}\tattempts={}\t{}",
                r.idx, r.db_id, r.status, r.attempts, r.sql
            );
        }
        return Ok(exit_codes::OK);
    }

    let runs = store.recent_runs(args.limit)?;
    if runs.is_empty() {
        eprintln!("no runs recorded in {}", cfg.paths.store.display());
    }
    for run in runs {
        let summary = run
            .summary
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "{}\t{}\t{}\t{}\t{}",
            run.id, run.started_at, run.status, run.dataset, summary
        );
    }
    Ok(exit_codes::OK)
}

fn write_file_if_missing(path: &Path, content: &str) -> anyhow::Result<()> {
    ensure_parent_dir(path)?;
    if !path.exists() {
        std::fs::write(path, content)?;
        eprintln!("created {}", path.display());
    } else {
        eprintln!("note: {} already exists (skipped)", path.display());
    }
    Ok(())
}

pub(crate) fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
