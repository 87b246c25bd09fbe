use assert_cmd::Command;
use nl2sql_core::agents::prompts::render_user_prompt;
use nl2sql_core::agents::{PromptContext, Role};
use nl2sql_core::schema::{CsvSchemaSource, SchemaSource};
use predicates::str::contains;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn nl2sql() -> Command {
    let mut cmd = Command::cargo_bin("nl2sql").unwrap();
    cmd.env_remove("NL2SQL_DATASET")
        .env_remove("NL2SQL_DB_DIR")
        .env_remove("OPENAI_API_KEY")
        .env_remove("GEMINI_API_KEY");
    cmd
}

fn write_workspace(dir: &Path) {
    let db = dir.join("databases/financial");
    fs::create_dir_all(db.join("database_description")).unwrap();
    fs::write(
        db.join("database_description/account.csv"),
        "original_column_name,column_description,data_format\n\
         account_id,the id of the account,integer\n",
    )
    .unwrap();
    let conn = rusqlite::Connection::open(db.join("financial.sqlite")).unwrap();
    conn.execute_batch(
        "CREATE TABLE account (account_id INTEGER PRIMARY KEY);
         INSERT INTO account VALUES (1), (2), (3);",
    )
    .unwrap();
    drop(conn);

    fs::write(
        dir.join("dev.json"),
        r#"[
  {"db_id": "financial", "question": "How many accounts are there?", "evidence": ""},
  {"db_id": "financial", "question": "Who owns account 7?", "evidence": ""}
]"#,
    )
    .unwrap();

    fs::write(
        dir.join("nl2sql.yaml"),
        r#"version: 1
paths:
  dataset: dev.json
  databases: databases
  predictions: out/predictions.json
  results_dir: out/results
  log_file: out/run.jsonl
  store: out/runs.db
settings:
  plan: false
  cache: false
  max_retries: 1
"#,
    )
    .unwrap();

    // only the first question has a recorded answer
    let schema = CsvSchemaSource::new(dir.join("databases"))
        .load("financial")
        .unwrap()
        .render();
    let prompt = render_user_prompt(
        Role::Nl2Sql,
        &PromptContext {
            question: "How many accounts are there?",
            schema: &schema,
            ..Default::default()
        },
    );
    let line = serde_json::json!({
        "prompt": prompt,
        "response": "```sql\nSELECT count(*) FROM account\n```",
        "role": "nl2sql",
    });
    fs::write(dir.join("replay.jsonl"), format!("{}\n", line)).unwrap();
}

#[test]
fn version_prints_package_version() {
    nl2sql()
        .arg("version")
        .assert()
        .success()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn init_writes_sample_config_once() {
    let dir = TempDir::new().unwrap();
    let cfg = dir.path().join("nl2sql.yaml");

    nl2sql()
        .arg("init")
        .arg("--config")
        .arg(&cfg)
        .assert()
        .success()
        .stderr(contains("created"));
    assert!(fs::read_to_string(&cfg).unwrap().starts_with("version: 1"));

    nl2sql()
        .arg("init")
        .arg("--config")
        .arg(&cfg)
        .assert()
        .success()
        .stderr(contains("already exists"));
}

#[test]
fn schema_and_exec_commands() {
    let dir = TempDir::new().unwrap();
    write_workspace(dir.path());
    let cfg = dir.path().join("nl2sql.yaml");

    nl2sql()
        .args(["schema", "financial", "--config"])
        .arg(&cfg)
        .assert()
        .success()
        .stdout(contains("Allowed Tables: account"))
        .stdout(contains("account_id (integer): the id of the account"));

    nl2sql()
        .args(["schema", "toxicology", "--config"])
        .arg(&cfg)
        .assert()
        .code(2)
        .stderr(contains("database_description"));

    nl2sql()
        .args(["exec", "--db-id", "financial", "SELECT count(*) AS n FROM account", "--config"])
        .arg(&cfg)
        .assert()
        .success()
        .stdout(contains("\"n\""));

    nl2sql()
        .args(["exec", "--db-id", "financial", "SELECT nope FROM account", "--config"])
        .arg(&cfg)
        .assert()
        .code(1)
        .stderr(contains("OperationalError"));
}

#[test]
fn run_with_replay_records_every_question() {
    let dir = TempDir::new().unwrap();
    write_workspace(dir.path());
    let cfg = dir.path().join("nl2sql.yaml");

    nl2sql()
        .arg("run")
        .arg("--config")
        .arg(&cfg)
        .arg("--replay-file")
        .arg(dir.path().join("replay.jsonl"))
        .arg("--strict")
        .assert()
        .code(1)
        .stderr(contains("processed=2 solved=1 refined=0 failed=1"));

    let preds: Vec<String> = serde_json::from_str(
        &fs::read_to_string(dir.path().join("out/predictions.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(
        preds,
        vec![
            "SELECT count(*) FROM account\t----- bird -----\tfinancial",
            "FAILED\t----- bird -----\tfinancial",
        ]
    );
    assert!(dir.path().join("out/results/1_financial.json").exists());

    nl2sql()
        .args(["runs", "--config"])
        .arg(&cfg)
        .assert()
        .success()
        .stdout(contains("completed_with_failures"));
}

#[test]
fn missing_api_key_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    write_workspace(dir.path());

    nl2sql()
        .args(["solve", "--db-id", "financial", "--question", "How many?", "--config"])
        .arg(dir.path().join("nl2sql.yaml"))
        .assert()
        .code(2)
        .stderr(contains("OPENAI_API_KEY"));
}
