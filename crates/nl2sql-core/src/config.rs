use crate::agents::prompts::PromptOverrides;
use crate::errors::ConfigError;
use crate::on_error::FailurePolicy;
use crate::report::predictions::PredictionsFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod path_resolver;

pub const SUPPORTED_CONFIG_VERSION: u32 = 1;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

pub const ENV_DATASET: &str = "NL2SQL_DATASET";
pub const ENV_DB_DIR: &str = "NL2SQL_DB_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub version: u32,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub prompts: PromptOverrides,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: SUPPORTED_CONFIG_VERSION,
            paths: Paths::default(),
            agents: AgentsConfig::default(),
            settings: Settings::default(),
            prompts: PromptOverrides::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub dataset: PathBuf,
    /// Root holding `<db_id>/<db_id>.sqlite` and `<db_id>/database_description/`.
    pub databases: PathBuf,
    pub predictions: PathBuf,
    pub results_dir: PathBuf,
    pub log_file: PathBuf,
    pub store: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            dataset: PathBuf::from("data/mini_dev_sqlite.json"),
            databases: PathBuf::from("data/databases"),
            predictions: PathBuf::from("predictions.json"),
            results_dir: PathBuf::from("results"),
            log_file: PathBuf::from("logs/nl2sql.jsonl"),
            store: PathBuf::from(".nl2sql/runs.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleModel {
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl RoleModel {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            temperature: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    /// openai | gemini | replay
    pub provider: String,
    pub planner: RoleModel,
    pub nl2sql: RoleModel,
    pub refiner: RoleModel,
    /// Table selector; absent means the full schema is always used.
    pub selector: Option<RoleModel>,
    pub max_tokens: u32,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            planner: RoleModel::new("gpt-3.5-turbo"),
            nl2sql: RoleModel::new("gpt-4o-mini"),
            refiner: RoleModel::new("gpt-4o-mini"),
            selector: None,
            max_tokens: 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub max_retries: u32,
    pub plan: bool,
    pub timeout_seconds: u64,
    pub cache: bool,
    pub temperature: f32,
    pub predictions_format: PredictionsFormat,
    pub on_failure: FailurePolicy,
    pub start: usize,
    pub limit: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            plan: true,
            timeout_seconds: 60,
            cache: true,
            temperature: 0.0,
            predictions_format: PredictionsFormat::Array,
            on_failure: FailurePolicy::Sentinel,
            start: 0,
            limit: None,
        }
    }
}

pub fn load_config(path: &Path, strict: bool) -> Result<AppConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;
    let mut cfg = parse_config(&raw, strict)?;
    normalize_paths(&mut cfg, path);
    Ok(cfg)
}

pub fn parse_config(raw: &str, strict: bool) -> Result<AppConfig, ConfigError> {
    let mut ignored_keys = std::collections::BTreeSet::new();
    let deserializer = serde_yaml::Deserializer::from_str(raw);

    let cfg: AppConfig = serde_ignored::deserialize(deserializer, |path| {
        ignored_keys.insert(path.to_string());
    })
    .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;

    let meaningful: Vec<_> = ignored_keys
        .iter()
        .filter(|k| !k.starts_with('_') && !k.starts_with("x-"))
        .collect();
    if !meaningful.is_empty() {
        if strict {
            return Err(ConfigError(format!(
                "unknown fields in strict mode: {:?}",
                meaningful
            )));
        }
        tracing::warn!(fields = ?meaningful, "ignored unknown config fields");
    }

    if cfg.version != SUPPORTED_CONFIG_VERSION {
        return Err(ConfigError(format!(
            "unsupported config version {} (supported: {})",
            cfg.version, SUPPORTED_CONFIG_VERSION
        )));
    }
    if cfg.settings.timeout_seconds == 0 {
        return Err(ConfigError("settings.timeout_seconds must be > 0".into()));
    }

    Ok(cfg)
}

fn normalize_paths(cfg: &mut AppConfig, config_path: &Path) {
    let r = path_resolver::PathResolver::new(config_path);
    let p = &mut cfg.paths;
    for path in [
        &mut p.dataset,
        &mut p.databases,
        &mut p.predictions,
        &mut p.results_dir,
        &mut p.log_file,
        &mut p.store,
    ] {
        r.resolve(path);
    }
}

/// Applies `NL2SQL_DATASET` / `NL2SQL_DB_DIR` on top of the file values.
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup(ENV_DATASET).filter(|v| !v.trim().is_empty()) {
        cfg.paths.dataset = PathBuf::from(v);
    }
    if let Some(v) = lookup(ENV_DB_DIR).filter(|v| !v.trim().is_empty()) {
        cfg.paths.databases = PathBuf::from(v);
    }
}

pub const SAMPLE_CONFIG: &str = r#"version: 1
paths:
  dataset: data/mini_dev_sqlite.json
  databases: data/databases
  predictions: predictions.json
  results_dir: results
  log_file: logs/nl2sql.jsonl
  store: .nl2sql/runs.db
agents:
  provider: openai
  planner:
    model: gpt-3.5-turbo
  nl2sql:
    model: gpt-4o-mini
  refiner:
    model: gpt-4o-mini
  max_tokens: 1024
settings:
  max_retries: 3
  plan: true
  timeout_seconds: 60
  cache: true
  temperature: 0.0
  predictions_format: array
  on_failure: sentinel
"#;

pub fn write_sample_config(path: &Path) -> Result<(), ConfigError> {
    std::fs::write(path, SAMPLE_CONFIG)
        .map_err(|e| ConfigError(format!("failed to write sample config: {}", e)))?;
    Ok(())
}
