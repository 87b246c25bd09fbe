use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "nl2sql",
    version,
    about = "Multi-agent natural language to SQL runner for BIRD-style benchmarks"
)]
pub struct Cli {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Solve every question of the dataset and write predictions
    Run(RunArgs),
    /// Solve a single question
    Solve(SolveArgs),
    /// Print the schema description handed to the agents
    Schema(SchemaArgs),
    /// Execute SQL read-only against a benchmark database
    Exec(ExecArgs),
    /// List recorded runs
    Runs(RunsArgs),
    Init(InitArgs),
    Version,
}

#[derive(clap::Args, Clone)]
pub struct ConfigArgs {
    #[arg(long, default_value = "nl2sql.yaml")]
    pub config: PathBuf,

    /// Fail on unknown config keys instead of warning
    #[arg(long)]
    pub strict_config: bool,

    /// Root of `<db_id>/<db_id>.sqlite` and `<db_id>/database_description/`
    #[arg(long)]
    pub db_dir: Option<PathBuf>,
}

#[derive(clap::Args, Clone)]
pub struct AgentArgs {
    /// openai | gemini | replay
    #[arg(long)]
    pub provider: Option<String>,

    /// JSONL file of recorded completions; implies `--provider replay`
    #[arg(long)]
    pub replay_file: Option<PathBuf>,

    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Skip the planner call
    #[arg(long)]
    pub no_plan: bool,

    /// Do not read or write the completion cache
    #[arg(long)]
    pub no_cache: bool,

    /// Call the provider even on a cache hit and store the fresh answer
    #[arg(long)]
    pub refresh_cache: bool,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Override the OpenAI-compatible endpoint
    #[arg(long, env = "OPENAI_BASE_URL")]
    pub openai_base_url: Option<String>,

    /// Override the Gemini endpoint
    #[arg(long, env = "GEMINI_BASE_URL")]
    pub gemini_base_url: Option<String>,
}

#[derive(Parser, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub common: ConfigArgs,

    #[command(flatten)]
    pub agent: AgentArgs,

    #[arg(long)]
    pub dataset: Option<PathBuf>,

    #[arg(long)]
    pub predictions: Option<PathBuf>,

    #[arg(long)]
    pub results_dir: Option<PathBuf>,

    /// First dataset index to process
    #[arg(long)]
    pub start: Option<usize>,

    /// Maximum number of questions to process
    #[arg(long)]
    pub limit: Option<usize>,

    /// sentinel | best_effort
    #[arg(long)]
    pub on_failure: Option<String>,

    /// Exit 1 when any question failed
    #[arg(long)]
    pub strict: bool,

    /// Replace the predictions file instead of continuing it
    #[arg(long)]
    pub fresh: bool,
}

#[derive(Parser, Clone)]
pub struct SolveArgs {
    #[command(flatten)]
    pub common: ConfigArgs,

    #[command(flatten)]
    pub agent: AgentArgs,

    #[arg(long)]
    pub db_id: String,

    #[arg(long)]
    pub question: String,

    #[arg(long, default_value = "")]
    pub evidence: String,

    /// Print the full solution as JSON instead of the bare SQL
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Clone)]
pub struct SchemaArgs {
    #[command(flatten)]
    pub common: ConfigArgs,

    pub db_id: String,
}

#[derive(Parser, Clone)]
pub struct ExecArgs {
    #[command(flatten)]
    pub common: ConfigArgs,

    #[arg(long)]
    pub db_id: String,

    pub sql: String,

    #[arg(long, default_value_t = 50)]
    pub max_rows: usize,
}

#[derive(Parser, Clone)]
pub struct RunsArgs {
    #[command(flatten)]
    pub common: ConfigArgs,

    #[arg(long, default_value_t = 10)]
    pub limit: u32,

    /// Show per-question rows of one run
    #[arg(long)]
    pub run_id: Option<i64>,
}

#[derive(Parser, Clone)]
pub struct InitArgs {
    #[arg(long, default_value = "nl2sql.yaml")]
    pub config: PathBuf,

    /// Also write a .gitignore for generated outputs
    #[arg(long)]
    pub gitignore: bool,
}
