use crate::cli::args::{AgentArgs, ConfigArgs};
use nl2sql_core::agents::prompts::RolePrompts;
use nl2sql_core::agents::{AgentSet, Role};
use nl2sql_core::config::{self, AppConfig, RoleModel};
use nl2sql_core::errors::ConfigError;
use nl2sql_core::providers::llm::cached::CachedClient;
use nl2sql_core::providers::llm::gemini::GeminiClient;
use nl2sql_core::providers::llm::openai::OpenAIClient;
use nl2sql_core::providers::llm::LlmClient;
use nl2sql_core::providers::replay::ReplayClient;
use nl2sql_core::storage::Store;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// File values, then `NL2SQL_*` env, then flags. A missing config file
/// means built-in defaults.
pub fn load_config(args: &ConfigArgs) -> anyhow::Result<AppConfig> {
    let mut cfg = if args.config.exists() {
        config::load_config(&args.config, args.strict_config)?
    } else {
        tracing::debug!(path = %args.config.display(), "no config file; using defaults");
        AppConfig::default()
    };
    config::apply_env_overrides(&mut cfg, |k| std::env::var(k).ok());
    if let Some(dir) = &args.db_dir {
        cfg.paths.databases = dir.clone();
    }
    Ok(cfg)
}

/// Folds agent flags into the loaded settings.
pub fn apply_agent_args(cfg: &mut AppConfig, args: &AgentArgs) {
    if let Some(p) = &args.provider {
        cfg.agents.provider = p.clone();
    }
    if args.replay_file.is_some() {
        cfg.agents.provider = "replay".into();
    }
    if let Some(n) = args.max_retries {
        cfg.settings.max_retries = n;
    }
    if args.no_plan {
        cfg.settings.plan = false;
    }
    if args.no_cache {
        cfg.settings.cache = false;
    }
}

pub fn open_store(path: &Path) -> anyhow::Result<Store> {
    super::ensure_parent_dir(path)?;
    let store = Store::open(path)?;
    store.init_schema()?;
    Ok(store)
}

pub fn build_agents(
    cfg: &AppConfig,
    args: &AgentArgs,
    store: Option<&Store>,
) -> anyhow::Result<AgentSet> {
    let prompts = RolePrompts::from_overrides(&cfg.prompts);
    let mut agents = AgentSet::new(prompts, Duration::from_secs(cfg.settings.timeout_seconds));

    if cfg.agents.provider == "replay" {
        let path = args
            .replay_file
            .as_ref()
            .ok_or_else(|| ConfigError("provider replay requires --replay-file".into()))?;
        let client = ReplayClient::from_path(path)?;
        if client.is_empty() {
            tracing::warn!(path = %path.display(), "replay file has no entries");
        } else {
            tracing::info!(path = %path.display(), entries = client.len(), "loaded replay file");
        }
        let replay: Arc<dyn LlmClient> = Arc::new(client);
        for role in [Role::Planner, Role::Nl2Sql, Role::Refiner] {
            agents = agents.with_client(role, replay.clone());
        }
        if cfg.agents.selector.is_some() {
            agents = agents.with_client(Role::Selector, replay);
        }
        return Ok(agents);
    }

    let mut roles = vec![
        (Role::Planner, &cfg.agents.planner),
        (Role::Nl2Sql, &cfg.agents.nl2sql),
        (Role::Refiner, &cfg.agents.refiner),
    ];
    if let Some(selector) = &cfg.agents.selector {
        roles.push((Role::Selector, selector));
    }

    for (role, rm) in roles {
        let mut client = provider_client(cfg, rm, args)?;
        if cfg.settings.cache {
            if let Some(store) = store {
                client = Arc::new(
                    CachedClient::new(client, store.clone()).refreshing(args.refresh_cache),
                );
            }
        }
        agents = agents.with_client(role, client);
    }
    Ok(agents)
}

fn provider_client(
    cfg: &AppConfig,
    rm: &RoleModel,
    args: &AgentArgs,
) -> anyhow::Result<Arc<dyn LlmClient>> {
    let temperature = rm.temperature.unwrap_or(cfg.settings.temperature);
    let max_tokens = cfg.agents.max_tokens;

    match cfg.agents.provider.as_str() {
        "openai" => {
            let key = args
                .openai_api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| ConfigError("OPENAI_API_KEY is not set".into()))?;
            let mut client = OpenAIClient::new(rm.model.clone(), key, temperature, max_tokens);
            if let Some(url) = &args.openai_base_url {
                client = client.with_base_url(url.clone());
            }
            Ok(Arc::new(client))
        }
        "gemini" => {
            let key = args
                .gemini_api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| ConfigError("GEMINI_API_KEY is not set".into()))?;
            let mut client = GeminiClient::new(rm.model.clone(), key, temperature, max_tokens);
            if let Some(url) = &args.gemini_base_url {
                client = client.with_base_url(url.clone());
            }
            Ok(Arc::new(client))
        }
        other => Err(ConfigError(format!(
            "unknown provider '{}' (expected openai, gemini or replay)",
            other
        ))
        .into()),
    }
}
