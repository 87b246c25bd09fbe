//! Role-labelled agents: a fixed preamble per role bound to an LLM client.

use crate::providers::llm::LlmClient;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::{timeout, Duration};

pub mod clean;
pub mod prompts;

use prompts::RolePrompts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "planner")]
    Planner,
    #[serde(rename = "selector")]
    Selector,
    #[serde(rename = "nl2sql")]
    Nl2Sql,
    #[serde(rename = "refiner")]
    Refiner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Planner => "planner",
            Role::Selector => "selector",
            Role::Nl2Sql => "nl2sql",
            Role::Refiner => "refiner",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a role may see on one call.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptContext<'a> {
    pub question: &'a str,
    pub schema: &'a str,
    pub evidence: &'a str,
    pub plan: &'a str,
    pub sql: &'a str,
    pub error: &'a str,
    pub error_class: &'a str,
}

/// Dispatches `complete(role, context)` to the client configured for the role.
#[derive(Clone)]
pub struct AgentSet {
    clients: HashMap<Role, Arc<dyn LlmClient>>,
    prompts: RolePrompts,
    call_timeout: Duration,
}

impl AgentSet {
    pub fn new(prompts: RolePrompts, call_timeout: Duration) -> Self {
        Self {
            clients: HashMap::new(),
            prompts,
            call_timeout,
        }
    }

    pub fn with_client(mut self, role: Role, client: Arc<dyn LlmClient>) -> Self {
        self.clients.insert(role, client);
        self
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.clients.contains_key(&role)
    }

    /// Raw response text of `role`; callers clean it.
    pub async fn complete(&self, role: Role, ctx: &PromptContext<'_>) -> anyhow::Result<String> {
        let client = self
            .clients
            .get(&role)
            .ok_or_else(|| anyhow::anyhow!("config error: no client configured for {}", role))?;

        let system = self.prompts.preamble(role);
        let prompt = prompts::render_user_prompt(role, ctx);

        let resp = timeout(self.call_timeout, client.complete(system, &prompt))
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "{} call to {} timed out after {:?}",
                    role,
                    client.provider_name(),
                    self.call_timeout
                )
            })??;

        tracing::debug!(
            role = %role,
            provider = %resp.provider,
            model = %resp.model,
            cached = resp.cached,
            "agent response"
        );
        Ok(resp.text.trim().to_string())
    }
}
