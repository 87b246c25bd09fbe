use super::{PromptContext, Role};
use serde::{Deserialize, Serialize};

pub const PLANNER_PREAMBLE: &str = "You are a Planner agent that helps break down a user's database query question into a plan. \
Analyze the question and outline an approach to find the answer using SQL. \
Include which tables and columns to use, any necessary joins or filters, and the general strategy. \
Do NOT write the final SQL query.";

pub const SELECTOR_PREAMBLE: &str = "You are a Selector agent. Given a database schema and a question, \
return only the names of the tables needed to answer the question, separated by commas. \
Do not provide any explanation.";

pub const NL2SQL_PREAMBLE: &str = "You are an NL2SQL Agent, an expert at writing SQL queries for a SQLite database. \
You will be given a database schema, a question, and possibly a plan and evidence. \
Use only tables and columns present in the schema and never prefix table names with the database name. \
Do not include any explanation, only return the SQL query.";

pub const REFINER_PREAMBLE: &str = "You are a Critic agent who repairs SQL queries for a SQLite database. \
You will be given a question, the database schema, a SQL query and the error the database raised when executing it. \
Respond with a corrected SQL query that executes without this error and answers the question. \
Do not provide any explanation or additional text, only output the new SQL.";

/// Preamble overrides from the config file; unset roles keep the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptOverrides {
    pub planner: Option<String>,
    pub selector: Option<String>,
    pub nl2sql: Option<String>,
    pub refiner: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RolePrompts {
    planner: String,
    selector: String,
    nl2sql: String,
    refiner: String,
}

impl Default for RolePrompts {
    fn default() -> Self {
        Self::from_overrides(&PromptOverrides::default())
    }
}

impl RolePrompts {
    pub fn from_overrides(o: &PromptOverrides) -> Self {
        let pick = |v: &Option<String>, d: &str| {
            v.as_deref()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(d)
                .to_string()
        };
        Self {
            planner: pick(&o.planner, PLANNER_PREAMBLE),
            selector: pick(&o.selector, SELECTOR_PREAMBLE),
            nl2sql: pick(&o.nl2sql, NL2SQL_PREAMBLE),
            refiner: pick(&o.refiner, REFINER_PREAMBLE),
        }
    }

    pub fn preamble(&self, role: Role) -> &str {
        match role {
            Role::Planner => &self.planner,
            Role::Selector => &self.selector,
            Role::Nl2Sql => &self.nl2sql,
            Role::Refiner => &self.refiner,
        }
    }
}

/// Per-call user message. Empty context parts are left out.
pub fn render_user_prompt(role: Role, ctx: &PromptContext<'_>) -> String {
    let mut parts: Vec<String> = Vec::new();
    let schema = ctx.schema.trim();
    let mut push = |label: &str, value: &str| {
        if !value.trim().is_empty() {
            parts.push(format!("{}{}", label, value.trim()));
        }
    };

    match role {
        Role::Planner => {
            push("Database Schema:\n", schema);
            push("Question: ", ctx.question);
            push("Evidence: ", ctx.evidence);
            push("", "Outline the plan.");
        }
        Role::Selector => {
            push("Database Schema:\n", schema);
            push("Question: ", ctx.question);
            push("Evidence: ", ctx.evidence);
            push("", "List the tables needed to answer the question.");
        }
        Role::Nl2Sql => {
            push("Database Schema:\n", schema);
            push("Question: ", ctx.question);
            push("Plan: ", ctx.plan);
            push("Evidence: ", ctx.evidence);
            push("", "Now write the final SQL query.");
        }
        Role::Refiner => {
            push("Question: ", ctx.question);
            push("Database Schema:\n", schema);
            push("Evidence: ", ctx.evidence);
            push("SQL Query: ", ctx.sql);
            let label = if ctx.error_class.trim().is_empty() {
                "Database Error: ".to_string()
            } else {
                format!("Database Error ({}): ", ctx.error_class.trim())
            };
            push(&label, ctx.error);
            push("", "Return the corrected SQL query.");
        }
    }

    parts.join("\n")
}
