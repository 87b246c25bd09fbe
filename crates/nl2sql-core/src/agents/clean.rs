//! Defensive post-processing of agent output. Agents are told to return bare
//! SQL but routinely wrap it in Markdown or prefix it with directives.

use regex::Regex;
use std::sync::OnceLock;

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\s*```(?:[ \t]*(?:sqlite|sql)\b)?\s*").expect("fence regex is valid")
    })
}

fn directive_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:final\b\s*:?\s*)?(?:sql\s*:\s*)?").expect("directive regex is valid")
    })
}

fn list_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:[-*]|\d+[.)])\s+").expect("list marker regex is valid"))
}

/// Removes ```` ``` ```` / ```` ```sql ```` markers and the whitespace hugging
/// them; the statement between them is left as is.
pub fn strip_code_fences(text: &str) -> String {
    fence_re().replace_all(text, "\n").trim().to_string()
}

/// Drops a leading `FINAL` token and a `SQL:` label.
pub fn strip_directives(text: &str) -> String {
    directive_re().replace(text, "").trim().to_string()
}

pub fn clean_sql(raw: &str) -> String {
    strip_directives(&strip_code_fences(raw))
}

/// Removes every literal `"<db_id>."` qualifier the models like to add.
pub fn strip_db_qualifier(sql: &str, db_id: &str) -> String {
    if db_id.is_empty() {
        return sql.trim().to_string();
    }
    sql.replace(&format!("{}.", db_id), "").trim().to_string()
}

/// Table names out of a selector reply such as `account, loan` or a bullet list.
pub fn parse_table_list(text: &str) -> Vec<String> {
    strip_code_fences(text)
        .split([',', '\n', ';'])
        .map(|s| {
            let s = s.trim();
            list_marker_re()
                .replace(s, "")
                .trim_matches(|c: char| c == '`' || c == '"' || c == '\'' || c.is_whitespace())
                .to_string()
        })
        .filter(|s| !s.is_empty())
        .collect()
}
