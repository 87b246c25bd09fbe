use crate::model::LlmResponse;
use crate::providers::llm::LlmClient;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Offline client answering from a JSONL file of recorded completions.
///
/// One object per line: `{"prompt": "...", "response": "..."}` with optional
/// `model` and `meta`; other fields are ignored. Lookups are by exact user
/// prompt.
#[derive(Clone)]
pub struct ReplayClient {
    entries: Arc<HashMap<String, LlmResponse>>,
}

impl ReplayClient {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to open replay file {}: {}", path.display(), e))?;
        Self::from_jsonl(&raw)
    }

    pub fn from_jsonl(raw: &str) -> anyhow::Result<Self> {
        #[derive(serde::Deserialize)]
        struct ReplayEntry {
            prompt: String,
            text: Option<String>,
            response: Option<String>,
            #[serde(default)]
            meta: serde_json::Value,
            model: Option<String>,
        }

        let mut entries = HashMap::new();

        for (i, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let entry: ReplayEntry = serde_json::from_str(line)
                .map_err(|e| anyhow::anyhow!("line {}: failed to parse replay entry: {}", i + 1, e))?;

            let text = match entry.text.or(entry.response) {
                Some(t) => t,
                None => anyhow::bail!("line {}: missing `text`/`response` field", i + 1),
            };

            if entries.contains_key(&entry.prompt) {
                anyhow::bail!("line {}: duplicate prompt in replay file", i + 1);
            }

            entries.insert(
                entry.prompt,
                LlmResponse {
                    text,
                    provider: "replay".into(),
                    model: entry.model.unwrap_or_else(|| "replay".into()),
                    cached: false,
                    meta: entry.meta,
                },
            );
        }

        Ok(Self {
            entries: Arc::new(entries),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl LlmClient for ReplayClient {
    async fn complete(&self, _system: &str, prompt: &str) -> anyhow::Result<LlmResponse> {
        self.entries
            .get(prompt)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("replay miss: prompt not found in replay file"))
    }

    fn provider_name(&self) -> &'static str {
        "replay"
    }

    fn model(&self) -> &str {
        "replay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn answers_recorded_prompts() -> anyhow::Result<()> {
        let client = ReplayClient::from_jsonl(
            r#"{"prompt": "p1", "response": "SELECT 1", "role": "nl2sql"}

{"prompt": "p2", "text": "SELECT 2"}
"#,
        )?;
        assert_eq!(client.len(), 2);
        let r = client.complete("ignored", "p1").await?;
        assert_eq!(r.text, "SELECT 1");
        assert_eq!(r.provider, "replay");
        assert!(client.complete("", "p3").await.is_err());
        Ok(())
    }

    #[test]
    fn rejects_duplicates_and_missing_text() {
        let dup = r#"{"prompt": "p", "response": "a"}
{"prompt": "p", "response": "b"}"#;
        assert!(ReplayClient::from_jsonl(dup)
            .err()
            .unwrap()
            .to_string()
            .contains("duplicate prompt"));

        let missing = r#"{"prompt": "p"}"#;
        assert!(ReplayClient::from_jsonl(missing)
            .err()
            .unwrap()
            .to_string()
            .contains("missing `text`/`response`"));
    }
}
