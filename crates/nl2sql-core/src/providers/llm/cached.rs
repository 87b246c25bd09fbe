use super::LlmClient;
use crate::cache::key::cache_key;
use crate::model::LlmResponse;
use crate::storage::Store;
use async_trait::async_trait;
use std::sync::Arc;

/// Serves repeated completions from the run store.
pub struct CachedClient {
    inner: Arc<dyn LlmClient>,
    store: Store,
    refresh: bool,
}

impl CachedClient {
    pub fn new(inner: Arc<dyn LlmClient>, store: Store) -> Self {
        Self {
            inner,
            store,
            refresh: false,
        }
    }

    /// Always call the provider but still record the fresh response.
    pub fn refreshing(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }
}

#[async_trait]
impl LlmClient for CachedClient {
    async fn complete(&self, system: &str, prompt: &str) -> anyhow::Result<LlmResponse> {
        let key = cache_key(
            self.inner.provider_name(),
            self.inner.model(),
            system,
            prompt,
        );

        if !self.refresh {
            if let Some(hit) = self.store.cache_get(&key)? {
                return Ok(hit);
            }
        }

        let resp = self.inner.complete(system, prompt).await?;
        self.store.cache_put(&key, &resp)?;
        Ok(resp)
    }

    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }
}
