use sha2::{Digest, Sha256};

/// Cache key of one completion: provider, model, preamble and user message.
pub fn cache_key(provider: &str, model: &str, system: &str, prompt: &str) -> String {
    let mut h = Sha256::new();
    h.update(provider.as_bytes());
    h.update(b"\n");
    h.update(model.as_bytes());
    h.update(b"\n");
    h.update(system.as_bytes());
    h.update(b"\n");
    h.update(prompt.as_bytes());
    hex::encode(h.finalize())
}
