pub mod console;
pub mod predictions;
pub mod results;
pub mod run_log;

use serde::{Deserialize, Serialize};

/// Counts for one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub processed: usize,
    pub solved_first_try: usize,
    pub solved_after_refine: usize,
    pub failed: usize,
}

/// Writes `value` as 2-space indented JSON, replacing the file.
pub(crate) fn write_pretty_json<T: Serialize + ?Sized>(
    path: &std::path::Path,
    value: &T,
) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut body = serde_json::to_string_pretty(value)?;
    body.push('\n');
    std::fs::write(path, body)
        .map_err(|e| anyhow::anyhow!("failed to write {}: {}", path.display(), e))
}
