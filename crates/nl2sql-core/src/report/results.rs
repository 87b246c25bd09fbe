use super::write_pretty_json;
use crate::model::ResultRecord;
use std::path::{Path, PathBuf};

/// `<dir>/<idx>_<db_id>.json`
pub fn result_path(dir: &Path, idx: usize, db_id: &str) -> PathBuf {
    dir.join(format!("{}_{}.json", idx, db_id))
}

pub fn write_result(
    dir: &Path,
    idx: usize,
    db_id: &str,
    record: &ResultRecord,
) -> anyhow::Result<PathBuf> {
    let path = result_path(dir, idx, db_id);
    write_pretty_json(&path, record)?;
    Ok(path)
}
