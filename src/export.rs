use std::env;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::info;

use crate::errors::{Error, Result};

pub fn resolve_export_dir() -> PathBuf {
    if let Ok(dir) = env::var("DAILY_QUEST_EXPORT_DIR") {
        return PathBuf::from(dir);
    }
    PathBuf::from(".")
}

pub fn export_file_name(timeframe_days: u32) -> String {
    format!("daily_quest_export_{timeframe_days}days.json")
}

/// Client-side counterpart of the browser blob download: the payload
/// arrives as arbitrary JSON and lands pretty-printed on disk.
pub async fn write_export(
    dir: &Path,
    timeframe_days: u32,
    payload: &serde_json::Value,
) -> Result<PathBuf> {
    let path = dir.join(export_file_name(timeframe_days));
    let bytes = serde_json::to_vec_pretty(payload)
        .map_err(|err| Error::Export(err.to_string()))?;
    fs::write(&path, bytes)
        .await
        .map_err(|err| Error::Export(format!("write {}: {err}", path.display())))?;
    info!(path = %path.display(), "export written");
    Ok(path)
}
