use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::Result;

/// File name pattern shared with the web client's download action.
pub fn summary_file_name(task_id: &str) -> String {
    format!("summary_{task_id}.txt")
}

/// Default directory for exported summaries: the platform download dir,
/// falling back to the current directory.
pub fn default_export_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Write a task's summary text to `summary_<taskId>.txt` under `dir`.
/// Purely local; no server round-trip.
pub async fn export_summary(dir: &Path, task_id: &str, text: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir).await?;
    let path = dir.join(summary_file_name(task_id));
    fs::write(&path, text).await?;
    Ok(path)
}
