// fusion_sim/src/simulation/config/catalog.rs

//! Finds the measurement logs to replay.

use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Extension of measurement log files.
const LOG_EXTENSION: &str = "txt";

/// Returns `root` itself if it is a file, or every `*.txt` file below it
/// (sorted, so runs are reproducible) if it is a directory.
pub fn discover_logs(root: &Path) -> Vec<PathBuf> {
    if root.is_file() {
        return vec![root.to_path_buf()];
    }
    if !root.exists() {
        warn!("Log path not found at {:?}, nothing to replay.", root);
        return Vec::new();
    }

    info!("Discovering measurement logs under: {:?}", root);

    let mut logs: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| {
            !e.file_type().is_dir()
                && e.path()
                    .extension()
                    .map_or(false, |ext| ext == LOG_EXTENSION)
        })
        .map(|e| e.into_path())
        .collect();
    logs.sort();
    logs
}
