//! Central path resolution for cc-slack data files.
//!
//! Resolved once at startup from: CLI `--data-dir` (or `CC_SLACK_DATA_DIR`) > `~/.cc-slack`.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

static DATA_DIR: RwLock<Option<PathBuf>> = RwLock::new(None);

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".cc-slack"))
        .unwrap_or_else(|| std::env::temp_dir().join("cc-slack"))
}

/// Initialize the global data directory. Returns the resolved path.
pub fn init_data_dir(explicit: Option<&Path>) -> PathBuf {
    let dir = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(default_data_dir);

    let mut guard = DATA_DIR.write().unwrap_or_else(PoisonError::into_inner);
    *guard = Some(dir.clone());
    dir
}

/// Current data directory; the home default if `init_data_dir` hasn't run.
pub fn data_dir() -> PathBuf {
    DATA_DIR
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .unwrap_or_else(default_data_dir)
}

pub fn log_dir() -> PathBuf {
    data_dir().join("logs")
}
