//! Platform locations and conventions

use crate::{OpenSpeechError, Result};
use std::path::{Path, PathBuf};

/// Application directory name under the platform data/config roots
pub const APP_DIR: &str = "OpenSpeech";

/// Per-user data directory (`%LOCALAPPDATA%\OpenSpeech`, `~/.local/share/OpenSpeech`)
pub fn user_data_dir() -> Result<PathBuf> {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .ok_or_else(|| OpenSpeechError::Config("could not determine local data directory".into()))
}

/// Per-user settings directory
pub fn user_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|d| d.join(APP_DIR))
        .ok_or_else(|| OpenSpeechError::Config("could not determine config directory".into()))
}

/// Machine-wide data directory
///
/// Honors `%ProgramData%` on Windows.
pub fn machine_data_dir() -> PathBuf {
    if cfg!(windows) {
        let root = std::env::var("PROGRAMDATA").unwrap_or_else(|_| "C:\\ProgramData".to_string());
        PathBuf::from(root).join(APP_DIR)
    } else {
        PathBuf::from("/var/lib/openspeech")
    }
}

/// File extension of loadable modules on this platform (`dll`, `so`, `dylib`)
pub fn module_extension() -> &'static str {
    std::env::consts::DLL_EXTENSION
}

/// True if `path` looks like a loadable module
pub fn is_module_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(module_extension()))
        .unwrap_or(false)
}
