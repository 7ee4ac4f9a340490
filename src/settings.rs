//! Host settings
//!
//! Where things live on this machine: plugin directory, voice directory,
//! descriptor files, the playback module, and how secrets are protected.
//! Kept in an INI file separate from the engine configuration document.

use crate::config::{ProtectionScope, CONFIG_FILE_NAME};
use crate::platform;
use crate::{OpenSpeechError, Result};
use ini::Ini;
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Settings file name inside the per-user config directory
pub const SETTINGS_FILE_NAME: &str = "openspeech.cfg";

/// Host settings
pub struct Settings {
    /// INI configuration storage
    ini: Ini,

    /// Settings file path
    path: PathBuf,
}

impl Settings {
    /// Load settings from the default location, creating it on first run
    pub fn load() -> Result<Self> {
        let path = platform::user_config_dir()?.join(SETTINGS_FILE_NAME);
        Self::load_from(path)
    }

    /// Load settings from `path`, writing defaults there if it is missing
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        debug!("Loading settings from {:?}", path);

        let ini = if path.exists() {
            Ini::load_from_file(&path)
                .map_err(|e| OpenSpeechError::Config(format!("Failed to load settings: {}", e)))?
        } else {
            info!("Settings file not found, creating default");
            let default = Self::default_settings()?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            default
                .write_to_file(&path)
                .map_err(|e| OpenSpeechError::Config(format!("Failed to write settings: {}", e)))?;
            default
        };

        Ok(Self { ini, path })
    }

    /// Settings that are never written anywhere
    pub fn in_memory(root: &Path) -> Self {
        let mut ini = Ini::new();
        let root_str = |name: &str| root.join(name).display().to_string();
        ini.with_section(Some("paths"))
            .set("config_file", root_str(CONFIG_FILE_NAME))
            .set("plugin_dir", root_str("plugins"))
            .set("descriptor_dir", root_str("voice_configs"))
            .set("voice_directory", root_str("voices.ini"))
            .set("models_dir", root_str("models"))
            .set("models_catalog", root_str("merged_models.json"))
            .set("key_file", root_str("secret.key"));
        ini.with_section(Some("discovery"))
            .set("scan_subdirectories", "true");
        ini.with_section(Some("security"))
            .set("protection_scope", "user");
        Self {
            ini,
            path: root.join(SETTINGS_FILE_NAME),
        }
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<()> {
        debug!("Saving settings to {:?}", self.path);
        self.ini
            .write_to_file(&self.path)
            .map_err(|e| OpenSpeechError::Config(format!("Failed to save settings: {}", e)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn default_settings() -> Result<Ini> {
        let data = platform::user_data_dir()?;
        let data_str = |name: &str| data.join(name).display().to_string();

        let mut ini = Ini::new();
        ini.with_section(Some("paths"))
            .set("config_file", data_str(CONFIG_FILE_NAME))
            .set("plugin_dir", data_str("plugins"))
            .set("descriptor_dir", data_str("voice_configs"))
            .set("models_dir", data_str("models"))
            .set("models_catalog", data_str("merged_models.json"));
        // Left unset on Windows so voices land in the system token hive
        #[cfg(not(windows))]
        ini.with_section(Some("paths"))
            .set("voice_directory", data_str("voices.ini"));
        ini.with_section(Some("discovery"))
            .set("scan_subdirectories", "true");
        ini.with_section(Some("security"))
            .set("protection_scope", "user");
        Ok(ini)
    }

    /// Get a boolean value
    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Get a string value
    pub fn get_string(&self, section: &str, key: &str, default: &str) -> String {
        self.ini
            .get_from(Some(section), key)
            .unwrap_or(default)
            .to_string()
    }

    /// Get a path value; empty counts as unset
    pub fn get_path(&self, section: &str, key: &str) -> Option<PathBuf> {
        self.ini
            .get_from(Some(section), key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }

    /// Set a value
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.ini.with_section(Some(section)).set(key, value);
    }

    fn data_path(&self, key: &str, fallback: &str) -> Result<PathBuf> {
        match self.get_path("paths", key) {
            Some(path) => Ok(path),
            None => Ok(platform::user_data_dir()?.join(fallback)),
        }
    }

    // Host-specific getters

    /// Engine configuration document
    pub fn config_file(&self) -> Result<PathBuf> {
        self.data_path("config_file", CONFIG_FILE_NAME)
    }

    /// Directory scanned for engine plugins
    pub fn plugin_dir(&self) -> Result<PathBuf> {
        self.data_path("plugin_dir", "plugins")
    }

    /// Where auxiliary voice descriptors are written
    pub fn descriptor_dir(&self) -> Result<PathBuf> {
        self.data_path("descriptor_dir", "voice_configs")
    }

    /// INI voice directory; unset on Windows means the system token hive
    pub fn voice_directory(&self) -> Option<PathBuf> {
        self.get_path("paths", "voice_directory")
    }

    /// Playback module recorded on registered voices
    pub fn playback_module(&self) -> Option<String> {
        Some(self.get_string("paths", "playback_module", ""))
            .filter(|s| !s.trim().is_empty())
    }

    pub fn models_dir(&self) -> Result<PathBuf> {
        self.data_path("models_dir", "models")
    }

    pub fn models_catalog(&self) -> Result<PathBuf> {
        self.data_path("models_catalog", "merged_models.json")
    }

    /// Look in vendor subdirectories during discovery?
    pub fn scan_subdirectories(&self) -> bool {
        self.get_bool("discovery", "scan_subdirectories", true)
    }

    /// Who can open protected secrets; unknown values mean current user
    pub fn protection_scope(&self) -> ProtectionScope {
        ProtectionScope::parse(&self.get_string("security", "protection_scope", "user"))
            .unwrap_or(ProtectionScope::CurrentUser)
    }

    /// Explicit key file overriding the scope default
    pub fn key_file(&self) -> Option<PathBuf> {
        self.get_path("security", "key_file")
            .or_else(|| self.get_path("paths", "key_file"))
    }
}
