//! Persisted engine configuration document
//!
//! ```json
//! {
//!   "engines": { "AzureTTS": { "enabled": false, "parameters": { "region": "eastus" } } },
//!   "defaultEngine": "SherpaOnnx",
//!   "secureStorage": true,
//!   "lastUpdated": "2024-01-01T00:00:00Z"
//! }
//! ```

use crate::engine::builtin::{azure, pipe, rest, sherpa};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for a single engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfigEntry {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Parameter values; secrets are decrypted in memory and sealed on disk
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl Default for EngineConfigEntry {
    fn default() -> Self {
        Self {
            enabled: true,
            parameters: BTreeMap::new(),
        }
    }
}

impl EngineConfigEntry {
    pub fn disabled_with(params: &[(&str, &str)]) -> Self {
        Self {
            enabled: false,
            parameters: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// Configuration for every engine plus global policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfiguration {
    #[serde(default)]
    pub engines: BTreeMap<String, EngineConfigEntry>,

    /// Empty means no explicit default
    #[serde(default)]
    pub default_engine: String,

    #[serde(default = "default_true")]
    pub secure_storage: bool,

    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl Default for GlobalConfiguration {
    fn default() -> Self {
        Self::seeded()
    }
}

impl GlobalConfiguration {
    /// Empty configuration with secure storage on
    pub fn empty() -> Self {
        Self {
            engines: BTreeMap::new(),
            default_engine: String::new(),
            secure_storage: true,
            last_updated: Utc::now(),
        }
    }

    /// First-run configuration
    ///
    /// The offline engine is enabled and default; cloud engines are present
    /// but disabled, with empty secrets waiting to be filled in.
    pub fn seeded() -> Self {
        let mut engines = BTreeMap::new();
        engines.insert(sherpa::ENGINE_NAME.to_string(), EngineConfigEntry::default());
        engines.insert(
            azure::ENGINE_NAME.to_string(),
            EngineConfigEntry::disabled_with(&[("subscriptionKey", ""), ("region", "eastus")]),
        );
        engines.insert(
            rest::ELEVENLABS.name.to_string(),
            EngineConfigEntry::disabled_with(&[("apiKey", "")]),
        );
        engines.insert(
            rest::PLAYHT.name.to_string(),
            EngineConfigEntry::disabled_with(&[("apiKey", ""), ("userId", "")]),
        );
        engines.insert(
            pipe::ENGINE_NAME.to_string(),
            EngineConfigEntry::disabled_with(&[("voicesFile", "")]),
        );

        Self {
            engines,
            default_engine: sherpa::ENGINE_NAME.to_string(),
            secure_storage: true,
            last_updated: Utc::now(),
        }
    }

    pub fn default_engine(&self) -> Option<&str> {
        Some(self.default_engine.as_str()).filter(|s| !s.is_empty())
    }

    pub fn is_enabled(&self, engine: &str) -> bool {
        self.engines.get(engine).map(|e| e.enabled).unwrap_or(false)
    }
}
