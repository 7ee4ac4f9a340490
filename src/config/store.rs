//! Durable, encrypted-at-rest engine configuration
//!
//! One explicitly constructed store is shared (behind an `Arc`) by the
//! registry, the voice registrar and the host. The document is held
//! decrypted in memory and sealed on every write.

use super::document::{EngineConfigEntry, GlobalConfiguration};
use super::protect::{is_sealed, seal, unseal, KeyFileProtector, ProtectionScope, SecretProtector};
use super::redact::{looks_secret, RedactedParameters};
use crate::engine::{ConfigurationParameter, Parameters};
use crate::platform;
use crate::{OpenSpeechError, Result};
use chrono::Utc;
use log::{debug, error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// `%NAME%` environment placeholders
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    // Pattern is a literal and always compiles
    Regex::new(r"%([^%]+)%").expect("placeholder pattern")
});

/// Default file name inside the data directory
pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Default)]
struct StoreState {
    /// Decrypted document; `None` until first load
    config: Option<GlobalConfiguration>,

    /// Ciphertexts that failed to decrypt, kept so a save does not drop them
    sealed: HashMap<(String, String), String>,

    /// Engine name -> names of parameters declared secret
    secrets: HashMap<String, HashSet<String>>,
}

/// Configuration store
pub struct ConfigurationStore {
    path: PathBuf,
    protector: Box<dyn SecretProtector>,
    state: Mutex<StoreState>,
}

impl ConfigurationStore {
    pub fn new(path: impl Into<PathBuf>, protector: Box<dyn SecretProtector>) -> Self {
        Self {
            path: path.into(),
            protector,
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Store at the per-user default location, protected for `scope`
    pub fn open_default(scope: ProtectionScope) -> Result<Self> {
        let path = platform::user_data_dir()?.join(CONFIG_FILE_NAME);
        Ok(Self::new(path, Box::new(KeyFileProtector::for_scope(scope)?)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        // Single actor: a poisoned lock still holds a consistent document
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Declare an engine's schema so saves know which values are secret
    pub fn declare_schema(&self, engine: &str, params: &[ConfigurationParameter]) {
        let names: HashSet<String> = params
            .iter()
            .filter(|p| p.secret)
            .map(|p| p.name.clone())
            .collect();
        self.state().secrets.insert(engine.to_string(), names);
    }

    /// Names of parameters treated as secret for `engine`
    pub fn secret_names(&self, engine: &str) -> HashSet<String> {
        self.state().secrets.get(engine).cloned().unwrap_or_default()
    }

    /// A parameter is secret if its schema says so or its name looks like a credential
    pub fn is_secret(&self, engine: &str, param: &str) -> bool {
        let declared = self
            .state()
            .secrets
            .get(engine)
            .map(|s| s.contains(param))
            .unwrap_or(false);
        declared || looks_secret(param)
    }

    /// Load configuration from disk
    ///
    /// Never fails: a missing file is seeded and persisted, an unreadable
    /// or unparsable file is logged and replaced in memory by defaults.
    pub fn load(&self) -> GlobalConfiguration {
        debug!("Loading engine configuration from {:?}", self.path);

        if !self.path.exists() {
            info!("Configuration file not found, creating default");
            let config = GlobalConfiguration::seeded();
            if let Err(e) = self.save(&config) {
                error!("Failed to persist default configuration: {}", e);
                self.state().config = Some(config.clone());
            }
            return self.current();
        }

        let parsed = fs::read_to_string(&self.path)
            .map_err(OpenSpeechError::from)
            .and_then(|text| serde_json::from_str::<GlobalConfiguration>(&text).map_err(Into::into));

        let mut config = match parsed {
            Ok(config) => config,
            Err(e) => {
                error!("Error loading configuration {:?}: {}", self.path, e);
                let config = GlobalConfiguration::seeded();
                let mut state = self.state();
                state.sealed.clear();
                state.config = Some(config.clone());
                return config;
            }
        };

        let mut sealed = HashMap::new();
        for (engine, entry) in config.engines.iter_mut() {
            let names: Vec<String> = entry.parameters.keys().cloned().collect();
            for name in names {
                let Some(value) = entry.parameters.get(&name) else {
                    continue;
                };
                if !is_sealed(value) {
                    continue;
                }
                match unseal(self.protector.as_ref(), value) {
                    Ok(plain) => {
                        entry.parameters.insert(name, plain);
                    }
                    Err(e) => {
                        warn!("Could not decrypt {}.{}: {}; treating as absent", engine, name, e);
                        if let Some(cipher) = entry.parameters.remove(&name) {
                            sealed.insert((engine.clone(), name), cipher);
                        }
                    }
                }
            }
        }

        debug!(
            "Loaded {} engine entries (default: {:?})",
            config.engines.len(),
            config.default_engine()
        );

        let mut state = self.state();
        state.sealed = sealed;
        state.config = Some(config.clone());
        config
    }

    /// Current in-memory configuration, loading it on first access
    pub fn current(&self) -> GlobalConfiguration {
        if let Some(ref config) = self.state().config {
            return config.clone();
        }
        self.load()
    }

    /// Persist the whole configuration
    ///
    /// Secret parameters are sealed before writing when secure storage is
    /// on; already-sealed values are written as-is.
    pub fn save(&self, config: &GlobalConfiguration) -> Result<()> {
        debug!("Saving engine configuration to {:?}", self.path);

        let mut updated = config.clone();
        updated.last_updated = Utc::now();

        let mut on_disk = updated.clone();
        let sealed = self.state().sealed.clone();
        let secure = on_disk.secure_storage;
        for (engine, entry) in on_disk.engines.iter_mut() {
            for (name, value) in entry.parameters.iter_mut() {
                if !secure || value.is_empty() || is_sealed(value) {
                    continue;
                }
                if self.is_secret(engine, name) {
                    *value = seal(self.protector.as_ref(), value)?;
                }
            }
            for ((sealed_engine, name), cipher) in &sealed {
                if sealed_engine == engine && !entry.parameters.contains_key(name) {
                    entry.parameters.insert(name.clone(), cipher.clone());
                }
            }
        }

        let json = serde_json::to_string_pretty(&on_disk)?;
        write_atomically(&self.path, json.as_bytes())
            .map_err(|e| OpenSpeechError::Config(format!("Failed to save configuration: {}", e)))?;

        let mut state = self.state();
        state
            .sealed
            .retain(|(engine, _), _| updated.engines.contains_key(engine));
        state.config = Some(updated);
        Ok(())
    }

    /// Write the in-memory configuration back to disk
    pub fn flush(&self) -> Result<()> {
        let config = self.state().config.clone();
        match config {
            Some(config) => self.save(&config),
            None => Ok(()),
        }
    }

    /// Parameters for `engine`, decrypted and with `%VAR%` placeholders resolved
    ///
    /// Resolution happens on every read and is never written back.
    pub fn get_engine_config(&self, engine: &str) -> Parameters {
        let config = self.current();
        let Some(entry) = config.engines.get(engine) else {
            return Parameters::new();
        };

        let mut params = Parameters::new();
        for (name, value) in &entry.parameters {
            let value = if is_sealed(value) {
                match unseal(self.protector.as_ref(), value) {
                    Ok(v) => v,
                    Err(e) => {
                        warn!("Could not decrypt {}.{}: {}", engine, name, e);
                        continue;
                    }
                }
            } else {
                value.clone()
            };
            params.insert(name.clone(), resolve_placeholders(&value));
        }
        params
    }

    /// Merge `params` into the engine's parameter map and save
    pub fn update_engine_config(&self, engine: &str, params: &Parameters) -> Result<()> {
        let secrets = self.secret_names(engine);
        debug!(
            "Updating {} parameters: {}",
            engine,
            RedactedParameters::new(params, &secrets)
        );

        let mut config = self.current();
        let entry = config.engines.entry(engine.to_string()).or_default();
        for (name, value) in params {
            entry.parameters.insert(name.clone(), value.clone());
        }

        {
            let mut state = self.state();
            for name in params.keys() {
                state.sealed.remove(&(engine.to_string(), name.clone()));
            }
        }

        self.save(&config)
    }

    /// Entry for `engine` as held in memory (secrets decrypted, placeholders intact)
    pub fn engine_entry(&self, engine: &str) -> Option<EngineConfigEntry> {
        self.current().engines.get(engine).cloned()
    }

    pub fn is_enabled(&self, engine: &str) -> bool {
        self.current().is_enabled(engine)
    }

    pub fn set_engine_enabled(&self, engine: &str, enabled: bool) -> Result<()> {
        info!("{} engine {}", if enabled { "Enabling" } else { "Disabling" }, engine);
        let mut config = self.current();
        config.engines.entry(engine.to_string()).or_default().enabled = enabled;
        self.save(&config)
    }

    pub fn default_engine(&self) -> Option<String> {
        self.current().default_engine().map(str::to_string)
    }

    pub fn set_default_engine(&self, engine: &str) -> Result<()> {
        info!("Setting default engine to {}", engine);
        let mut config = self.current();
        config.default_engine = engine.to_string();
        self.save(&config)
    }

    pub fn secure_storage(&self) -> bool {
        self.current().secure_storage
    }

    /// Seal an arbitrary value with this store's protector
    pub fn protect_value(&self, value: &str) -> Result<String> {
        seal(self.protector.as_ref(), value)
    }

    /// Open a value sealed with this store's protector
    pub fn reveal_value(&self, value: &str) -> Result<String> {
        unseal(self.protector.as_ref(), value)
    }
}

/// Replace `%NAME%` with the live environment value; unknown names stay as-is
pub fn resolve_placeholders(value: &str) -> String {
    PLACEHOLDER
        .replace_all(value, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Write through a sibling temp file and rename over the target
fn write_atomically(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}
