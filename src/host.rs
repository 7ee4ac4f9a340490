//! Host orchestration
//!
//! Opens settings and the configuration store, registers the built-in
//! engines, discovers plugins and exposes install/uninstall/rescan.
//! This is the one layer that logs and carries on after a partial failure.

use crate::config::{ConfigurationStore, KeyFileProtector, SecretProtector};
use crate::engine::builtin::builtin_engines;
use crate::engine::{EngineDescriptor, TtsEngine, VoiceDescriptor};
use crate::plugins::{DiscoveryReport, DylibLoader, ModuleLoader, PluginDiscovery};
use crate::registry::EngineRegistry;
use crate::settings::Settings;
use crate::voices::{FileVoiceDirectory, RegisteredVoiceRecord, VoiceDirectory, VoiceRegistrar};
use crate::Result;
use log::{debug, info, warn};
use std::sync::Arc;

/// A fully wired OpenSpeech host
pub struct Host {
    settings: Settings,
    store: Arc<ConfigurationStore>,
    registry: EngineRegistry,
    registrar: VoiceRegistrar,
    discovery: PluginDiscovery,
}

impl Host {
    /// Open with settings from the default location
    pub fn open_default() -> Result<Self> {
        Self::open(Settings::load()?)
    }

    /// Open with real shared-library plugin loading
    pub fn open(settings: Settings) -> Result<Self> {
        Self::with_loader(settings, Box::new(DylibLoader))
    }

    /// Open with a custom plugin loader
    pub fn with_loader(settings: Settings, loader: Box<dyn ModuleLoader>) -> Result<Self> {
        let protector: Box<dyn SecretProtector> = match settings.key_file() {
            Some(path) => Box::new(KeyFileProtector::new(path)),
            None => Box::new(KeyFileProtector::for_scope(settings.protection_scope())?),
        };
        let store = Arc::new(ConfigurationStore::new(settings.config_file()?, protector));
        let config = store.load();
        info!(
            "Configuration loaded from {:?} ({} engines)",
            store.path(),
            config.engines.len()
        );

        let mut registry = EngineRegistry::new(store.clone());
        for engine in builtin_engines(&settings.models_dir()?, &settings.models_catalog()?) {
            let name = engine.name().to_string();
            if let Err(e) = registry.register(engine) {
                warn!("Built-in engine {} not available: {}", name, e);
            }
        }

        let mut registrar =
            VoiceRegistrar::new(store.clone(), open_directory(&settings)?, settings.descriptor_dir()?);
        if let Some(module) = settings.playback_module() {
            registrar = registrar.with_module_path(module);
        }

        let discovery = PluginDiscovery::with_loader(settings.plugin_dir()?, loader)
            .scan_subdirectories(settings.scan_subdirectories());

        let mut host = Self {
            settings,
            store,
            registry,
            registrar,
            discovery,
        };
        host.rescan();
        Ok(host)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<ConfigurationStore> {
        &self.store
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut EngineRegistry {
        &mut self.registry
    }

    pub fn registrar(&self) -> &VoiceRegistrar {
        &self.registrar
    }

    /// Add an engine supplied by the embedding application
    pub fn register_engine(&mut self, engine: Box<dyn TtsEngine>) -> Result<()> {
        self.registry.register(engine)
    }

    /// Re-run plugin discovery; existing engines of the same name are replaced
    pub fn rescan(&mut self) -> DiscoveryReport {
        debug!("Scanning {:?} for plugins", self.discovery.dir());
        self.discovery.discover(&mut self.registry)
    }

    /// Descriptors of every registered engine, in registration order
    pub fn engines(&self) -> Vec<EngineDescriptor> {
        self.registry
            .names()
            .iter()
            .filter_map(|name| self.registry.descriptor(name).ok())
            .collect()
    }

    /// Name of the engine used when none is specified
    pub fn default_engine(&self) -> Result<String> {
        self.registry.resolve_default().map(|e| e.name().to_string())
    }

    /// Voices an engine offers under its current configuration
    pub fn voices(&self, engine: &str) -> Result<Vec<VoiceDescriptor>> {
        let engine = self.registry.get(engine)?;
        engine.list_voices(&self.store.get_engine_config(engine.name()))
    }

    pub fn install(&mut self, engine: &str, voice_id: &str) -> Result<RegisteredVoiceRecord> {
        self.registrar
            .register_engine_voice(&self.registry, engine, voice_id)
    }

    pub fn uninstall(&mut self, key: &str) -> Result<()> {
        self.registrar.unregister(key)
    }

    pub fn installed(&self) -> Result<Vec<RegisteredVoiceRecord>> {
        self.registrar.installed_voices()
    }

    /// Shut engines down and persist configuration
    pub fn shutdown(mut self) -> Result<()> {
        info!("Shutting down");
        self.registry.shutdown_all();
        self.store.flush()
    }
}

/// The voice directory named by settings, else the platform default
fn open_directory(settings: &Settings) -> Result<Box<dyn VoiceDirectory>> {
    if let Some(path) = settings.voice_directory() {
        return Ok(Box::new(FileVoiceDirectory::open(path)?));
    }

    #[cfg(windows)]
    {
        Ok(Box::new(crate::voices::RegistryVoiceDirectory::new()))
    }

    #[cfg(not(windows))]
    {
        let path = crate::platform::user_data_dir()?.join("voices.ini");
        Ok(Box::new(FileVoiceDirectory::open(path)?))
    }
}
