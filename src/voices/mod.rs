//! Projection of engine voices into the platform voice directory
//!
//! Each registered voice becomes one token entry carrying its language,
//! the engine family's component identity and an attribute set rich
//! enough to re-hydrate playback without asking the backend again. A
//! per-family binding points the component identity at one canonical
//! voice. Registration of a single voice is all-or-nothing: a failing
//! step restores whatever that voice had before.

mod directory;
mod file_directory;
mod language;
#[cfg(windows)]
mod windows;

pub use directory::{attr, ComponentBinding, RegisteredVoiceRecord, VoiceDirectory};
pub use file_directory::FileVoiceDirectory;
pub use language::{BuiltinLocales, LanguageId, LanguageResolver, LocaleCatalog, DEFAULT_LANGUAGE};
#[cfg(windows)]
pub use windows::RegistryVoiceDirectory;

use crate::config::{is_sealed, ConfigurationStore};
use crate::engine::{TtsEngine, VoiceDescriptor};
use crate::registry::EngineRegistry;
use crate::{OpenSpeechError, Result};
use log::{debug, error, info, warn};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// State of one voice before a registration touched it
struct Snapshot {
    record: Option<RegisteredVoiceRecord>,
    binding: Option<ComponentBinding>,
    aux_path: PathBuf,
    aux: Option<Vec<u8>>,
}

/// Voice registrar
pub struct VoiceRegistrar {
    store: Arc<ConfigurationStore>,
    directory: Box<dyn VoiceDirectory>,
    resolver: LanguageResolver,
    descriptor_dir: PathBuf,
    module_path: Option<String>,
}

impl VoiceRegistrar {
    pub fn new(
        store: Arc<ConfigurationStore>,
        directory: Box<dyn VoiceDirectory>,
        descriptor_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            directory,
            resolver: LanguageResolver::default(),
            descriptor_dir: descriptor_dir.into(),
            module_path: None,
        }
    }

    /// Playback module recorded on tokens and component bindings
    pub fn with_module_path(mut self, path: impl Into<String>) -> Self {
        self.module_path = Some(path.into());
        self
    }

    pub fn with_resolver(mut self, resolver: LanguageResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn descriptor_dir(&self) -> &Path {
        &self.descriptor_dir
    }

    pub fn resolver(&self) -> &LanguageResolver {
        &self.resolver
    }

    fn aux_path(&self, key: &str) -> PathBuf {
        self.descriptor_dir.join(format!("{}.json", key))
    }

    /// Look up `voice_id` in the engine's catalog and register it
    pub fn register_engine_voice(
        &mut self,
        registry: &EngineRegistry,
        engine: &str,
        voice_id: &str,
    ) -> Result<RegisteredVoiceRecord> {
        let engine = registry.get(engine)?;
        let config = self.store.get_engine_config(engine.name());
        let voice = engine
            .list_voices(&config)?
            .into_iter()
            .find(|v| v.id == voice_id)
            .ok_or_else(|| OpenSpeechError::VoiceNotFound(voice_id.to_string()))?;
        self.register(engine, &voice)
    }

    /// Register `voice`, overwriting any voice with the same key
    pub fn register(
        &mut self,
        engine: &dyn TtsEngine,
        voice: &VoiceDescriptor,
    ) -> Result<RegisteredVoiceRecord> {
        let key = voice_key(voice)?;
        info!("Registering voice {} ({}) from {}", key, voice.locale, engine.name());

        let (record, aux) = self
            .build_record(engine, voice, &key)
            .map_err(|e| OpenSpeechError::registration(&key, e))?;

        let snapshot = self
            .snapshot(&key, &record.clsid)
            .map_err(|e| OpenSpeechError::registration(&key, e))?;

        if let Err(e) = self.apply(&record, aux.as_ref(), &snapshot) {
            error!("Registration of {} failed, rolling back: {}", key, e);
            self.rollback(&key, &record.clsid, &snapshot);
            return Err(OpenSpeechError::registration(&key, e));
        }

        debug!("Voice {} registered with language {}", key, record.language);
        Ok(record)
    }

    fn build_record(
        &self,
        engine: &dyn TtsEngine,
        voice: &VoiceDescriptor,
        key: &str,
    ) -> Result<(RegisteredVoiceRecord, Option<serde_json::Value>)> {
        let config = self.store.get_engine_config(engine.name());
        let component = engine.component();
        let language = self.resolver.resolve(&voice.locale).to_string();

        let mut attributes = BTreeMap::new();
        attributes.insert(attr::LANGUAGE.to_string(), language.clone());
        attributes.insert(attr::GENDER.to_string(), voice.gender().as_str().to_string());
        attributes.insert(attr::AGE.to_string(), voice.age().as_str().to_string());
        attributes.insert(attr::VENDOR.to_string(), component.vendor.clone());
        attributes.insert(attr::VERSION.to_string(), engine.version().to_string());
        attributes.insert(attr::NAME.to_string(), key.to_string());

        for (name, value) in engine.registration_attributes(voice, &config)? {
            if name == attr::LANGUAGE || name == attr::NAME {
                continue;
            }
            attributes.insert(name, value);
        }
        self.seal_secrets(engine.name(), &mut attributes)?;

        let aux = engine.auxiliary_descriptor(voice, &config)?;
        let config_path = aux.as_ref().map(|_| self.aux_path(key));

        Ok((
            RegisteredVoiceRecord {
                key: key.to_string(),
                language,
                clsid: component.clsid,
                module_path: self.module_path.clone(),
                config_path,
                attributes,
            },
            aux,
        ))
    }

    /// Encrypt attributes named after a secret engine parameter
    fn seal_secrets(&self, engine: &str, attributes: &mut BTreeMap<String, String>) -> Result<()> {
        if !self.store.secure_storage() {
            return Ok(());
        }
        let secrets: HashSet<String> = self
            .store
            .secret_names(engine)
            .into_iter()
            .map(|s| s.to_ascii_lowercase())
            .collect();
        for (name, value) in attributes.iter_mut() {
            if value.is_empty() || is_sealed(value) {
                continue;
            }
            if secrets.contains(&name.to_ascii_lowercase()) {
                *value = self.store.protect_value(value)?;
            }
        }
        Ok(())
    }

    fn snapshot(&self, key: &str, clsid: &str) -> Result<Snapshot> {
        let record = self.directory.read_voice(key)?;
        let binding = self.directory.read_binding(clsid)?;
        let aux_path = self.aux_path(key);
        let aux = if aux_path.exists() {
            Some(fs::read(&aux_path)?)
        } else {
            None
        };
        Ok(Snapshot {
            record,
            binding,
            aux_path,
            aux,
        })
    }

    fn apply(
        &mut self,
        record: &RegisteredVoiceRecord,
        aux: Option<&serde_json::Value>,
        snapshot: &Snapshot,
    ) -> Result<()> {
        if let Some(aux) = aux {
            fs::create_dir_all(&self.descriptor_dir)?;
            fs::write(&snapshot.aux_path, serde_json::to_string_pretty(aux)?)?;
        }

        self.directory.write_voice(record)?;

        // Last registration of a family wins the canonical binding
        self.directory.write_binding(&ComponentBinding {
            clsid: record.clsid.clone(),
            voice: record.key.clone(),
            module_path: self.module_path.clone(),
        })?;

        if aux.is_none() && snapshot.aux.is_some() {
            if let Err(e) = fs::remove_file(&snapshot.aux_path) {
                warn!("Could not remove stale descriptor {:?}: {}", snapshot.aux_path, e);
            }
        }
        Ok(())
    }

    /// Put the voice, its family binding and descriptor back as they were
    fn rollback(&mut self, key: &str, clsid: &str, snapshot: &Snapshot) {
        let restored = match snapshot.record {
            Some(ref record) => self.directory.write_voice(record),
            None => self.directory.delete_voice(key).map(|_| ()),
        };
        if let Err(e) = restored {
            error!("Rollback of voice entry {} failed: {}", key, e);
        }

        let restored = match snapshot.binding {
            Some(ref binding) => self.directory.write_binding(binding),
            None => self.directory.delete_binding(clsid),
        };
        if let Err(e) = restored {
            error!("Rollback of binding {} failed: {}", clsid, e);
        }

        let restored = match snapshot.aux {
            Some(ref bytes) => fs::write(&snapshot.aux_path, bytes),
            None if snapshot.aux_path.exists() => fs::remove_file(&snapshot.aux_path),
            None => Ok(()),
        };
        if let Err(e) = restored {
            error!("Rollback of descriptor {:?} failed: {}", snapshot.aux_path, e);
        }
    }

    /// Remove a registered voice and its descriptor
    ///
    /// The family binding is only touched when it names this voice: it
    /// moves to the first remaining voice of the family, or is cleared.
    pub fn unregister(&mut self, key: &str) -> Result<()> {
        let record = self
            .directory
            .read_voice(key)?
            .ok_or_else(|| OpenSpeechError::VoiceNotFound(key.to_string()))?;
        info!("Unregistering voice {}", key);

        self.directory.delete_voice(key)?;

        let mut descriptors: Vec<PathBuf> = record.config_path.iter().cloned().collect();
        descriptors.push(self.aux_path(key));
        descriptors.dedup();
        for path in descriptors {
            if !path.exists() {
                continue;
            }
            // Best effort: the binding hand-over below still runs
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed descriptor {:?}", path),
                Err(e) => warn!("Could not remove descriptor {:?}: {}", path, e),
            }
        }

        let Some(binding) = self.directory.read_binding(&record.clsid)? else {
            return Ok(());
        };
        if binding.voice != key {
            return Ok(());
        }

        match self.first_voice_of(&record.clsid)? {
            Some(next) => {
                info!("Component {} now bound to {}", record.clsid, next);
                self.directory.write_binding(&ComponentBinding {
                    voice: next,
                    ..binding
                })
            }
            None => {
                info!("Last voice of {} removed, clearing binding", record.clsid);
                self.directory.delete_binding(&record.clsid)
            }
        }
    }

    fn first_voice_of(&self, clsid: &str) -> Result<Option<String>> {
        for key in self.directory.voice_keys()? {
            if let Some(record) = self.directory.read_voice(&key)? {
                if record.clsid == clsid {
                    return Ok(Some(key));
                }
            }
        }
        Ok(None)
    }

    pub fn installed_voice(&self, key: &str) -> Result<Option<RegisteredVoiceRecord>> {
        self.directory.read_voice(key)
    }

    /// Every voice in the directory, sorted by key
    pub fn installed_voices(&self) -> Result<Vec<RegisteredVoiceRecord>> {
        let mut voices = Vec::new();
        for key in self.directory.voice_keys()? {
            if let Some(record) = self.directory.read_voice(&key)? {
                voices.push(record);
            }
        }
        Ok(voices)
    }

    pub fn binding(&self, clsid: &str) -> Result<Option<ComponentBinding>> {
        self.directory.read_binding(clsid)
    }

    /// Attributes of an installed voice with sealed values opened
    pub fn playback_attributes(&self, key: &str) -> Result<BTreeMap<String, String>> {
        let record = self
            .directory
            .read_voice(key)?
            .ok_or_else(|| OpenSpeechError::VoiceNotFound(key.to_string()))?;
        record
            .attributes
            .into_iter()
            .map(|(name, value)| Ok((name, self.store.reveal_value(&value)?)))
            .collect()
    }
}

/// Directory key for a voice: its display name, else its id
fn voice_key(voice: &VoiceDescriptor) -> Result<String> {
    let key = match voice.display_name.trim() {
        "" => voice.id.trim(),
        name => name,
    };
    if key.is_empty() {
        return Err(OpenSpeechError::registration(&voice.id, "voice has no name"));
    }
    if key.contains(['/', '\\']) {
        return Err(OpenSpeechError::registration(
            key,
            "voice name must not contain path separators",
        ));
    }
    Ok(key.to_string())
}
