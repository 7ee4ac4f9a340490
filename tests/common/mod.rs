//! Shared fixtures for integration tests

#![allow(dead_code)]

use openspeech::config::{ConfigurationStore, KeyFileProtector};
use openspeech::plugins::{DylibLoader, ModuleLoader};
use openspeech::engine::{
    ComponentIdentity, ConfigurationParameter, EngineCapabilities, Parameters, VoiceDescriptor,
};
use openspeech::{OpenSpeechError, Result, TtsEngine};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

pub const FAKE_CLSID: &str = "{11111111-2222-3333-4444-555555555555}";

/// Scriptable in-process engine
pub struct FakeEngine {
    pub name: String,
    pub clsid: String,
    pub voices: Vec<VoiceDescriptor>,
    pub params: Vec<ConfigurationParameter>,
    pub extra: BTreeMap<String, String>,
    pub fail_init: bool,
}

impl FakeEngine {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            clsid: FAKE_CLSID.to_string(),
            voices: Vec::new(),
            params: Vec::new(),
            extra: BTreeMap::new(),
            fail_init: false,
        }
    }

    pub fn with_voice(mut self, id: &str, name: &str, locale: &str) -> Self {
        self.voices
            .push(VoiceDescriptor::new(id, name, locale, "female", &self.name));
        self
    }

    pub fn with_param(mut self, param: ConfigurationParameter) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.extra.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_clsid(mut self, clsid: &str) -> Self {
        self.clsid = clsid.to_string();
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn boxed(self) -> Box<dyn TtsEngine> {
        Box::new(self)
    }
}

impl TtsEngine for FakeEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            supports_offline: true,
            ..Default::default()
        }
    }

    fn parameters(&self) -> Vec<ConfigurationParameter> {
        self.params.clone()
    }

    fn list_voices(&self, _config: &Parameters) -> Result<Vec<VoiceDescriptor>> {
        Ok(self.voices.clone())
    }

    fn synthesize(&self, text: &str, _voice_id: &str, _params: &Parameters) -> Result<Vec<u8>> {
        Ok(text.as_bytes().to_vec())
    }

    fn component(&self) -> ComponentIdentity {
        ComponentIdentity::new(&self.clsid, "Test Vendor")
    }

    fn registration_attributes(
        &self,
        voice: &VoiceDescriptor,
        _config: &Parameters,
    ) -> Result<BTreeMap<String, String>> {
        let mut attrs = voice.attributes.clone();
        attrs.extend(self.extra.clone());
        Ok(attrs)
    }

    fn initialize(&mut self) -> Result<()> {
        if self.fail_init {
            return Err(OpenSpeechError::BackendUnavailable(format!(
                "{} cannot start",
                self.name
            )));
        }
        Ok(())
    }
}

/// Store rooted in `dir` with its own key file
pub fn store_in(dir: &Path) -> Arc<ConfigurationStore> {
    let store = ConfigurationStore::new(
        dir.join("config.json"),
        Box::new(KeyFileProtector::new(dir.join("secret.key"))),
    );
    store.load();
    Arc::new(store)
}

pub const MANIFEST_PREFIX: &str = "engines:";

/// Loader reading `engines: A, B` text manifests
///
/// A name prefixed with `!` fails to initialize. Files that are not
/// manifests go to the real shared-library loader.
pub struct ManifestLoader;

impl ModuleLoader for ManifestLoader {
    fn load(&self, path: &Path) -> Result<Vec<Box<dyn TtsEngine>>> {
        let text = fs::read(path)?;
        match std::str::from_utf8(&text)
            .ok()
            .and_then(|t| t.strip_prefix(MANIFEST_PREFIX))
        {
            Some(names) => Ok(names
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(|name| match name.strip_prefix('!') {
                    Some(broken) => FakeEngine::new(broken).failing_init().boxed(),
                    None => FakeEngine::new(name).boxed(),
                })
                .collect()),
            None => DylibLoader.load(path),
        }
    }
}
