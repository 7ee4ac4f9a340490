//! Engine capability contract
//!
//! Every speech backend (offline model runner, cloud REST provider,
//! forwarding bridge) implements [`TtsEngine`]. The registry, the
//! configuration store and the voice registrar only ever talk to engines
//! through this trait.

pub mod builtin;
pub mod parameter;
pub mod support;
pub mod voice;

pub use parameter::{validate_parameters, ConfigurationParameter};
pub use support::{EngineBackend, EngineSupport, SynthesisRequest};
pub use voice::{Age, Gender, VoiceDescriptor};

use crate::{OpenSpeechError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Engine parameter map (decrypted, placeholders resolved)
pub type Parameters = HashMap<String, String>;

/// Capability flags advertised by an engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineCapabilities {
    /// Needs credentials before it can list voices or speak
    pub requires_authentication: bool,
    /// Works without network access
    pub supports_offline: bool,
    /// Expects structured markup (SSML) rather than plain text
    pub requires_ssml: bool,
}

/// Component identity shared by every voice of one engine family
///
/// The platform speech subsystem dereferences `clsid` to find the module
/// that performs playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentIdentity {
    pub clsid: String,
    pub vendor: String,
}

impl ComponentIdentity {
    pub fn new(clsid: &str, vendor: &str) -> Self {
        Self {
            clsid: clsid.to_string(),
            vendor: vendor.to_string(),
        }
    }
}

/// Static description of a registered engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineDescriptor {
    pub name: String,
    pub version: String,
    pub description: String,
    pub capabilities: EngineCapabilities,
    pub parameters: Vec<ConfigurationParameter>,
    pub component: ComponentIdentity,
}

/// Speech engine trait
///
/// Implementors supply the schema, voice catalog, synthesis entry point and
/// registration metadata. Defaults cover engines that need nothing beyond
/// the voice's own attribute map.
pub trait TtsEngine: Send {
    /// Unique registry key
    fn name(&self) -> &str;

    fn version(&self) -> &str {
        "1.0"
    }

    fn description(&self) -> String {
        format!("{} Text-to-Speech Engine", self.name())
    }

    fn capabilities(&self) -> EngineCapabilities;

    /// Parameter schema
    fn parameters(&self) -> Vec<ConfigurationParameter> {
        Vec::new()
    }

    /// Check a parameter map against the schema
    fn validate(&self, config: &Parameters) -> Result<()> {
        validate_parameters(&self.parameters(), config)
            .map_err(|reason| OpenSpeechError::invalid_config(self.name(), reason))
    }

    /// Voices this engine can speak with under `config`
    fn list_voices(&self, config: &Parameters) -> Result<Vec<VoiceDescriptor>>;

    /// Turn text into audio bytes
    fn synthesize(&self, text: &str, voice_id: &str, params: &Parameters) -> Result<Vec<u8>>;

    /// Component identity for this engine family
    fn component(&self) -> ComponentIdentity;

    /// Attributes written next to a registered voice so playback can be
    /// re-hydrated without querying the backend again
    fn registration_attributes(
        &self,
        voice: &VoiceDescriptor,
        _config: &Parameters,
    ) -> Result<BTreeMap<String, String>> {
        Ok(voice.attributes.clone())
    }

    /// Rich per-voice configuration that does not fit flat attributes
    fn auxiliary_descriptor(
        &self,
        _voice: &VoiceDescriptor,
        _config: &Parameters,
    ) -> Result<Option<serde_json::Value>> {
        Ok(None)
    }

    /// One-time hook run when the registry accepts the engine
    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    /// Hook run when the engine leaves the registry
    fn shutdown(&mut self) {}

    fn descriptor(&self) -> EngineDescriptor {
        EngineDescriptor {
            name: self.name().to_string(),
            version: self.version().to_string(),
            description: self.description(),
            capabilities: self.capabilities(),
            parameters: self.parameters(),
            component: self.component(),
        }
    }
}
