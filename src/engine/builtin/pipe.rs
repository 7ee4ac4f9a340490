//! Forwarding engine
//!
//! Voices are defined in a JSON file; each definition carries routing
//! configuration for an external helper process. That routing block is too
//! rich for flat voice attributes, so it is persisted as an auxiliary
//! descriptor next to the registered voice.

use super::PIPE_SERVICE_CLSID;
use crate::engine::{
    ComponentIdentity, ConfigurationParameter, EngineBackend, EngineCapabilities, EngineSupport,
    Parameters, SynthesisRequest, TtsEngine, VoiceDescriptor,
};
use crate::{OpenSpeechError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;

pub const ENGINE_NAME: &str = "PipeService";

/// One forwarded voice as defined on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipeVoiceDefinition {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    /// Routing block understood by the helper process
    #[serde(default)]
    pub tts_config: serde_json::Value,
}

/// Engine forwarding requests to an external helper
pub struct PipeServiceEngine {
    support: EngineSupport,
}

impl Default for PipeServiceEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PipeServiceEngine {
    pub fn new() -> Self {
        Self {
            support: EngineSupport::new(ENGINE_NAME),
        }
    }

    pub fn with_backend(mut self, backend: Box<dyn EngineBackend>) -> Self {
        self.support.set_backend(backend);
        self
    }

    fn definitions(&self, config: &Parameters) -> Result<Vec<PipeVoiceDefinition>> {
        self.support.require_valid(&self.parameters(), config)?;
        let path = config
            .get("voicesFile")
            .ok_or_else(|| OpenSpeechError::invalid_config(ENGINE_NAME, "voicesFile not set"))?;
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    fn definition(&self, voice_id: &str, config: &Parameters) -> Result<PipeVoiceDefinition> {
        self.definitions(config)?
            .into_iter()
            .find(|d| d.name == voice_id)
            .ok_or_else(|| OpenSpeechError::VoiceNotFound(voice_id.to_string()))
    }
}

impl TtsEngine for PipeServiceEngine {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    fn description(&self) -> String {
        "Voices forwarded to an external speech helper".to_string()
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            requires_authentication: false,
            supports_offline: false,
            requires_ssml: false,
        }
    }

    fn parameters(&self) -> Vec<ConfigurationParameter> {
        vec![ConfigurationParameter::new(
            "voicesFile",
            "Voice Definitions",
            "JSON file listing forwarded voices",
        )]
    }

    fn list_voices(&self, config: &Parameters) -> Result<Vec<VoiceDescriptor>> {
        let voices = self
            .definitions(config)?
            .into_iter()
            .map(|d| {
                let display = d.display_name.clone().unwrap_or_else(|| d.name.clone());
                let mut voice =
                    VoiceDescriptor::new(&d.name, &display, &d.locale, &d.gender, ENGINE_NAME);
                if let Some(age) = d.age {
                    voice.age = age;
                }
                if let Some(vendor) = d.vendor {
                    voice.attributes.insert("Vendor".into(), vendor);
                }
                voice.attributes.insert("Description".into(), d.description);
                voice
            })
            .collect();
        Ok(voices)
    }

    fn synthesize(&self, text: &str, voice_id: &str, params: &Parameters) -> Result<Vec<u8>> {
        let definition = self.definition(voice_id, params)?;
        let mut parameters = params.clone();
        parameters.insert("ttsConfig".into(), definition.tts_config.to_string());

        self.support.backend()?.synthesize(&SynthesisRequest {
            engine: ENGINE_NAME.to_string(),
            voice_id: voice_id.to_string(),
            payload: text.to_string(),
            is_ssml: false,
            parameters,
        })
    }

    fn component(&self) -> ComponentIdentity {
        ComponentIdentity::new(PIPE_SERVICE_CLSID, "OpenAssistive")
    }

    fn registration_attributes(
        &self,
        voice: &VoiceDescriptor,
        _config: &Parameters,
    ) -> Result<BTreeMap<String, String>> {
        let mut attrs = voice.attributes.clone();
        attrs.insert("VoiceType".into(), ENGINE_NAME.to_string());
        Ok(attrs)
    }

    fn auxiliary_descriptor(
        &self,
        voice: &VoiceDescriptor,
        config: &Parameters,
    ) -> Result<Option<serde_json::Value>> {
        let definition = self.definition(&voice.id, config)?;
        Ok(Some(serde_json::to_value(definition)?))
    }

    fn initialize(&mut self) -> Result<()> {
        self.support.mark_initialized();
        Ok(())
    }

    fn shutdown(&mut self) {
        self.support.mark_shutdown();
    }
}
