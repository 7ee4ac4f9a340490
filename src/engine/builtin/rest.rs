//! Plain-text cloud REST engines (ElevenLabs, PlayHT)
//!
//! These providers differ only in schema and identity, so one adapter is
//! parameterised by a [`CloudProfile`].

use super::{ELEVENLABS_CLSID, PLAYHT_CLSID};
use crate::engine::{
    ComponentIdentity, ConfigurationParameter, EngineBackend, EngineCapabilities, EngineSupport,
    Parameters, SynthesisRequest, TtsEngine, VoiceDescriptor,
};
use crate::Result;
use std::collections::BTreeMap;

/// Static description of one REST provider
pub struct CloudProfile {
    pub name: &'static str,
    pub description: &'static str,
    pub clsid: &'static str,
    pub vendor: &'static str,
    pub schema: fn() -> Vec<ConfigurationParameter>,
    /// Parameters copied into the voice directory at registration
    pub registered_params: &'static [(&'static str, &'static str)],
}

pub static ELEVENLABS: CloudProfile = CloudProfile {
    name: "ElevenLabs",
    description: "ElevenLabs Text-to-Speech",
    clsid: ELEVENLABS_CLSID,
    vendor: "ElevenLabs",
    schema: elevenlabs_schema,
    registered_params: &[("apiKey", "ApiKey"), ("modelId", "ModelId")],
};

pub static PLAYHT: CloudProfile = CloudProfile {
    name: "PlayHT",
    description: "PlayHT Text-to-Speech",
    clsid: PLAYHT_CLSID,
    vendor: "PlayHT",
    schema: playht_schema,
    registered_params: &[("apiKey", "ApiKey"), ("userId", "UserId"), ("quality", "Quality")],
};

fn elevenlabs_schema() -> Vec<ConfigurationParameter> {
    vec![
        ConfigurationParameter::new("apiKey", "API Key", "ElevenLabs API key").secret(),
        ConfigurationParameter::new("modelId", "Model ID", "ElevenLabs model ID (optional)")
            .optional()
            .with_default("eleven_monolingual_v1"),
    ]
}

fn playht_schema() -> Vec<ConfigurationParameter> {
    vec![
        ConfigurationParameter::new("apiKey", "API Key", "PlayHT API key").secret(),
        ConfigurationParameter::new("userId", "User ID", "PlayHT user ID"),
        ConfigurationParameter::new("quality", "Voice Quality", "Voice quality (draft or premium)")
            .optional()
            .with_default("premium")
            .with_allowed_values(&["draft", "premium"]),
    ]
}

/// Cloud engine speaking plain text
pub struct RestEngine {
    profile: &'static CloudProfile,
    support: EngineSupport,
}

impl RestEngine {
    pub fn new(profile: &'static CloudProfile) -> Self {
        Self {
            profile,
            support: EngineSupport::new(profile.name),
        }
    }

    pub fn elevenlabs() -> Self {
        Self::new(&ELEVENLABS)
    }

    pub fn playht() -> Self {
        Self::new(&PLAYHT)
    }

    pub fn with_backend(mut self, backend: Box<dyn EngineBackend>) -> Self {
        self.support.set_backend(backend);
        self
    }
}

impl TtsEngine for RestEngine {
    fn name(&self) -> &str {
        self.profile.name
    }

    fn description(&self) -> String {
        self.profile.description.to_string()
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            requires_authentication: true,
            supports_offline: false,
            requires_ssml: false,
        }
    }

    fn parameters(&self) -> Vec<ConfigurationParameter> {
        (self.profile.schema)()
    }

    fn list_voices(&self, config: &Parameters) -> Result<Vec<VoiceDescriptor>> {
        self.support.require_valid(&self.parameters(), config)?;
        let voices = self.support.backend()?.voices(self.profile.name, config)?;
        Ok(self.support.adopt(voices))
    }

    fn synthesize(&self, text: &str, voice_id: &str, params: &Parameters) -> Result<Vec<u8>> {
        let schema = self.parameters();
        self.support.require_valid(&schema, params)?;

        let mut parameters = params.clone();
        for param in &schema {
            if let Some(value) = self.support.param(&schema, params, &param.name) {
                parameters.insert(param.name.clone(), value);
            }
        }

        self.support.backend()?.synthesize(&SynthesisRequest {
            engine: self.profile.name.to_string(),
            voice_id: voice_id.to_string(),
            payload: text.to_string(),
            is_ssml: false,
            parameters,
        })
    }

    fn component(&self) -> ComponentIdentity {
        ComponentIdentity::new(self.profile.clsid, self.profile.vendor)
    }

    fn registration_attributes(
        &self,
        voice: &VoiceDescriptor,
        config: &Parameters,
    ) -> Result<BTreeMap<String, String>> {
        let schema = self.parameters();
        let mut attrs = voice.attributes.clone();
        attrs.insert("VoiceName".into(), voice.id.clone());
        for (param, attribute) in self.profile.registered_params {
            if let Some(value) = self.support.param(&schema, config, param) {
                attrs.insert(attribute.to_string(), value);
            }
        }
        Ok(attrs)
    }

    fn initialize(&mut self) -> Result<()> {
        self.support.mark_initialized();
        Ok(())
    }

    fn shutdown(&mut self) {
        self.support.mark_shutdown();
    }
}
