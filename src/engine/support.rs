//! Shared helpers for engine adapters
//!
//! Built-in adapters compose an [`EngineSupport`] instead of inheriting
//! behaviour: it owns the optional synthesis collaborator and offers the
//! validation and logging every adapter repeats.

use super::{validate_parameters, ConfigurationParameter, Parameters, VoiceDescriptor};
use crate::{OpenSpeechError, Result};
use log::{debug, warn};

/// A synthesis request handed to an external backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub engine: String,
    pub voice_id: String,
    /// Plain text, or SSML when the engine requires markup
    pub payload: String,
    pub is_ssml: bool,
    pub parameters: Parameters,
}

/// External collaborator that talks to the real service
///
/// Cloud HTTP clients, model runtimes and inter-process bridges live behind
/// this trait; the core never formats wire requests itself.
pub trait EngineBackend: Send {
    fn voices(&self, engine: &str, params: &Parameters) -> Result<Vec<VoiceDescriptor>>;

    fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<u8>>;
}

/// Common state for adapters
pub struct EngineSupport {
    name: &'static str,
    backend: Option<Box<dyn EngineBackend>>,
    initialized: bool,
}

impl EngineSupport {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            backend: None,
            initialized: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn set_backend(&mut self, backend: Box<dyn EngineBackend>) {
        debug!("Attaching synthesis backend to {}", self.name);
        self.backend = Some(backend);
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// The attached collaborator, or `BackendUnavailable`
    pub fn backend(&self) -> Result<&dyn EngineBackend> {
        self.backend
            .as_deref()
            .ok_or_else(|| OpenSpeechError::BackendUnavailable(self.name.to_string()))
    }

    /// Validate `config`, logging which parameter failed
    pub fn require_valid(&self, schema: &[ConfigurationParameter], config: &Parameters) -> Result<()> {
        validate_parameters(schema, config).map_err(|reason| {
            warn!("{}: {}", self.name, reason);
            OpenSpeechError::invalid_config(self.name, reason)
        })
    }

    /// Value of `key`, falling back to the schema default
    pub fn param(
        &self,
        schema: &[ConfigurationParameter],
        config: &Parameters,
        key: &str,
    ) -> Option<String> {
        if let Some(v) = config.get(key).filter(|v| !v.is_empty()) {
            return Some(v.clone());
        }
        schema
            .iter()
            .find(|p| p.name == key)
            .and_then(|p| p.default_value.clone())
    }

    /// Stamp the owning engine onto each voice
    pub fn adopt(&self, voices: Vec<VoiceDescriptor>) -> Vec<VoiceDescriptor> {
        voices
            .into_iter()
            .map(|mut v| {
                v.engine = self.name.to_string();
                v
            })
            .collect()
    }

    pub fn mark_initialized(&mut self) {
        debug!("Initializing {} engine", self.name);
        self.initialized = true;
    }

    pub fn mark_shutdown(&mut self) {
        debug!("Shutting down {} engine", self.name);
        self.initialized = false;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}
