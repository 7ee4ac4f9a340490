//! Offline neural model engine (Sherpa-ONNX)
//!
//! Voices come from a local models catalog; each voice's model files live
//! under `<models_dir>/<voice id>/`. Inference itself runs in the attached
//! backend.

use super::SHERPA_CLSID;
use crate::engine::{
    ComponentIdentity, EngineBackend, EngineCapabilities, EngineSupport, Parameters,
    SynthesisRequest, TtsEngine, VoiceDescriptor,
};
use crate::{OpenSpeechError, Result};
use log::{debug, warn};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENGINE_NAME: &str = "SherpaOnnx";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelDefinition {
    id: String,
    name: String,
    #[serde(default, alias = "model_type")]
    model_type: String,
    #[serde(default)]
    developer: String,
    #[serde(default)]
    quality: String,
    #[serde(default, alias = "sample_rate")]
    sample_rate: u32,
    #[serde(default, alias = "num_speakers")]
    num_speakers: u32,
    #[serde(default)]
    url: String,
    #[serde(default)]
    gender: String,
    #[serde(default)]
    language: Vec<ModelLanguage>,
}

#[derive(Debug, Deserialize)]
struct ModelLanguage {
    #[serde(default, alias = "lang_code")]
    code: String,
    #[serde(default)]
    country: Option<String>,
}

impl ModelLanguage {
    fn locale(&self) -> String {
        match self.country.as_deref().filter(|c| !c.is_empty()) {
            Some(country) if !self.code.contains('-') => format!("{}-{}", self.code, country),
            _ => self.code.clone(),
        }
    }
}

/// Sherpa-ONNX offline engine
pub struct SherpaOnnxEngine {
    support: EngineSupport,
    models_dir: PathBuf,
    catalog_path: PathBuf,
}

impl SherpaOnnxEngine {
    pub fn new(models_dir: impl Into<PathBuf>, catalog_path: impl Into<PathBuf>) -> Self {
        Self {
            support: EngineSupport::new(ENGINE_NAME),
            models_dir: models_dir.into(),
            catalog_path: catalog_path.into(),
        }
    }

    pub fn with_backend(mut self, backend: Box<dyn EngineBackend>) -> Self {
        self.support.set_backend(backend);
        self
    }

    fn model_dir(&self, voice_id: &str) -> PathBuf {
        self.models_dir.join(voice_id)
    }

    fn read_catalog(path: &Path) -> Result<Vec<ModelDefinition>> {
        let text = fs::read_to_string(path)?;
        let models: Vec<ModelDefinition> = serde_json::from_str(&text)?;
        Ok(models)
    }
}

impl TtsEngine for SherpaOnnxEngine {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    fn description(&self) -> String {
        "Sherpa-ONNX offline neural text-to-speech".to_string()
    }

    fn capabilities(&self) -> EngineCapabilities {
        EngineCapabilities {
            requires_authentication: false,
            supports_offline: true,
            requires_ssml: false,
        }
    }

    fn list_voices(&self, _config: &Parameters) -> Result<Vec<VoiceDescriptor>> {
        if !self.catalog_path.exists() {
            warn!("Models catalog not found: {}", self.catalog_path.display());
            return Ok(Vec::new());
        }

        let models = Self::read_catalog(&self.catalog_path)?;
        debug!("Loaded {} models from {}", models.len(), self.catalog_path.display());

        let voices = models
            .into_iter()
            .map(|model| {
                let locale = model
                    .language
                    .first()
                    .map(ModelLanguage::locale)
                    .unwrap_or_else(|| "en-US".to_string());
                VoiceDescriptor::new(&model.id, &model.name, &locale, &model.gender, ENGINE_NAME)
                    .with_attribute("ModelType", &model.model_type)
                    .with_attribute("Developer", &model.developer)
                    .with_attribute("Quality", &model.quality)
                    .with_attribute("SampleRate", &model.sample_rate.to_string())
                    .with_attribute("NumSpeakers", &model.num_speakers.to_string())
                    .with_attribute("Url", &model.url)
            })
            .collect();

        Ok(voices)
    }

    fn synthesize(&self, text: &str, voice_id: &str, params: &Parameters) -> Result<Vec<u8>> {
        let model_path = self.model_dir(voice_id).join("model.onnx");
        if !model_path.exists() {
            return Err(OpenSpeechError::Synthesis {
                engine: ENGINE_NAME.to_string(),
                reason: format!("model file not found: {}", model_path.display()),
            });
        }

        let mut parameters = params.clone();
        parameters.insert("modelPath".into(), model_path.display().to_string());
        parameters.insert(
            "tokensPath".into(),
            self.model_dir(voice_id).join("tokens.txt").display().to_string(),
        );

        self.support.backend()?.synthesize(&SynthesisRequest {
            engine: ENGINE_NAME.to_string(),
            voice_id: voice_id.to_string(),
            payload: text.to_string(),
            is_ssml: false,
            parameters,
        })
    }

    fn component(&self) -> ComponentIdentity {
        ComponentIdentity::new(SHERPA_CLSID, "OpenSpeech")
    }

    fn registration_attributes(
        &self,
        voice: &VoiceDescriptor,
        _config: &Parameters,
    ) -> Result<BTreeMap<String, String>> {
        let dir = self.model_dir(&voice.id);
        let mut attrs = voice.attributes.clone();
        attrs.insert("Model Path".into(), dir.join("model.onnx").display().to_string());
        attrs.insert("Tokens Path".into(), dir.join("tokens.txt").display().to_string());
        let lexicon = dir.join("lexicon.txt");
        if lexicon.exists() {
            attrs.insert("Lexicon Path".into(), lexicon.display().to_string());
        }
        attrs.insert("Data Directory".into(), dir.display().to_string());
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
