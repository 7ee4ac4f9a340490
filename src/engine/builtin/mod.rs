//! Compiled-in engine adapters

pub mod azure;
pub mod pipe;
pub mod rest;
pub mod sherpa;

pub use azure::AzureTtsEngine;
pub use pipe::PipeServiceEngine;
pub use rest::RestEngine;
pub use sherpa::SherpaOnnxEngine;

use super::TtsEngine;
use std::path::Path;

// Component identities, one per engine family
pub const SHERPA_CLSID: &str = "{3d8f5c5d-9d6b-4b92-a12b-1a6dff80b6b2}";
pub const AZURE_CLSID: &str = "{3d8f5c5e-9d6b-4b92-a12b-1a6dff80b6b3}";
pub const ELEVENLABS_CLSID: &str = "{3d8f5c5f-9d6b-4b92-a12b-1a6dff80b6b4}";
pub const PLAYHT_CLSID: &str = "{3d8f5c60-9d6b-4b92-a12b-1a6dff80b6b5}";
pub const PIPE_SERVICE_CLSID: &str = "{4A8B9C2D-1E3F-4567-8901-234567890ABC}";

/// Instantiate every built-in engine, offline engine first
///
/// Order matters: it is the registration order the registry falls back on
/// when no default engine is usable.
pub fn builtin_engines(models_dir: &Path, models_catalog: &Path) -> Vec<Box<dyn TtsEngine>> {
    vec![
        Box::new(SherpaOnnxEngine::new(models_dir, models_catalog)),
        Box::new(AzureTtsEngine::new()),
        Box::new(RestEngine::elevenlabs()),
        Box::new(RestEngine::playht()),
        Box::new(PipeServiceEngine::new()),
    ]
}
