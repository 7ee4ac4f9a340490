//! Error types for OpenSpeech

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for OpenSpeech
#[derive(Error, Debug)]
pub enum OpenSpeechError {
    #[error("Engine '{0}' is already registered")]
    DuplicateEngine(String),

    #[error("Engine '{0}' is not registered")]
    EngineNotFound(String),

    #[error("Voice '{0}' not found")]
    VoiceNotFound(String),

    #[error("Invalid configuration for engine '{engine}': {reason}")]
    InvalidConfiguration { engine: String, reason: String },

    #[error("Failed to register voice '{voice}': {reason}")]
    VoiceRegistrationFailed { voice: String, reason: String },

    #[error("No engines available")]
    NoEnginesAvailable,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Secret protection error: {0}")]
    Protection(String),

    #[error("Plugin error in {path}: {reason}")]
    Plugin { path: PathBuf, reason: String },

    #[error("Voice directory error: {0}")]
    VoiceDirectory(String),

    #[error("Engine '{0}' has no synthesis backend attached")]
    BackendUnavailable(String),

    #[error("Speech synthesis error in '{engine}': {reason}")]
    Synthesis { engine: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for OpenSpeech operations
pub type Result<T> = std::result::Result<T, OpenSpeechError>;

impl OpenSpeechError {
    /// Wrap any failure as a registration failure for `voice`
    pub fn registration(voice: &str, reason: impl ToString) -> Self {
        OpenSpeechError::VoiceRegistrationFailed {
            voice: voice.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_config(engine: &str, reason: impl ToString) -> Self {
        OpenSpeechError::InvalidConfiguration {
            engine: engine.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<String> for OpenSpeechError {
    fn from(s: String) -> Self {
        OpenSpeechError::Other(s)
    }
}

impl From<&str> for OpenSpeechError {
    fn from(s: &str) -> Self {
        OpenSpeechError::Other(s.to_string())
    }
}

impl From<ini::Error> for OpenSpeechError {
    fn from(e: ini::Error) -> Self {
        OpenSpeechError::Config(format!("INI parse error: {}", e))
    }
}
