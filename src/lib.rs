//! OpenSpeech - multi-backend speech engines exposed as platform voices
//!
//! Heterogeneous text-to-speech backends (an offline neural model runner,
//! several cloud REST providers, a forwarding bridge) register under one
//! engine contract. Their parameters persist in an encrypted-at-rest
//! configuration store, extra engines are discovered from a plugin
//! directory, and their voices are projected into the platform voice
//! directory so any generic speech client can select them.

pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod platform;
pub mod plugins;
pub mod registry;
pub mod settings;
pub mod voices;

pub use config::ConfigurationStore;
pub use engine::TtsEngine;
pub use error::{OpenSpeechError, Result};
pub use host::Host;
pub use registry::EngineRegistry;
pub use voices::VoiceRegistrar;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "openspeech";
