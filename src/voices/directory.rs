//! Platform voice directory abstraction

use crate::Result;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Attribute names every registered voice carries
pub mod attr {
    pub const LANGUAGE: &str = "Language";
    pub const GENDER: &str = "Gender";
    pub const AGE: &str = "Age";
    pub const VENDOR: &str = "Vendor";
    pub const VERSION: &str = "Version";
    pub const NAME: &str = "Name";
}

/// A voice as persisted in the platform voice directory
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegisteredVoiceRecord {
    /// Unique key; also the display name clients see
    pub key: String,

    /// Hex language identifier, mapped to the display name
    pub language: String,

    /// Component identity shared by the engine family
    pub clsid: String,

    /// Playback module
    pub module_path: Option<String>,

    /// Auxiliary descriptor file for voices too rich for flat attributes
    pub config_path: Option<PathBuf>,

    pub attributes: BTreeMap<String, String>,
}

/// Binding from a component identity to its canonical voice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentBinding {
    pub clsid: String,
    pub voice: String,
    pub module_path: Option<String>,
}

/// Persisted voice catalog
///
/// Writes overwrite: writing a record whose key exists replaces it
/// wholesale, stale attributes included.
pub trait VoiceDirectory: Send {
    fn read_voice(&self, key: &str) -> Result<Option<RegisteredVoiceRecord>>;

    fn write_voice(&mut self, record: &RegisteredVoiceRecord) -> Result<()>;

    /// Returns whether anything was removed
    fn delete_voice(&mut self, key: &str) -> Result<bool>;

    /// All voice keys, sorted
    fn voice_keys(&self) -> Result<Vec<String>>;

    fn read_binding(&self, clsid: &str) -> Result<Option<ComponentBinding>>;

    fn write_binding(&mut self, binding: &ComponentBinding) -> Result<()>;

    fn delete_binding(&mut self, clsid: &str) -> Result<()>;
}
