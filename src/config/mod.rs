//! Engine configuration: document, persistence and secret protection

mod document;
mod protect;
mod redact;
mod store;

pub use document::{EngineConfigEntry, GlobalConfiguration};
pub use protect::{
    is_sealed, seal, unseal, KeyFileProtector, ProtectionScope, SecretProtector, ENCRYPTED_MARKER,
};
pub use redact::{looks_secret, RedactedParameters};
pub use store::{resolve_placeholders, ConfigurationStore, CONFIG_FILE_NAME};
