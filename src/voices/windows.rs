//! Voice directory backed by the Windows speech token hive

use super::directory::{attr, ComponentBinding, RegisteredVoiceRecord, VoiceDirectory};
use crate::{OpenSpeechError, Result};
use log::debug;
use std::io;
use std::path::PathBuf;
use winreg::enums::{HKEY_CLASSES_ROOT, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE};
use winreg::RegKey;

/// Token root under HKLM
pub const TOKENS_PATH: &str = r"SOFTWARE\Microsoft\Speech\Voices\Tokens";

const CLSID_VALUE: &str = "CLSID";
const PATH_VALUE: &str = "Path";
const CONFIG_PATH_VALUE: &str = "ConfigPath";

fn registry_error(what: &str, e: io::Error) -> OpenSpeechError {
    OpenSpeechError::VoiceDirectory(format!("{}: {}", what, e))
}

/// Open `path`, mapping a missing key to `None`
fn open_optional(root: &RegKey, path: &str) -> Result<Option<RegKey>> {
    match root.open_subkey(path) {
        Ok(key) => Ok(Some(key)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(registry_error(path, e)),
    }
}

/// String values of `key` by name; the default value is under `""`
fn string_values(key: &RegKey) -> Vec<(String, String)> {
    key.enum_values()
        .filter_map(|v| v.ok())
        .filter_map(|(name, _)| {
            key.get_value::<String, _>(&name)
                .ok()
                .map(|value| (name, value))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hive {
    LocalMachine,
    ClassesRoot,
    CurrentUser,
}

impl Hive {
    fn key(self) -> RegKey {
        RegKey::predef(match self {
            Hive::LocalMachine => HKEY_LOCAL_MACHINE,
            Hive::ClassesRoot => HKEY_CLASSES_ROOT,
            Hive::CurrentUser => HKEY_CURRENT_USER,
        })
    }
}

/// Remove `path` and everything below it; a missing key is not an error
fn delete_tree(root: &RegKey, path: &str) -> Result<bool> {
    match root.delete_subkey_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(registry_error(path, e)),
    }
}

/// The machine-wide speech token hive (requires elevation for writes)
#[derive(Debug, Clone)]
pub struct RegistryVoiceDirectory {
    tokens: (Hive, String),
    classes: (Hive, String),
}

impl Default for RegistryVoiceDirectory {
    fn default() -> Self {
        Self {
            tokens: (Hive::LocalMachine, TOKENS_PATH.to_string()),
            classes: (Hive::ClassesRoot, "CLSID".to_string()),
        }
    }
}

impl RegistryVoiceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokens and class bindings kept below `root` in HKCU
    pub fn under_current_user(root: &str) -> Self {
        Self {
            tokens: (Hive::CurrentUser, format!(r"{}\Tokens", root)),
            classes: (Hive::CurrentUser, format!(r"{}\CLSID", root)),
        }
    }

    fn token_root(&self) -> RegKey {
        self.tokens.0.key()
    }

    fn class_root(&self) -> RegKey {
        self.classes.0.key()
    }

    fn token_path(&self, key: &str) -> String {
        format!(r"{}\{}", self.tokens.1, key)
    }

    fn clsid_path(&self, clsid: &str) -> String {
        format!(r"{}\{}", self.classes.1, clsid)
    }
}

impl VoiceDirectory for RegistryVoiceDirectory {
    fn read_voice(&self, key: &str) -> Result<Option<RegisteredVoiceRecord>> {
        let Some(token) = open_optional(&self.token_root(), &self.token_path(key))? else {
            return Ok(None);
        };

        let mut record = RegisteredVoiceRecord {
            key: key.to_string(),
            ..Default::default()
        };
        for (name, value) in string_values(&token) {
            match name.as_str() {
                "" => {}
                CLSID_VALUE => record.clsid = value,
                PATH_VALUE => record.module_path = Some(value),
                CONFIG_PATH_VALUE => record.config_path = Some(PathBuf::from(value)),
                _ => record.language = name,
            }
        }
        if let Some(attributes) = open_optional(&token, "Attributes")? {
            record.attributes = string_values(&attributes).into_iter().collect();
        }
        if let Some(lang) = record.attributes.get(attr::LANGUAGE) {
            record.language = lang.clone();
        }
        Ok(Some(record))
    }

    fn write_voice(&mut self, record: &RegisteredVoiceRecord) -> Result<()> {
        let path = self.token_path(&record.key);
        debug!("Writing voice token {}", path);
        self.delete_voice(&record.key)?;

        let (token, _) = self
            .token_root()
            .create_subkey(&path)
            .map_err(|e| registry_error(&path, e))?;
        let set = |key: &RegKey, name: &str, value: &str| {
            key.set_value(name, &value.to_string())
                .map_err(|e| registry_error(&path, e))
        };

        set(&token, "", &record.key)?;
        set(&token, &record.language, &record.key)?;
        set(&token, CLSID_VALUE, &record.clsid)?;
        if let Some(ref module) = record.module_path {
            set(&token, PATH_VALUE, module)?;
        }
        if let Some(ref config) = record.config_path {
            set(&token, CONFIG_PATH_VALUE, &config.to_string_lossy())?;
        }

        let (attributes, _) = token
            .create_subkey("Attributes")
            .map_err(|e| registry_error(&path, e))?;
        for (name, value) in &record.attributes {
            set(&attributes, name, value)?;
        }
        Ok(())
    }

    fn delete_voice(&mut self, key: &str) -> Result<bool> {
        delete_tree(&self.token_root(), &self.token_path(key))
    }

    fn voice_keys(&self) -> Result<Vec<String>> {
        let Some(tokens) = open_optional(&self.token_root(), &self.tokens.1)? else {
            return Ok(Vec::new());
        };
        let mut keys: Vec<String> = tokens.enum_keys().filter_map(|k| k.ok()).collect();
        keys.sort();
        Ok(keys)
    }

    fn read_binding(&self, clsid: &str) -> Result<Option<ComponentBinding>> {
        let base = self.clsid_path(clsid);
        let Some(token) = open_optional(&self.class_root(), &format!(r"{}\Token", base))? else {
            return Ok(None);
        };
        let Ok(voice) = token.get_value::<String, _>("") else {
            return Ok(None);
        };
        let module_path = open_optional(&self.class_root(), &format!(r"{}\InprocServer32", base))?
            .and_then(|server| server.get_value::<String, _>("").ok());
        Ok(Some(ComponentBinding {
            clsid: clsid.to_string(),
            voice,
            module_path,
        }))
    }

    fn write_binding(&mut self, binding: &ComponentBinding) -> Result<()> {
        let base = self.clsid_path(&binding.clsid);
        let classes = self.class_root();
        let (token, _) = classes
            .create_subkey(format!(r"{}\Token", base))
            .map_err(|e| registry_error(&base, e))?;
        token
            .set_value("", &binding.voice)
            .map_err(|e| registry_error(&base, e))?;

        let server_path = format!(r"{}\InprocServer32", base);
        if let Some(ref module) = binding.module_path {
            let (server, _) = classes
                .create_subkey(&server_path)
                .map_err(|e| registry_error(&base, e))?;
            server
                .set_value("", module)
                .map_err(|e| registry_error(&base, e))?;
            server
                .set_value("ThreadingModel", &"Both".to_string())
                .map_err(|e| registry_error(&base, e))?;
        } else {
            delete_tree(&classes, &server_path)?;
        }
        Ok(())
    }

    fn delete_binding(&mut self, clsid: &str) -> Result<()> {
        let base = self.clsid_path(clsid);
        let classes = self.class_root();
        delete_tree(&classes, &format!(r"{}\Token", base))?;
        delete_tree(&classes, &format!(r"{}\InprocServer32", base))?;
        Ok(())
    }
}
