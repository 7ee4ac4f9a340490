//! INI-backed voice directory
//!
//! Mirrors the layout of the platform voice hive in one file:
//!
//! ```ini
//! [Tokens/Amy]
//! @=Amy
//! 809=Amy
//! CLSID={3d8f5c5d-9d6b-4b92-a12b-1a6dff80b6b2}
//! Path=/opt/openspeech/libopenspeech_sapi.so
//!
//! [Tokens/Amy/Attributes]
//! Language=809
//! Gender=Female
//!
//! [CLSID/{3d8f5c5d-9d6b-4b92-a12b-1a6dff80b6b2}/Token]
//! @=Amy
//! ```

use super::directory::{attr, ComponentBinding, RegisteredVoiceRecord, VoiceDirectory};
use crate::{OpenSpeechError, Result};
use ini::{EscapePolicy, Ini, ParseOption, WriteOption};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

const TOKENS: &str = "Tokens";
const DEFAULT_VALUE: &str = "@";
const CLSID_VALUE: &str = "CLSID";
const PATH_VALUE: &str = "Path";
const CONFIG_PATH_VALUE: &str = "ConfigPath";

fn token_section(key: &str) -> String {
    format!("{}/{}", TOKENS, key)
}

fn attributes_section(key: &str) -> String {
    format!("{}/{}/Attributes", TOKENS, key)
}

fn binding_section(clsid: &str) -> String {
    format!("CLSID/{}/Token", clsid)
}

fn server_section(clsid: &str) -> String {
    format!("CLSID/{}/InprocServer32", clsid)
}

/// Characters the parser treats specially in section and key names
const NAME_RESERVED: &[char] = &['=', ':', ';', '#', '[', ']'];

/// Backslash-escape `text` so the parser hands back the same string
fn escape(text: &str, reserved: &[char]) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\x{:04x}", c as u32)),
            c if reserved.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

fn escape_name(name: &str) -> String {
    escape(name, NAME_RESERVED)
}

/// Values are always quoted: the parser trims unquoted values
fn quote_value(value: &str) -> String {
    format!("\"{}\"", escape(value, &['"']))
}

/// Names lose surrounding whitespace on reload, so refuse them up front
fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.trim() != name {
        return Err(OpenSpeechError::VoiceDirectory(format!(
            "name {:?} cannot be stored in a voice file",
            name
        )));
    }
    Ok(())
}

/// Voice directory persisted to an INI file
pub struct FileVoiceDirectory {
    ini: Ini,
    path: PathBuf,
}

impl FileVoiceDirectory {
    /// Open `path`, starting empty if it does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let ini = if path.exists() {
            debug!("Loading voice directory from {:?}", path);
            let opt = ParseOption {
                enabled_quote: true,
                enabled_escape: true,
                ..ParseOption::default()
            };
            Ini::load_from_file_opt(&path, opt)
                .map_err(|e| OpenSpeechError::VoiceDirectory(format!("{}: {}", path.display(), e)))?
        } else {
            Ini::new()
        };
        Ok(Self { ini, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        let opt = WriteOption {
            escape_policy: EscapePolicy::Nothing,
            ..WriteOption::default()
        };
        self.encoded().write_to_file_opt(&tmp, opt).map_err(|e| {
            OpenSpeechError::VoiceDirectory(format!("Failed to write {}: {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Copy of the document with every name escaped and every value quoted
    fn encoded(&self) -> Ini {
        let mut out = Ini::new();
        for (section, props) in self.ini.iter() {
            let mut setter = out.with_section(section.map(escape_name));
            for (key, value) in props.iter() {
                setter.set(escape_name(key), quote_value(value));
            }
        }
        out
    }
}

impl VoiceDirectory for FileVoiceDirectory {
    fn read_voice(&self, key: &str) -> Result<Option<RegisteredVoiceRecord>> {
        let Some(token) = self.ini.section(Some(token_section(key))) else {
            return Ok(None);
        };

        let mut record = RegisteredVoiceRecord {
            key: key.to_string(),
            ..Default::default()
        };
        for (name, value) in token.iter() {
            match name {
                DEFAULT_VALUE => {}
                CLSID_VALUE => record.clsid = value.to_string(),
                PATH_VALUE => record.module_path = Some(value.to_string()),
                CONFIG_PATH_VALUE => record.config_path = Some(PathBuf::from(value)),
                lang => record.language = lang.to_string(),
            }
        }
        if let Some(attributes) = self.ini.section(Some(attributes_section(key))) {
            record.attributes = attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
        }
        if let Some(lang) = record.attributes.get(attr::LANGUAGE) {
            record.language = lang.clone();
        }
        Ok(Some(record))
    }

    fn write_voice(&mut self, record: &RegisteredVoiceRecord) -> Result<()> {
        check_name(&record.key)?;
        check_name(&record.language)?;
        for name in record.attributes.keys() {
            check_name(name)?;
        }

        self.ini.delete(Some(token_section(&record.key)));
        self.ini.delete(Some(attributes_section(&record.key)));

        {
            let mut token = self.ini.with_section(Some(token_section(&record.key)));
            token
                .set(DEFAULT_VALUE, record.key.as_str())
                .set(record.language.as_str(), record.key.as_str())
                .set(CLSID_VALUE, record.clsid.as_str());
            if let Some(ref module) = record.module_path {
                token.set(PATH_VALUE, module.as_str());
            }
            if let Some(ref config) = record.config_path {
                token.set(CONFIG_PATH_VALUE, config.to_string_lossy());
            }
        }

        {
            let mut attributes = self.ini.with_section(Some(attributes_section(&record.key)));
            for (name, value) in &record.attributes {
                attributes.set(name.as_str(), value.as_str());
            }
        }

        self.persist()
    }

    fn delete_voice(&mut self, key: &str) -> Result<bool> {
        let removed = self.ini.delete(Some(token_section(key))).is_some();
        self.ini.delete(Some(attributes_section(key)));
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }

    fn voice_keys(&self) -> Result<Vec<String>> {
        let prefix = format!("{}/", TOKENS);
        let mut keys: Vec<String> = self
            .ini
            .sections()
            .flatten()
            .filter_map(|s| s.strip_prefix(prefix.as_str()))
            .filter(|rest| !rest.contains('/'))
            .map(str::to_string)
            .collect();
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    fn read_binding(&self, clsid: &str) -> Result<Option<ComponentBinding>> {
        let voice = self
            .ini
            .section(Some(binding_section(clsid)))
            .and_then(|s| s.get(DEFAULT_VALUE));
        Ok(voice.map(|voice| ComponentBinding {
            clsid: clsid.to_string(),
            voice: voice.to_string(),
            module_path: self
                .ini
                .section(Some(server_section(clsid)))
                .and_then(|s| s.get(DEFAULT_VALUE))
                .map(str::to_string),
        }))
    }

    fn write_binding(&mut self, binding: &ComponentBinding) -> Result<()> {
        self.ini
            .with_section(Some(binding_section(&binding.clsid)))
            .set(DEFAULT_VALUE, binding.voice.as_str());
        match binding.module_path {
            Some(ref module) => {
                self.ini
                    .with_section(Some(server_section(&binding.clsid)))
                    .set(DEFAULT_VALUE, module.as_str());
            }
            None => {
                self.ini.delete(Some(server_section(&binding.clsid)));
            }
        }
        self.persist()
    }

    fn delete_binding(&mut self, clsid: &str) -> Result<()> {
        self.ini.delete(Some(binding_section(clsid)));
        self.ini.delete(Some(server_section(clsid)));
        self.persist()
    }
}
