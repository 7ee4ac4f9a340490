//! Voice descriptors produced by engines

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Canonical voice gender as understood by the platform voice directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Neutral,
}

impl Gender {
    /// Canonicalize an arbitrary gender string
    ///
    /// Unknown or empty input maps to `Male`, which is what speech clients
    /// expect when no gender attribute was ever declared.
    pub fn normalize(input: &str) -> Self {
        match input.trim().to_ascii_lowercase().as_str() {
            "f" | "female" | "woman" => Gender::Female,
            "n" | "neutral" | "neuter" => Gender::Neutral,
            _ => Gender::Male,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical voice age
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Age {
    Child,
    Teen,
    Adult,
    Senior,
}

impl Age {
    /// Canonicalize an arbitrary age string, defaulting to `Adult`
    pub fn normalize(input: &str) -> Self {
        match input.trim().to_ascii_lowercase().as_str() {
            "child" | "kid" => Age::Child,
            "teen" | "teenager" => Age::Teen,
            "senior" | "elderly" | "old" => Age::Senior,
            _ => Age::Adult,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Age::Child => "Child",
            Age::Teen => "Teen",
            Age::Adult => "Adult",
            Age::Senior => "Senior",
        }
    }
}

impl fmt::Display for Age {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One synthesis persona exposed by an engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceDescriptor {
    /// Engine-local voice id (model id, cloud short name)
    pub id: String,

    /// Name shown to speech clients; also the voice directory key
    pub display_name: String,

    /// Free-form gender as reported by the backend
    #[serde(default)]
    pub gender: String,

    /// Locale tag such as `en-US`
    #[serde(default)]
    pub locale: String,

    #[serde(default = "default_age")]
    pub age: String,

    /// Owning engine name
    #[serde(default)]
    pub engine: String,

    #[serde(default)]
    pub styles: Vec<String>,

    #[serde(default)]
    pub roles: Vec<String>,

    #[serde(default)]
    pub selected_style: Option<String>,

    #[serde(default)]
    pub selected_role: Option<String>,

    /// Engine-specific extras carried into the voice directory
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

fn default_age() -> String {
    "Adult".to_string()
}

impl VoiceDescriptor {
    pub fn new(id: &str, display_name: &str, locale: &str, gender: &str, engine: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            gender: gender.to_string(),
            locale: locale.to_string(),
            age: default_age(),
            engine: engine.to_string(),
            styles: Vec::new(),
            roles: Vec::new(),
            selected_style: None,
            selected_role: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    pub fn gender(&self) -> Gender {
        Gender::normalize(&self.gender)
    }

    pub fn age(&self) -> Age {
        Age::normalize(&self.age)
    }
}
