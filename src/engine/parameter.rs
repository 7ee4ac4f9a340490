//! Engine parameter schema
//!
//! Each engine publishes the parameters it needs (API keys, regions, model
//! ids). The schema drives validation, UI prompts and which values the
//! configuration store encrypts at rest.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single configurable engine parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationParameter {
    /// Key in the engine's parameter map
    pub name: String,

    /// Label shown by configuration front-ends
    pub display_name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_required")]
    pub required: bool,

    /// Secret values are encrypted at rest and redacted from logs
    #[serde(default)]
    pub secret: bool,

    #[serde(default)]
    pub default_value: Option<String>,

    /// Empty means any value is accepted
    #[serde(default)]
    pub allowed_values: Vec<String>,

    /// Pattern the whole value must match
    #[serde(default)]
    pub validation_pattern: Option<String>,
}

fn default_required() -> bool {
    true
}

impl ConfigurationParameter {
    /// Required, non-secret parameter
    pub fn new(name: &str, display_name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            description: description.to_string(),
            required: true,
            secret: false,
            default_value: None,
            allowed_values: Vec::new(),
            validation_pattern: None,
        }
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_default(mut self, value: &str) -> Self {
        self.default_value = Some(value.to_string());
        self
    }

    pub fn with_allowed_values(mut self, values: &[&str]) -> Self {
        self.allowed_values = values.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.validation_pattern = Some(pattern.to_string());
        self
    }

    /// Value to use when the parameter map has no entry
    pub fn effective_value<'a>(&'a self, params: &'a HashMap<String, String>) -> Option<&'a str> {
        params
            .get(&self.name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
            .or(self.default_value.as_deref())
    }

    /// Check one value against this parameter's rules
    ///
    /// Returns a human-readable reason on failure.
    pub fn validate(&self, value: Option<&str>) -> std::result::Result<(), String> {
        let value = match value.filter(|v| !v.is_empty()) {
            Some(v) => v,
            None => {
                if self.required && self.default_value.is_none() {
                    return Err(format!("missing required parameter '{}'", self.name));
                }
                return Ok(());
            }
        };

        if !self.allowed_values.is_empty() && !self.allowed_values.iter().any(|a| a == value) {
            return Err(format!(
                "parameter '{}' must be one of [{}]",
                self.name,
                self.allowed_values.join(", ")
            ));
        }

        if let Some(ref pattern) = self.validation_pattern {
            let anchored = format!("^(?:{})$", pattern);
            let re = Regex::new(&anchored).map_err(|e| {
                format!("parameter '{}' has an invalid pattern: {}", self.name, e)
            })?;
            if !re.is_match(value) {
                // Never echo the value: it may be a secret
                return Err(format!(
                    "parameter '{}' does not match pattern {}",
                    self.name, pattern
                ));
            }
        }

        Ok(())
    }
}

/// Validate a whole parameter map against a schema
///
/// Stops at the first failing parameter.
pub fn validate_parameters(
    schema: &[ConfigurationParameter],
    params: &HashMap<String, String>,
) -> std::result::Result<(), String> {
    for param in schema {
        param.validate(params.get(&param.name).map(String::as_str))?;
    }
    Ok(())
}
