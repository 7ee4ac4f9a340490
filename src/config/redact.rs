//! Redaction of secret parameters in log output

use std::collections::HashSet;
use std::fmt;

const REDACTED: &str = "<redacted>";

/// Name fragments that mark a parameter as secret even without a schema
const SECRET_HINTS: &[&str] = &["key", "secret", "token", "password", "credential", "creds"];

/// True if a parameter name looks like it holds a credential
pub fn looks_secret(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SECRET_HINTS.iter().any(|hint| lower.contains(hint))
}

/// Display wrapper that prints a parameter map with secrets masked
///
/// ```
/// use std::collections::{BTreeMap, HashSet};
/// use openspeech::config::RedactedParameters;
///
/// let mut params = BTreeMap::new();
/// params.insert("apiKey".to_string(), "hunter2".to_string());
/// params.insert("region".to_string(), "eastus".to_string());
/// let shown = RedactedParameters::new(&params, &HashSet::new()).to_string();
/// assert!(!shown.contains("hunter2"));
/// assert!(shown.contains("eastus"));
/// ```
pub struct RedactedParameters<'a, I> {
    params: I,
    secrets: &'a HashSet<String>,
}

impl<'a, I> RedactedParameters<'a, I> {
    pub fn new(params: I, secrets: &'a HashSet<String>) -> Self {
        Self { params, secrets }
    }
}

impl<'a, 'p, I> fmt::Display for RedactedParameters<'a, I>
where
    I: IntoIterator<Item = (&'p String, &'p String)> + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self.params.clone().into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        f.write_str("{")?;
        for (i, (name, value)) in entries.into_iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let shown = if self.secrets.contains(name) || looks_secret(name) {
                REDACTED
            } else {
                value.as_str()
            };
            write!(f, "{}={}", name, shown)?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_looks_secret() {
        assert!(looks_secret("apiKey"));
        assert!(looks_secret("subscriptionKey"));
        assert!(looks_secret("password"));
        assert!(!looks_secret("region"));
        assert!(!looks_secret("userId"));
    }

    #[test]
    fn test_schema_secrets_are_redacted() {
        let mut params = HashMap::new();
        params.insert("userId".to_string(), "alice".to_string());
        params.insert("pin".to_string(), "1234".to_string());
        let secrets: HashSet<String> = ["pin".to_string()].into_iter().collect();

        let shown = RedactedParameters::new(&params, &secrets).to_string();
        assert_eq!(shown, "{pin=<redacted>, userId=alice}");
    }
}
