//! Locale to platform language identifier resolution

use log::{debug, warn};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

/// Numeric platform language identifier (LCID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LanguageId(pub u16);

/// Generic English, used when nothing else matches
pub const DEFAULT_LANGUAGE: LanguageId = LanguageId(0x0409);

impl fmt::Display for LanguageId {
    /// Upper-case hex without padding, as the voice directory stores it (`409`, `C0A`)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}", self.0)
    }
}

impl LanguageId {
    /// Parse the stored hex form back
    pub fn parse(s: &str) -> Option<Self> {
        u16::from_str_radix(s.trim().trim_start_matches("0x"), 16)
            .ok()
            .map(LanguageId)
    }
}

/// Pairs where the platform identifier differs from a naive lookup
static EXCEPTIONS: Lazy<HashMap<&'static str, LanguageId>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("en-gb", LanguageId(0x0809));
    // Common misspelling of en-GB
    m.insert("en-uk", LanguageId(0x0809));
    m
});

/// Locale catalog (full tags and bare languages)
static LOCALES: Lazy<HashMap<&'static str, u16>> = Lazy::new(|| {
    [
        ("en-us", 0x0409),
        ("en-gb", 0x0809),
        ("en-au", 0x0C09),
        ("en-ca", 0x1009),
        ("en-nz", 0x1409),
        ("en-ie", 0x1809),
        ("en-in", 0x4009),
        ("fr-fr", 0x040C),
        ("fr-be", 0x080C),
        ("fr-ca", 0x0C0C),
        ("de-de", 0x0407),
        ("de-ch", 0x0807),
        ("de-at", 0x0C07),
        ("es-es", 0x0C0A),
        ("es-mx", 0x080A),
        ("it-it", 0x0410),
        ("pt-br", 0x0416),
        ("pt-pt", 0x0816),
        ("ja-jp", 0x0411),
        ("ko-kr", 0x0412),
        ("zh-cn", 0x0804),
        ("zh-tw", 0x0404),
        ("ru-ru", 0x0419),
        ("ar-sa", 0x0401),
        ("hi-in", 0x0439),
        ("th-th", 0x041E),
        ("vi-vn", 0x042A),
        ("tr-tr", 0x041F),
        ("pl-pl", 0x0415),
        ("nl-nl", 0x0413),
        ("nl-be", 0x0813),
        ("sv-se", 0x041D),
        ("da-dk", 0x0406),
        ("no-no", 0x0414),
        ("nb-no", 0x0414),
        ("fi-fi", 0x040B),
        ("cs-cz", 0x0405),
        ("el-gr", 0x0408),
        ("he-il", 0x040D),
        ("hu-hu", 0x040E),
        ("id-id", 0x0421),
        ("uk-ua", 0x0422),
        ("cy-gb", 0x0452),
        // Bare languages resolve to their primary region
        ("en", 0x0409),
        ("fr", 0x040C),
        ("de", 0x0407),
        ("es", 0x0C0A),
        ("it", 0x0410),
        ("pt", 0x0416),
        ("ja", 0x0411),
        ("ko", 0x0412),
        ("zh", 0x0804),
        ("ru", 0x0419),
        ("ar", 0x0401),
        ("hi", 0x0439),
        ("th", 0x041E),
        ("vi", 0x042A),
        ("tr", 0x041F),
        ("pl", 0x0415),
        ("nl", 0x0413),
        ("sv", 0x041D),
        ("da", 0x0406),
        ("no", 0x0414),
        ("nb", 0x0414),
        ("fi", 0x040B),
        ("cs", 0x0405),
        ("el", 0x0408),
        ("he", 0x040D),
        ("hu", 0x040E),
        ("id", 0x0421),
        ("uk", 0x0422),
        ("cy", 0x0452),
    ]
    .into_iter()
    .collect()
});

/// Source of locale -> identifier mappings
pub trait LocaleCatalog: Send + Sync {
    /// Look up a normalized (lower-case, hyphenated) tag
    fn lookup(&self, tag: &str) -> Option<LanguageId>;
}

/// Compiled-in catalog
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinLocales;

impl LocaleCatalog for BuiltinLocales {
    fn lookup(&self, tag: &str) -> Option<LanguageId> {
        LOCALES.get(tag).copied().map(LanguageId)
    }
}

/// Resolver applying exceptions, catalog, language-only retry and default
pub struct LanguageResolver {
    catalog: Box<dyn LocaleCatalog>,
}

impl Default for LanguageResolver {
    fn default() -> Self {
        Self::new(Box::new(BuiltinLocales))
    }
}

impl LanguageResolver {
    pub fn new(catalog: Box<dyn LocaleCatalog>) -> Self {
        Self { catalog }
    }

    /// Resolve `locale`; never fails
    pub fn resolve(&self, locale: &str) -> LanguageId {
        let tag = normalize(locale);

        if let Some(id) = EXCEPTIONS.get(tag.as_str()) {
            return *id;
        }
        if let Some(id) = self.catalog.lookup(&tag) {
            return id;
        }

        let language = tag.split('-').next().unwrap_or_default();
        if !language.is_empty() && language != tag {
            if let Some(id) = self.catalog.lookup(language) {
                debug!("Locale {} resolved by language {}", locale, language);
                return id;
            }
        }

        warn!(
            "Could not resolve locale '{}', using default language {}",
            locale, DEFAULT_LANGUAGE
        );
        DEFAULT_LANGUAGE
    }
}

/// `en_US`, ` EN-us ` -> `en-us`
fn normalize(locale: &str) -> String {
    locale.trim().replace('_', "-").to_ascii_lowercase()
}
