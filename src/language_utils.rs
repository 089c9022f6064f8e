//! Language catalog
//!
//! Maps a language code to a display name for selection inputs. The
//! session protocol never consults it: language tags are passed to the
//! service unmodified.

use isolang::Language;
use log::{debug, warn};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

use crate::transport::HttpTransport;

/// ISO 639-1 codes offered when the service does not provide a list
const DEFAULT_CODES: [&str; 27] = [
    "zh", "en", "ja", "ko", "fr", "de", "es", "ru", "ar", "pt", "it", "nl", "sv", "no", "da",
    "fi", "pl", "tr", "hu", "cs", "ro", "bg", "el", "he", "hi", "id", "ms",
];

static DEFAULT_CATALOG: Lazy<LanguageCatalog> = Lazy::new(|| {
    LanguageCatalog::from_entries(
        DEFAULT_CODES
            .iter()
            .map(|code| (code.to_string(), get_language_name(code))),
    )
});

/// Code to display-name mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageCatalog {
    entries: BTreeMap<String, String>,
}

impl Default for LanguageCatalog {
    fn default() -> Self {
        DEFAULT_CATALOG.clone()
    }
}

impl LanguageCatalog {
    /// Build a catalog; blank codes are dropped and blank names resolved through ISO 639
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let entries = entries
            .into_iter()
            .filter_map(|(code, name)| {
                let code = code.trim().to_lowercase();
                if code.is_empty() {
                    return None;
                }
                let name = if name.trim().is_empty() {
                    get_language_name(&code)
                } else {
                    name.trim().to_string()
                };
                Some((code, name))
            })
            .collect();
        Self { entries }
    }

    /// Load the service's catalog, falling back to the built-in one on any failure
    pub async fn fetch(transport: &HttpTransport, path: &str) -> Self {
        match transport.get_json::<BTreeMap<String, String>>(path).await {
            Ok(entries) if !entries.is_empty() => {
                debug!("Loaded {} languages from the service", entries.len());
                Self::from_entries(entries)
            }
            Ok(_) => {
                warn!("Service returned an empty language list, using the built-in catalog");
                Self::default()
            }
            Err(e) => {
                warn!("Failed to load languages ({}), using the built-in catalog", e);
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(&code.trim().to_lowercase())
    }

    /// Display name of `code`
    pub fn name(&self, code: &str) -> Option<&str> {
        self.entries.get(&code.trim().to_lowercase()).map(String::as_str)
    }

    /// Entries ordered by code
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(code, name)| (code.as_str(), name.as_str()))
    }
}

/// English name of an ISO 639-1 or 639-3 code, the code itself when unknown
pub fn get_language_name(code: &str) -> String {
    let normalized = code.trim().to_lowercase();
    let language = match normalized.len() {
        2 => Language::from_639_1(&normalized),
        3 => Language::from_639_3(&normalized),
        _ => None,
    };
    match language {
        Some(lang) => match lang.to_autonym() {
            Some(autonym) if autonym != lang.to_name() => format!("{} ({})", lang.to_name(), autonym),
            _ => lang.to_name().to_string(),
        },
        None => normalized,
    }
}
