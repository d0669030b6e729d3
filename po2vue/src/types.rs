//! Core, format-agnostic types for po2vue.
//! The PO parser decodes into these; the converter consumes them.

use std::{collections::HashMap, fmt::Display};

use serde::{Deserialize, Serialize};
use unic_langid::LanguageIdentifier;

/// Name of the gettext header carrying the plural-forms declaration.
pub const PLURAL_FORMS_HEADER: &str = "Plural-Forms";

/// A parsed translation catalog for a single locale
/// (corresponds to one `.po` file).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Catalog {
    /// Header-level metadata (locale identifier, raw PO headers).
    pub metadata: Metadata,

    /// Ordered list of all entries in this catalog.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[serde(default)]
    pub entries: Vec<Entry>,
}

impl Catalog {
    pub(crate) fn add_entry(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    pub fn find_entry(&self, context: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.context == context)
    }

    /// Raw `Plural-Forms` header, if the catalog declares one.
    pub fn plural_forms_header(&self) -> Option<&str> {
        self.metadata
            .headers
            .get(PLURAL_FORMS_HEADER)
            .map(String::as_str)
    }

    pub fn parse_locale_identifier(&self) -> Option<LanguageIdentifier> {
        self.metadata.locale.replace('_', "-").parse().ok()
    }
}

/// Free-form metadata for the catalog as a whole.
///
/// `locale` is resolved from a configured header or the file name;
/// `headers` holds the raw PO header block verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Metadata {
    /// The locale identifier (e.g. "en", "cs", "pt-BR").
    pub locale: String,

    /// All headers from the catalog's header entry.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl Display for Metadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Metadata {{ locale: {}, headers: {} }}",
            self.locale,
            self.headers.len()
        )
    }
}

/// A single message entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Entry {
    /// The lookup key (`msgctxt`); may be dot-path structured.
    /// An empty context is invalid and skipped during conversion.
    pub context: String,

    /// Untranslated singular text (`msgid`).
    pub source: String,

    /// Untranslated plural text (`msgid_plural`), if the entry is plural.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub plural_source: Option<String>,

    /// Translated variants (`msgstr` / `msgstr[N]`), in index order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[serde(default)]
    pub translations: Vec<String>,

    /// Optional comment for translators.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub comment: Option<String>,
}

impl Entry {
    pub fn is_plural(&self) -> bool {
        self.plural_source.is_some()
    }

    /// Whether any translated variant is non-empty.
    pub fn is_translated(&self) -> bool {
        self.translations.iter().any(|t| !t.is_empty())
    }
}

impl Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Entry {{ context: {}, source: {}, plural: {} }}",
            self.context,
            self.source,
            self.is_plural()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(locale: &str) -> Catalog {
        Catalog {
            metadata: Metadata {
                locale: locale.to_string(),
                headers: HashMap::new(),
            },
            entries: Vec::new(),
        }
    }

    #[test]
    fn test_catalog_add_and_find_entry() {
        let mut cat = catalog("en");
        cat.add_entry(Entry {
            context: "about".to_string(),
            source: "About".to_string(),
            plural_source: None,
            translations: vec!["About us".to_string()],
            comment: None,
        });

        assert_eq!(cat.entries.len(), 1);
        assert!(cat.find_entry("about").is_some());
        assert!(cat.find_entry("missing").is_none());
    }

    #[test]
    fn test_plural_forms_header_lookup() {
        let mut cat = catalog("en");
        assert!(cat.plural_forms_header().is_none());

        cat.metadata.headers.insert(
            PLURAL_FORMS_HEADER.to_string(),
            "nplurals=2; plural=(n != 1);".to_string(),
        );
        assert_eq!(
            cat.plural_forms_header(),
            Some("nplurals=2; plural=(n != 1);")
        );
    }

    #[test]
    fn test_parse_locale_identifier() {
        let cat = catalog("pt_BR");
        let lang_id = cat.parse_locale_identifier().unwrap();
        assert_eq!(lang_id.language.as_str(), "pt");
        assert_eq!(lang_id.region.unwrap().as_str(), "BR");
    }

    #[test]
    fn test_parse_invalid_locale_identifier() {
        let cat = catalog("not a locale");
        assert!(cat.parse_locale_identifier().is_none());
    }

    #[test]
    fn test_entry_is_plural_and_translated() {
        let entry = Entry {
            context: "issues".to_string(),
            source: "%s issue found.".to_string(),
            plural_source: Some("%s issues found.".to_string()),
            translations: vec![String::new(), String::new()],
            comment: None,
        };

        assert!(entry.is_plural());
        assert!(!entry.is_translated());
    }

    #[test]
    fn test_entry_display() {
        let entry = Entry {
            context: "about".to_string(),
            source: "About".to_string(),
            plural_source: None,
            translations: vec![],
            comment: None,
        };
        let display = format!("{}", entry);
        assert!(display.contains("about"));
        assert!(display.contains("About"));
    }
}
