//! Message value resolution and key-path assignment.
//!
//! Entries resolve to the strings a VueI18n-style runtime consumes:
//! singular entries take the first translated variant (or fall back to
//! the source text), plural entries join every variant with ` | ` so
//! the runtime's choice index can pick one. Keys are either used
//! verbatim (flat mode) or split on `.` into a nested tree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    error::Error,
    types::{Catalog, Entry},
};

/// Delimiter joining plural variants; translations must not contain it.
pub const PLURAL_DELIMITER: char = '|';

/// Placeholder substituted for printf-style `%s` count markers.
pub const COUNT_PLACEHOLDER: &str = "{n}";

/// One node in a per-locale message tree.
///
/// Serializes untagged, so a tree becomes plain JSON: leaves are
/// strings, branches are objects.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MessageNode {
    Leaf(String),
    Branch(BTreeMap<String, MessageNode>),
}

impl MessageNode {
    /// Creates an empty branch to insert into.
    pub fn root() -> Self {
        MessageNode::Branch(BTreeMap::new())
    }

    /// Inserts a value under a dotted key path.
    ///
    /// Collision policy is last-write-wins: a leaf sitting where a
    /// branch is needed is replaced by a branch, and a branch is
    /// replaced when a leaf lands on it.
    pub fn insert_path(&mut self, path: &str, value: String) {
        match self {
            MessageNode::Branch(map) => match path.split_once('.') {
                None => {
                    map.insert(path.to_string(), MessageNode::Leaf(value));
                }
                Some((head, rest)) => {
                    map.entry(head.to_string())
                        .or_insert_with(MessageNode::root)
                        .insert_path(rest, value);
                }
            },
            MessageNode::Leaf(_) => {
                *self = MessageNode::root();
                self.insert_path(path, value);
            }
        }
    }

    /// Inserts a value under the key as-is, without path splitting.
    pub fn insert_flat(&mut self, key: &str, value: String) {
        if let MessageNode::Branch(map) = self {
            map.insert(key.to_string(), MessageNode::Leaf(value));
        }
    }

    /// Looks a value up by dotted path; for tests and consumers.
    pub fn get_path(&self, path: &str) -> Option<&MessageNode> {
        let mut node = self;
        for segment in path.split('.') {
            match node {
                MessageNode::Branch(map) => node = map.get(segment)?,
                MessageNode::Leaf(_) => return None,
            }
        }
        Some(node)
    }

    /// The string held by a leaf node, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MessageNode::Leaf(value) => Some(value),
            MessageNode::Branch(_) => None,
        }
    }
}

/// Resolves one entry to its output string.
///
/// Singular entries yield the first variant if non-empty, else the
/// source text. Plural entries join all variants with ` | `, falling
/// back to `source | plural_source` when nothing is translated, and
/// substitute `%s` with `{n}`. A variant containing the delimiter is
/// fatal, because the runtime would mis-split the joined string.
pub fn resolve_value(entry: &Entry) -> Result<String, Error> {
    let Some(plural_source) = &entry.plural_source else {
        let first = entry.translations.first().map(String::as_str).unwrap_or("");
        return Ok(if first.is_empty() {
            entry.source.clone()
        } else {
            first.to_string()
        });
    };

    if entry
        .translations
        .iter()
        .any(|t| t.contains(PLURAL_DELIMITER))
    {
        return Err(Error::DelimiterInTranslation {
            key: entry.context.clone(),
        });
    }

    let joined = if entry.is_translated() {
        entry.translations.join(" | ")
    } else {
        format!("{} | {}", entry.source, plural_source)
    };

    Ok(joined.replace("%s", COUNT_PLACEHOLDER))
}

/// Builds the message tree for one catalog.
///
/// Entries without a context key are logged and skipped rather than
/// aborting the run.
pub fn build_messages(catalog: &Catalog, flat: bool) -> Result<MessageNode, Error> {
    let mut root = MessageNode::root();

    for entry in &catalog.entries {
        if entry.context.is_empty() {
            warn!(
                locale = %catalog.metadata.locale,
                msgid = %entry.source,
                "skipping entry without a context key"
            );
            continue;
        }

        let value = resolve_value(entry)?;
        if flat {
            root.insert_flat(&entry.context, value);
        } else {
            root.insert_path(&entry.context, value);
        }
    }

    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metadata;
    use std::collections::HashMap;

    fn singular(context: &str, source: &str, translation: &str) -> Entry {
        Entry {
            context: context.to_string(),
            source: source.to_string(),
            plural_source: None,
            translations: if translation.is_empty() {
                vec![]
            } else {
                vec![translation.to_string()]
            },
            comment: None,
        }
    }

    fn plural(context: &str, source: &str, plural_source: &str, translations: &[&str]) -> Entry {
        Entry {
            context: context.to_string(),
            source: source.to_string(),
            plural_source: Some(plural_source.to_string()),
            translations: translations.iter().map(|t| t.to_string()).collect(),
            comment: None,
        }
    }

    fn catalog(entries: Vec<Entry>) -> Catalog {
        Catalog {
            metadata: Metadata {
                locale: "en".to_string(),
                headers: HashMap::new(),
            },
            entries,
        }
    }

    #[test]
    fn test_singular_translation_used_verbatim() {
        let entry = singular("about", "About", "O nás");
        assert_eq!(resolve_value(&entry).unwrap(), "O nás");
    }

    #[test]
    fn test_singular_falls_back_to_source() {
        let entry = singular("about", "About", "");
        assert_eq!(resolve_value(&entry).unwrap(), "About");
    }

    #[test]
    fn test_plural_joins_all_variants() {
        let entry = plural(
            "issues",
            "%s issue found.",
            "%s issues found.",
            &[
                "Byl zjištěn %s problém.",
                "Byly zjištěny %s problémy.",
                "Bylo zjištěno %s problémů.",
            ],
        );
        assert_eq!(
            resolve_value(&entry).unwrap(),
            "Byl zjištěn {n} problém. | Byly zjištěny {n} problémy. | Bylo zjištěno {n} problémů."
        );
    }

    #[test]
    fn test_untranslated_plural_falls_back_to_sources() {
        let entry = plural(
            "issues",
            "%s issue found.",
            "%s issues found.",
            &["", ""],
        );
        assert_eq!(
            resolve_value(&entry).unwrap(),
            "{n} issue found. | {n} issues found."
        );
    }

    #[test]
    fn test_delimiter_in_plural_variant_is_fatal() {
        let entry = plural(
            "issues",
            "%s issue",
            "%s issues",
            &["one | two", ""],
        );
        let err = resolve_value(&entry).unwrap_err();
        assert!(matches!(err, Error::DelimiterInTranslation { key } if key == "issues"));
    }

    #[test]
    fn test_nested_key_path() {
        let mut root = MessageNode::root();
        root.insert_path("gamemode.game.run", "Launch".to_string());

        let leaf = root.get_path("gamemode.game.run").unwrap();
        assert_eq!(leaf.as_str(), Some("Launch"));
        assert!(matches!(
            root.get_path("gamemode.game").unwrap(),
            MessageNode::Branch(_)
        ));
    }

    #[test]
    fn test_flat_key_keeps_dots() {
        let mut root = MessageNode::root();
        root.insert_flat("gamemode.game.run", "Launch".to_string());

        match &root {
            MessageNode::Branch(map) => {
                assert!(map.contains_key("gamemode.game.run"));
                assert!(!map.contains_key("gamemode"));
            }
            MessageNode::Leaf(_) => panic!("root must be a branch"),
        }
    }

    #[test]
    fn test_collision_last_write_wins() {
        let mut root = MessageNode::root();
        root.insert_path("game", "Game".to_string());
        root.insert_path("game.run", "Launch".to_string());
        assert_eq!(
            root.get_path("game.run").and_then(MessageNode::as_str),
            Some("Launch")
        );

        // And the other direction: a leaf landing on a branch replaces it.
        root.insert_path("game", "Game".to_string());
        assert_eq!(
            root.get_path("game").and_then(MessageNode::as_str),
            Some("Game")
        );
    }

    #[test]
    fn test_build_messages_skips_empty_context() {
        let cat = catalog(vec![
            singular("", "Orphan", "Sirotek"),
            singular("about", "About", "O nás"),
        ]);
        let root = build_messages(&cat, false).unwrap();
        match &root {
            MessageNode::Branch(map) => assert_eq!(map.len(), 1),
            MessageNode::Leaf(_) => panic!("root must be a branch"),
        }
        assert!(root.get_path("about").is_some());
    }

    #[test]
    fn test_build_messages_flat_and_nested() {
        let cat = catalog(vec![singular("gamemode.game.run", "Launch", "")]);

        let nested = build_messages(&cat, false).unwrap();
        assert_eq!(
            nested
                .get_path("gamemode.game.run")
                .and_then(MessageNode::as_str),
            Some("Launch")
        );

        let flat = build_messages(&cat, true).unwrap();
        match &flat {
            MessageNode::Branch(map) => {
                assert_eq!(
                    map.get("gamemode.game.run").and_then(MessageNode::as_str),
                    Some("Launch")
                );
            }
            MessageNode::Leaf(_) => panic!("root must be a branch"),
        }
    }

    #[test]
    fn test_serialization_is_plain_json() {
        let mut root = MessageNode::root();
        root.insert_path("gamemode.game.run", "Launch".to_string());
        root.insert_flat("about", "About".to_string());

        let json = serde_json::to_value(&root).unwrap();
        assert_eq!(json["gamemode"]["game"]["run"], "Launch");
        assert_eq!(json["about"], "About");
    }
}
