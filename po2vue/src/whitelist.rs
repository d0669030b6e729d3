//! Usage-based key filtering.
//!
//! A best-effort static scan: each distinct context key becomes one
//! regex looking for quoted literal occurrences of the key (or, for
//! dotted keys, of any quoted key prefix followed by a dot). Keys found
//! in no whitelist file are dropped from every catalog.
//!
//! This is a textual heuristic, not a reference finder. It under-matches
//! when keys are built dynamically (`t(prefix + name)`) and over-matches
//! when a key literal appears by coincidence; both modes are accepted
//! and documented rather than patched over.

use std::collections::{BTreeMap, HashSet};
use std::fs;

use regex::Regex;
use tracing::{debug, warn};

use crate::{error::Error, types::Catalog};

/// One key awaiting discovery in the whitelist files.
struct KeyMatcher {
    key: String,
    regex: Regex,
}

/// Builds the scan pattern for one context key.
///
/// An undotted key matches only as a fully quoted literal. A dotted key
/// `c0.c1.c2` matches as any quoted prefix ending in a dot
/// (`'c0.'`, `'c0.c1.'`, including template literals like
/// `` `c0.${rest}` `` where the closing quote is deferred) or as the
/// fully quoted key. `namespace + '.rest.of.path'` thus defeats the scan.
pub fn key_pattern(key: &str) -> String {
    const QUOTE: &str = "['\"`]";

    if !key.contains('.') {
        return format!("{}{}{}", QUOTE, regex::escape(key), QUOTE);
    }

    let components: Vec<String> = key.split('.').map(|c| regex::escape(c)).collect();
    let mut alternatives = Vec::with_capacity(components.len());
    let mut prefix = String::new();

    for (index, component) in components.iter().enumerate() {
        if index > 0 {
            prefix.push_str("[.]");
        }
        prefix.push_str(component);
        if index + 1 < components.len() {
            alternatives.push(format!("({}{}[.]['\"`$])", QUOTE, prefix));
        } else {
            alternatives.push(format!("({}{}{})", QUOTE, prefix, QUOTE));
        }
    }

    alternatives.join("|")
}

/// Removes keys not found in any file matched by `pattern` from all
/// catalogs.
///
/// Scanning short-circuits per key: once a key is seen in one file its
/// matcher is dropped, and the traversal stops entirely when every key
/// has been found. Unreadable files are logged and skipped.
pub fn filter_unused(catalogs: &mut BTreeMap<String, Catalog>, pattern: &str) -> Result<(), Error> {
    let mut matchers: Vec<KeyMatcher> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for catalog in catalogs.values() {
        for entry in &catalog.entries {
            if entry.context.is_empty() || !seen.insert(entry.context.as_str()) {
                continue;
            }
            let pattern = key_pattern(&entry.context);
            // The pattern is built from escaped components, so a build
            // failure would be a bug rather than bad input.
            match Regex::new(&pattern) {
                Ok(regex) => matchers.push(KeyMatcher {
                    key: entry.context.clone(),
                    regex,
                }),
                Err(e) => warn!(key = %entry.context, error = %e, "skipping unscannable key"),
            }
        }
    }

    if matchers.is_empty() {
        return Ok(());
    }

    for path in glob::glob(pattern)? {
        let path = match path {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "skipping unreadable whitelist path");
                continue;
            }
        };
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable whitelist file");
                continue;
            }
        };

        matchers.retain(|matcher| !matcher.regex.is_match(&text));
        if matchers.is_empty() {
            break;
        }
    }

    if matchers.is_empty() {
        return Ok(());
    }

    let unused: HashSet<String> = matchers.into_iter().map(|m| m.key).collect();
    debug!(count = unused.len(), "removing keys unused by whitelist files");

    for catalog in catalogs.values_mut() {
        catalog
            .entries
            .retain(|entry| !unused.contains(&entry.context));
    }

    Ok(())
}
