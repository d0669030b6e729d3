//! The conversion pipeline: glob expansion, parallel catalog parsing,
//! filtering, message-tree building, and artifact emission.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use rayon::prelude::*;
use tracing::warn;

use crate::{
    error::Error,
    formats::GettextFormat,
    messages::{MessageNode, build_messages},
    plural::{ModuleSyntax, PluralRule, render_module},
    traits::Parser,
    types::Catalog,
    whitelist,
};

/// Options for one conversion run.
///
/// Only `po` is required; each output artifact is produced only when its
/// path is set.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Catalog files or glob patterns.
    pub po: Vec<String>,
    /// Header carrying the locale name; falls back to the file stem.
    pub locale_name_header: Option<String>,
    /// Output path for the generated plural-rules JS module.
    pub plural_rules: Option<PathBuf>,
    /// Output path for the combined messages JSON file.
    pub messages_file: Option<PathBuf>,
    /// Output directory for per-locale messages JSON files.
    pub messages_dir: Option<PathBuf>,
    /// Glob of source files scanned for key usage; unused keys are dropped.
    pub white_list: Option<String>,
    /// Emit flat keys instead of expanding dotted keys into nested maps.
    pub flat: bool,
    /// Module syntax of the generated plural-rules file.
    pub module_syntax: ModuleSyntax,
}

impl Options {
    /// Creates options for the given catalog patterns.
    pub fn new(po: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Options {
            po: po.into_iter().map(Into::into).collect(),
            ..Options::default()
        }
    }

    pub fn with_locale_name_header(mut self, header: Option<String>) -> Self {
        self.locale_name_header = header;
        self
    }

    pub fn with_plural_rules(mut self, path: impl Into<PathBuf>) -> Self {
        self.plural_rules = Some(path.into());
        self
    }

    pub fn with_messages_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.messages_file = Some(path.into());
        self
    }

    pub fn with_messages_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.messages_dir = Some(path.into());
        self
    }

    pub fn with_white_list(mut self, pattern: impl Into<String>) -> Self {
        self.white_list = Some(pattern.into());
        self
    }

    pub fn with_flat(mut self, flat: bool) -> Self {
        self.flat = flat;
        self
    }

    pub fn with_module_syntax(mut self, syntax: ModuleSyntax) -> Self {
        self.module_syntax = syntax;
        self
    }
}

/// The converted output for one locale.
#[derive(Debug, Clone, PartialEq)]
pub struct LocaleOutput {
    /// The message tree (flat or nested per [`Options::flat`]).
    pub messages: MessageNode,
    /// The plural rule parsed from the catalog's `Plural-Forms` header.
    pub plural: PluralRule,
}

/// Runs one conversion.
///
/// Catalogs are parsed in parallel; any single parse failure aborts the
/// whole run, since the merge step requires all results present. Each
/// requested artifact is emitted independently, creating intermediate
/// directories as needed; there is no cross-artifact atomicity.
pub fn convert(options: &Options) -> Result<BTreeMap<String, LocaleOutput>, Error> {
    if options.po.is_empty() {
        return Err(Error::MissingInput);
    }

    let files = expand_globs(&options.po)?;
    if files.is_empty() {
        warn!(patterns = %options.po.join(", "), "no catalog files found");
    }

    let parsed: Vec<(String, Catalog)> = files
        .par_iter()
        .map(|path| load_catalog(path, options.locale_name_header.as_deref()))
        .collect::<Result<_, _>>()?;

    // Later files win on locale collisions.
    let mut catalogs: BTreeMap<String, Catalog> = BTreeMap::new();
    for (locale, catalog) in parsed {
        catalogs.insert(locale, catalog);
    }

    // Plural rules are extracted before filtering so an absent or
    // malformed header fails the run regardless of whitelist results.
    let mut rules: BTreeMap<String, PluralRule> = BTreeMap::new();
    for (locale, catalog) in &catalogs {
        let header =
            catalog
                .plural_forms_header()
                .ok_or_else(|| Error::MissingPluralHeader {
                    locale: locale.clone(),
                })?;
        rules.insert(locale.clone(), PluralRule::parse(header)?);
    }

    if let Some(pattern) = &options.white_list {
        whitelist::filter_unused(&mut catalogs, pattern)?;
    }

    let mut output: BTreeMap<String, LocaleOutput> = BTreeMap::new();
    for (locale, catalog) in &catalogs {
        output.insert(
            locale.clone(),
            LocaleOutput {
                messages: build_messages(catalog, options.flat)?,
                plural: rules[locale].clone(),
            },
        );
    }

    if let Some(path) = &options.messages_file {
        write_messages_file(path, &output)?;
    }
    if let Some(dir) = &options.messages_dir {
        write_messages_dir(dir, &output)?;
    }
    if let Some(path) = &options.plural_rules {
        write_plural_rules(path, &rules, options.module_syntax)?;
    }

    Ok(output)
}

/// Expands catalog patterns into a deduplicated, sorted file list.
fn expand_globs(patterns: &[String]) -> Result<Vec<PathBuf>, Error> {
    let mut files = Vec::new();
    for pattern in patterns {
        for path in glob::glob(pattern)? {
            match path {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "skipping unreadable path"),
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Parses one catalog file and resolves its locale name.
fn load_catalog(path: &Path, locale_name_header: Option<&str>) -> Result<(String, Catalog), Error> {
    let format = GettextFormat::read_from(path)
        .map_err(|e| match e {
            Error::Parse(message) => {
                Error::Parse(format!("{} in {}", message, path.display()))
            }
            other => other,
        })?;
    let mut catalog = Catalog::from(format);

    let locale = locale_name_header
        .and_then(|header| catalog.metadata.headers.get(header).cloned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string()
        });

    catalog.metadata.locale = locale.clone();
    if catalog.parse_locale_identifier().is_none() {
        warn!(
            locale = %locale,
            path = %path.display(),
            "locale name is not a valid language identifier"
        );
    }

    Ok((locale, catalog))
}

/// Writes the combined `{locale: messages}` JSON file.
fn write_messages_file(
    path: &Path,
    output: &BTreeMap<String, LocaleOutput>,
) -> Result<(), Error> {
    let combined: BTreeMap<&String, &MessageNode> =
        output.iter().map(|(l, o)| (l, &o.messages)).collect();
    write_pretty_json(path, &combined)
}

/// Writes one `<locale>.json` per locale into `dir`.
fn write_messages_dir(dir: &Path, output: &BTreeMap<String, LocaleOutput>) -> Result<(), Error> {
    fs::create_dir_all(dir)?;
    for (locale, locale_output) in output {
        let path = dir.join(format!("{}.json", locale));
        write_pretty_json(&path, &locale_output.messages)?;
    }
    Ok(())
}

/// Writes the generated plural-rules module.
fn write_plural_rules(
    path: &Path,
    rules: &BTreeMap<String, PluralRule>,
    syntax: ModuleSyntax,
) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, render_module(rules, syntax))?;
    Ok(())
}

fn write_pretty_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const CS: &str = r#"msgid ""
msgstr ""
"Language: cs\n"
"X-Locale-Name: czech\n"
"Plural-Forms: nplurals=3; plural=(n==1) ? 0 : (n>=2 && n<=4) ? 1 : 2;\n"

msgctxt "issues"
msgid "%s issue found."
msgid_plural "%s issues found."
msgstr[0] "Byl zjištěn %s problém."
msgstr[1] "Byly zjištěny %s problémy."
msgstr[2] "Bylo zjištěno %s problémů."

msgctxt "gamemode.game.run"
msgid "Launch"
msgstr "Spustit"
"#;

    const EN: &str = r#"msgid ""
msgstr ""
"Language: en\n"
"Plural-Forms: nplurals=2; plural=(n != 1);\n"

msgctxt "issues"
msgid "%s issue found."
msgid_plural "%s issues found."
msgstr[0] ""
msgstr[1] ""

msgctxt "gamemode.game.run"
msgid "Launch"
msgstr ""
"#;

    fn write_catalogs(dir: &Path) {
        fs::write(dir.join("cs.po"), CS).unwrap();
        fs::write(dir.join("en.po"), EN).unwrap();
    }

    #[test]
    fn test_missing_input_is_fatal_before_io() {
        let err = convert(&Options::default()).unwrap_err();
        assert!(matches!(err, Error::MissingInput));
    }

    #[test]
    fn test_no_matches_yields_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = dir.path().join("*.po");
        let output = convert(&Options::new([pattern.to_str().unwrap()])).unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn test_locales_from_file_stems() {
        let dir = tempfile::tempdir().unwrap();
        write_catalogs(dir.path());

        let pattern = dir.path().join("*.po");
        let output = convert(&Options::new([pattern.to_str().unwrap()])).unwrap();

        let locales: Vec<&str> = output.keys().map(String::as_str).collect();
        assert_eq!(locales, vec!["cs", "en"]);
    }

    #[test]
    fn test_locale_from_configured_header() {
        let dir = tempfile::tempdir().unwrap();
        write_catalogs(dir.path());

        let pattern = dir.path().join("cs.po");
        let options = Options::new([pattern.to_str().unwrap()])
            .with_locale_name_header(Some("X-Locale-Name".to_string()));
        let output = convert(&options).unwrap();

        assert!(output.contains_key("czech"));
        assert!(!output.contains_key("cs"));
    }

    #[test]
    fn test_message_values_and_plural_rules() {
        let dir = tempfile::tempdir().unwrap();
        write_catalogs(dir.path());

        let pattern = dir.path().join("*.po");
        let output = convert(&Options::new([pattern.to_str().unwrap()])).unwrap();

        let cs = &output["cs"];
        assert_eq!(
            cs.messages
                .get_path("issues")
                .and_then(MessageNode::as_str),
            Some(
                "Byl zjištěn {n} problém. | Byly zjištěny {n} problémy. | Bylo zjištěno {n} problémů."
            )
        );
        assert_eq!(
            cs.messages
                .get_path("gamemode.game.run")
                .and_then(MessageNode::as_str),
            Some("Spustit")
        );
        assert_eq!(cs.plural.select(2), 1);

        // Untranslated plurals fall back to the source strings.
        let en = &output["en"];
        assert_eq!(
            en.messages
                .get_path("issues")
                .and_then(MessageNode::as_str),
            Some("{n} issue found. | {n} issues found.")
        );
    }

    #[test]
    fn test_flat_mode_keeps_dotted_keys() {
        let dir = tempfile::tempdir().unwrap();
        write_catalogs(dir.path());

        let pattern = dir.path().join("cs.po");
        let output = convert(&Options::new([pattern.to_str().unwrap()]).with_flat(true)).unwrap();

        let json = serde_json::to_value(&output["cs"].messages).unwrap();
        assert_eq!(json["gamemode.game.run"], "Spustit");
        assert!(json.get("gamemode").is_none());
    }

    #[test]
    fn test_emission_combined_and_split_agree() {
        let dir = tempfile::tempdir().unwrap();
        write_catalogs(dir.path());
        let out = dir.path().join("out");

        let pattern = dir.path().join("*.po");
        let options = Options::new([pattern.to_str().unwrap()])
            .with_messages_file(out.join("messages.json"))
            .with_messages_dir(out.join("messages"));
        convert(&options).unwrap();

        let combined: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join("messages.json")).unwrap()).unwrap();
        for locale in ["cs", "en"] {
            let split: serde_json::Value = serde_json::from_str(
                &fs::read_to_string(out.join("messages").join(format!("{}.json", locale)))
                    .unwrap(),
            )
            .unwrap();
            assert_eq!(combined[locale], split);
        }
    }

    #[test]
    fn test_plural_rules_module_emission() {
        let dir = tempfile::tempdir().unwrap();
        write_catalogs(dir.path());
        let rules_path = dir.path().join("out").join("choices.js");

        let pattern = dir.path().join("*.po");
        let options =
            Options::new([pattern.to_str().unwrap()]).with_plural_rules(&rules_path);
        convert(&options).unwrap();

        let module = fs::read_to_string(&rules_path).unwrap();
        assert!(module.contains("module.exports = {"));
        assert!(module.contains("\"cs\": function (n)"));
        assert!(module.contains("\"en\": function (n)"));
    }

    #[test]
    fn test_absent_plural_forms_header_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("cs.po"),
            concat!(
                "msgid \"\"\n",
                "msgstr \"\"\n",
                "\"Language: cs\\n\"\n",
                "\n",
                "msgctxt \"about\"\n",
                "msgid \"About\"\n",
                "msgstr \"O nás\"\n",
            ),
        )
        .unwrap();

        let pattern = dir.path().join("*.po");
        let err = convert(&Options::new([pattern.to_str().unwrap()])).unwrap_err();
        assert!(matches!(err, Error::MissingPluralHeader { locale } if locale == "cs"));
    }

    #[test]
    fn test_malformed_plural_header_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("bad.po"),
            "msgid \"\"\nmsgstr \"\"\n\"Plural-Forms: whatever\\n\"\n",
        )
        .unwrap();

        let pattern = dir.path().join("*.po");
        let err = convert(&Options::new([pattern.to_str().unwrap()])).unwrap_err();
        assert!(matches!(err, Error::PluralHeader(_)));
    }

    #[test]
    fn test_delimiter_in_translation_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("bad.po"),
            concat!(
                "msgid \"\"\n",
                "msgstr \"\"\n",
                "\"Plural-Forms: nplurals=2; plural=(n != 1);\\n\"\n",
                "\n",
                "msgctxt \"issues\"\n",
                "msgid \"%s issue\"\n",
                "msgid_plural \"%s issues\"\n",
                "msgstr[0] \"one | broken\"\n",
                "msgstr[1] \"\"\n",
            ),
        )
        .unwrap();

        let pattern = dir.path().join("*.po");
        let err = convert(&Options::new([pattern.to_str().unwrap()])).unwrap_err();
        assert!(matches!(err, Error::DelimiterInTranslation { .. }));
    }

    #[test]
    fn test_whitelist_filtering_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        write_catalogs(dir.path());
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("app.js"), "$tc('issues', n);").unwrap();

        let po_pattern = dir.path().join("*.po");
        let wl_pattern = src.join("*.js");
        let options = Options::new([po_pattern.to_str().unwrap()])
            .with_white_list(wl_pattern.to_str().unwrap());
        let output = convert(&options).unwrap();

        // `issues` is referenced; `gamemode.game.run` is not and is dropped.
        let json = serde_json::to_value(&output["cs"].messages).unwrap();
        assert!(json.get("issues").is_some());
        assert!(json.get("gamemode").is_none());
    }
}
