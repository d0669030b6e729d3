//! Support for the gettext `.po` catalog format.
//!
//! Provides parsing, serialization, and conversion to the internal
//! [`Catalog`] model. The parser is line oriented: directives
//! (`msgctxt`, `msgid`, `msgid_plural`, `msgstr`, `msgstr[N]`) open a
//! field, bare quoted lines continue it, and a blank line closes the
//! entry. Obsolete entries (`#~`) are dropped.

use std::collections::{BTreeMap, HashMap};

use crate::{
    error::Error,
    traits::Parser,
    types::{Catalog, Entry, Metadata},
};

/// Name of the header the gettext toolchain uses for the locale code.
pub const LANGUAGE_HEADER: &str = "Language";

/// Represents one gettext `.po` file: the header block plus all entries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Format {
    /// Headers from the leading entry with an empty `msgid`.
    pub headers: HashMap<String, String>,
    /// All message entries, excluding the header entry and obsolete ones.
    pub entries: Vec<Entry>,
}

/// The field currently accepting continuation lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Msgctxt,
    Msgid,
    MsgidPlural,
    Msgstr(usize),
}

/// One entry under construction while scanning lines.
#[derive(Debug, Default)]
struct Builder {
    context: String,
    source: Option<String>,
    plural_source: Option<String>,
    translations: Vec<String>,
    comments: Vec<String>,
    field: Option<Field>,
}

impl Builder {
    fn append(&mut self, text: &str) -> Result<(), Error> {
        match self.field {
            Some(Field::Msgctxt) => self.context.push_str(text),
            Some(Field::Msgid) => match &mut self.source {
                Some(source) => source.push_str(text),
                None => self.source = Some(text.to_string()),
            },
            Some(Field::MsgidPlural) => match &mut self.plural_source {
                Some(plural) => plural.push_str(text),
                None => self.plural_source = Some(text.to_string()),
            },
            Some(Field::Msgstr(index)) => {
                if self.translations.len() <= index {
                    self.translations.resize(index + 1, String::new());
                }
                self.translations[index].push_str(text);
            }
            None => {
                return Err(Error::parse_error(
                    "continuation line outside of any entry field",
                ));
            }
        }
        Ok(())
    }

    /// Closes the entry, folding the header entry into `headers`.
    fn flush(
        &mut self,
        headers: &mut HashMap<String, String>,
        entries: &mut Vec<Entry>,
    ) -> Result<(), Error> {
        if self.field.is_none() {
            *self = Builder::default();
            return Ok(());
        }

        let source = self
            .source
            .take()
            .ok_or_else(|| Error::parse_error("entry closed without a msgid"))?;

        if source.is_empty() && self.context.is_empty() {
            // The header entry: msgstr holds "Key: value\n" lines.
            let block = self.translations.first().cloned().unwrap_or_default();
            for line in block.lines() {
                if let Some((key, value)) = line.split_once(':') {
                    headers.insert(key.trim().to_string(), value.trim().to_string());
                }
            }
        } else {
            let comment = if self.comments.is_empty() {
                None
            } else {
                Some(self.comments.join("\n"))
            };
            entries.push(Entry {
                context: std::mem::take(&mut self.context),
                source,
                plural_source: self.plural_source.take(),
                translations: std::mem::take(&mut self.translations),
                comment,
            });
        }

        *self = Builder::default();
        Ok(())
    }
}

impl Parser for Format {
    fn from_reader<R: std::io::BufRead>(reader: R) -> Result<Self, Error> {
        let mut headers = HashMap::new();
        let mut entries = Vec::new();
        let mut builder = Builder::default();

        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            let at_line = |e: Error| match e {
                Error::Parse(message) => Error::Parse(format!("{} at line {}", message, number + 1)),
                other => other,
            };

            if trimmed.is_empty() {
                builder.flush(&mut headers, &mut entries).map_err(at_line)?;
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix('#') {
                if rest.starts_with('~') {
                    continue; // obsolete entry line
                }
                builder
                    .comments
                    .push(rest.trim_start_matches(['.', ':', ',']).trim().to_string());
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix("msgctxt ") {
                // A new msgctxt after translations means the previous entry
                // was not closed by a blank line.
                if matches!(builder.field, Some(Field::Msgstr(_))) {
                    builder.flush(&mut headers, &mut entries).map_err(at_line)?;
                }
                builder.field = Some(Field::Msgctxt);
                builder.append(&unquote(rest)).map_err(at_line)?;
            } else if let Some(rest) = trimmed.strip_prefix("msgid_plural ") {
                builder.field = Some(Field::MsgidPlural);
                builder.append(&unquote(rest)).map_err(at_line)?;
            } else if let Some(rest) = trimmed.strip_prefix("msgid ") {
                if matches!(builder.field, Some(Field::Msgstr(_))) {
                    builder.flush(&mut headers, &mut entries).map_err(at_line)?;
                }
                builder.field = Some(Field::Msgid);
                builder.append(&unquote(rest)).map_err(at_line)?;
            } else if let Some(rest) = trimmed.strip_prefix("msgstr") {
                if builder.source.is_none() {
                    return Err(at_line(Error::parse_error("msgstr without msgid")));
                }
                let (index, rest) = parse_msgstr_index(rest).map_err(at_line)?;
                builder.field = Some(Field::Msgstr(index));
                builder.append(&unquote(rest)).map_err(at_line)?;
            } else if trimmed.starts_with('"') {
                builder.append(&unquote(trimmed)).map_err(at_line)?;
            } else {
                return Err(at_line(Error::parse_error(format!(
                    "unrecognized directive `{}`",
                    trimmed
                ))));
            }
        }

        builder.flush(&mut headers, &mut entries)?;

        Ok(Format { headers, entries })
    }

    fn to_writer<W: std::io::Write>(&self, mut writer: W) -> Result<(), Error> {
        let mut content = String::new();

        content.push_str("msgid \"\"\nmsgstr \"\"\n");
        // Sorted for deterministic output.
        let headers: BTreeMap<_, _> = self.headers.iter().collect();
        for (key, value) in headers {
            content.push_str(&format!("\"{}: {}\\n\"\n", escape(key), escape(value)));
        }

        for entry in &self.entries {
            content.push('\n');
            if let Some(comment) = &entry.comment {
                for line in comment.lines() {
                    content.push_str(&format!("# {}\n", line));
                }
            }
            if !entry.context.is_empty() {
                content.push_str(&format!("msgctxt \"{}\"\n", escape(&entry.context)));
            }
            content.push_str(&format!("msgid \"{}\"\n", escape(&entry.source)));
            match &entry.plural_source {
                Some(plural) => {
                    content.push_str(&format!("msgid_plural \"{}\"\n", escape(plural)));
                    for (index, translation) in entry.translations.iter().enumerate() {
                        content.push_str(&format!(
                            "msgstr[{}] \"{}\"\n",
                            index,
                            escape(translation)
                        ));
                    }
                }
                None => {
                    let translation = entry.translations.first().map(String::as_str).unwrap_or("");
                    content.push_str(&format!("msgstr \"{}\"\n", escape(translation)));
                }
            }
        }

        writer.write_all(content.as_bytes()).map_err(Error::Io)
    }
}

impl From<Format> for Catalog {
    fn from(value: Format) -> Self {
        let locale = value
            .headers
            .get(LANGUAGE_HEADER)
            .cloned()
            .unwrap_or_default();
        Catalog {
            metadata: Metadata {
                locale,
                headers: value.headers,
            },
            entries: value.entries,
        }
    }
}

/// Splits the `[N]` index off a `msgstr` directive; plain `msgstr` is index 0.
fn parse_msgstr_index(rest: &str) -> Result<(usize, &str), Error> {
    if let Some(rest) = rest.strip_prefix('[') {
        let (digits, tail) = rest
            .split_once(']')
            .ok_or_else(|| Error::parse_error("unterminated msgstr index"))?;
        let index = digits
            .parse::<usize>()
            .map_err(|_| Error::parse_error(format!("invalid msgstr index `{}`", digits)))?;
        Ok((index, tail.trim_start()))
    } else {
        Ok((0, rest.trim_start()))
    }
}

/// Removes surrounding quotes and unescapes basic sequences in a single
/// pass, so chained replacements cannot double-unescape `\\n`.
fn unquote(s: &str) -> String {
    let s = s.trim();
    let s = s.strip_prefix('"').unwrap_or(s);
    let s = s.strip_suffix('"').unwrap_or(s);

    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some('"') => result.push('"'),
                Some('\\') => result.push('\\'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }
    result
}

fn escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            '\t' => result.push_str("\\t"),
            '\r' => result.push_str("\\r"),
            other => result.push(other),
        }
    }
    result
}
