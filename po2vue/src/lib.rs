#![forbid(unsafe_code)]
//! Convert gettext `.po` catalogs into JSON/JS artifacts for a
//! VueI18n-style client runtime.
//!
//! One conversion run parses every catalog matched by the input
//! patterns, optionally drops keys no whitelist source file references,
//! and emits any of three independent artifacts: a combined messages
//! JSON file, per-locale JSON files, and a generated plural-rules JS
//! module.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use po2vue::{Options, convert};
//!
//! let options = Options::new(["locales/*.po"])
//!     .with_messages_dir("dist/messages")
//!     .with_plural_rules("dist/choices.js");
//! let output = convert(&options)?;
//! println!("converted {} locales", output.len());
//! # Ok::<(), po2vue::Error>(())
//! ```
//!
//! # Behavior notes
//!
//! - Plural entries are joined into one ` | `-delimited string; the
//!   generated plural-rules module maps each count to the variant index.
//! - Dotted keys expand into nested maps unless flat mode is selected;
//!   colliding paths resolve last-write-wins.
//! - Whitelist filtering is a textual literal scan, documented as a
//!   best-effort heuristic in [`whitelist`].

pub mod converter;
pub mod error;
pub mod formats;
pub mod messages;
pub mod plural;
pub mod traits;
pub mod types;
pub mod whitelist;

// Re-export most used types for easy consumption
pub use crate::{
    converter::{LocaleOutput, Options, convert},
    error::Error,
    formats::GettextFormat,
    messages::{COUNT_PLACEHOLDER, MessageNode, PLURAL_DELIMITER},
    plural::{ModuleSyntax, PluralRule},
    types::{Catalog, Entry, Metadata},
};
