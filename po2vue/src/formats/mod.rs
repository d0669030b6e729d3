//! Supported catalog file formats.
//!
//! po2vue consumes gettext `.po` catalogs only; the module keeps the
//! format behind the [`crate::traits::Parser`] seam so the converter
//! never touches raw catalog text.

pub mod gettext;

// Reexporting the formats for easier access
pub use gettext::Format as GettextFormat;
