//! All error types for the po2vue crate.
//!
//! These are returned from all fallible operations (parsing, conversion,
//! filtering, emission).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("missing input catalog specification")]
    MissingInput,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("catalog parse error: {0}")]
    Parse(String),

    #[error("cannot parse plural definition `{0}`")]
    PluralHeader(String),

    #[error("catalog for `{locale}` declares no Plural-Forms header")]
    MissingPluralHeader { locale: String },

    #[error("invalid plural expression: {0}")]
    PluralExpr(String),

    #[error(
        "plural translation for `{key}` contains the delimiter `|` and cannot be joined safely"
    )]
    DelimiterInTranslation { key: String },
}

impl Error {
    /// Creates a new catalog parse error.
    pub fn parse_error(message: impl Into<String>) -> Self {
        Error::Parse(message.into())
    }

    /// Creates a new plural expression error.
    pub fn plural_expr_error(message: impl Into<String>) -> Self {
        Error::PluralExpr(message.into())
    }
}
