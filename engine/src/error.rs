//! FILENAME: engine/src/error.rs

use thiserror::Error;

/// Errors raised while resolving or laying out a table.
///
/// All variants abort the current table immediately; none are retried.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed table, index mapping or additional formatting directive.
    #[error("validation error: {0}")]
    Validation(String),

    /// A reference marker's key has no entry in the reference order or
    /// no definition in the table's annotations.
    #[error("reference error: {0}")]
    Reference(String),

    /// A theme configuration names an unrecognised element or style attribute.
    #[error("theme configuration error: {0}")]
    Config(String),

    /// A missing-value sentinel is present but no marker text is configured.
    #[error("missing-value marker error: {0}")]
    MissingMarker(String),

    /// The sheet backend rejected a write operation.
    #[error("backend write error: {0}")]
    Backend(String),
}
