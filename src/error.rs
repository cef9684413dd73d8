//! Error taxonomy for ViewDefinition compilation.
//!
//! Every failure mode named in the SQL-on-FHIR-to-T-SQL compilation pipeline
//! surfaces as one of these variants. All of them are fatal to the current
//! compile: the driver never returns partial SQL.

use thiserror::Error;

/// Errors that can occur while compiling a ViewDefinition to T-SQL.
#[derive(Debug, Error)]
pub enum Error {
    /// The FHIRPath lexer or parser rejected an expression. No recovery is
    /// attempted; the offending source text is carried verbatim.
    #[error("syntax error in FHIRPath expression `{expr}`: {message}")]
    Syntax { expr: String, message: String },

    /// A FHIRPath invocation named a function outside the supported subset.
    #[error("unsupported FHIRPath function `{name}` in `{expr}`")]
    UnsupportedFunction { name: String, expr: String },

    /// Lowering a FHIRPath expression to SQL failed for a reason other than
    /// a syntax or unsupported-function error.
    #[error("failed to transpile `{path}`: {cause}")]
    Transpile { path: String, cause: String },

    /// A structural or semantic problem with the ViewDefinition itself.
    #[error("invalid ViewDefinition: {0}")]
    Validation(String),

    /// An `mssql/type` tag override failed the identifier-safe, size-bounded
    /// pattern required to use it verbatim in emitted SQL.
    #[error("invalid mssql/type tag value `{0}`")]
    InvalidTagValue(String),

    /// A programming invariant was violated. Never expected to fire on
    /// well-formed input; if it does, it names a bug in this crate.
    #[error("internal error: {0}")]
    Internal(String),

    /// The ViewDefinition JSON could not be deserialized at all.
    #[error("malformed ViewDefinition JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using the crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
