//! FHIRPath front-end: lexer, parser, AST, a small SQL IR, and the lowering
//! visitor that folds a FHIRPath expression into a T-SQL fragment.

pub mod ast;
pub mod ir;
pub mod lexer;
pub mod lower;
pub mod parser;
pub mod token;

pub use ast::Expr;
pub use ir::SqlExpr;
pub use lower::{lower, TranspilerContext};
pub use parser::parse;

/// FHIR fields whose value is an array; reading one without an explicit
/// index or iteration implicitly means "the first element" in the member
/// invocation rule (`spec.md` §4.2). Exposed as a slice behind a named
/// constant, per the "expose this as a configurable predicate" design note,
/// rather than hard-coded inline at each call site.
pub const KNOWN_ARRAY_FIELDS: &[&str] = &[
    "name",
    "telecom",
    "address",
    "identifier",
    "extension",
    "contact",
];

pub fn is_known_array_field(name: &str) -> bool {
    KNOWN_ARRAY_FIELDS.contains(&name)
}
