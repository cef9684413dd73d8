//! SQL-on-FHIR ViewDefinition → T-SQL compiler.
//!
//! This crate compiles declarative `ViewDefinition` documents (SQL-on-FHIR
//! v2) into T-SQL statements that run against an MS SQL Server instance
//! holding FHIR resources as JSON text in a staging table. It has three
//! tightly coupled subsystems:
//!
//! - a FHIRPath front-end ([`fhirpath`]) — lexer, parser, and a lowering
//!   visitor that folds each FHIRPath expression into a small internal SQL
//!   IR and renders it to a T-SQL fragment;
//! - a ViewDefinition planner ([`view_definition`], [`combination`],
//!   [`path_parser`], [`foreach`], [`repeat`]) — expands `unionAll` choices
//!   into plan variants and builds the iteration contexts `forEach`,
//!   `forEachOrNull`, and `repeat` require;
//! - a SQL emitter ([`column`], [`builder`]) — materialises each plan
//!   variant as a `SELECT … FROM base CROSS/OUTER APPLY OPENJSON(…) …
//!   WHERE …` statement, joining variants with `UNION ALL`.
//!
//! Compilation is pure: no I/O, no shared mutable state. A single
//! [`ViewDefinition`] may be compiled from multiple threads concurrently
//! since each call only touches its own inputs.
//!
//! # Example
//!
//! ```
//! use sof_mssql::{generate_query, CompileOptions, ViewDefinition};
//!
//! let json = serde_json::json!({
//!     "resource": "Patient",
//!     "select": [{
//!         "column": [
//!             {"name": "id", "path": "id", "type": "id"},
//!             {"name": "gender", "path": "gender", "type": "code"}
//!         ]
//!     }]
//! });
//! let view: ViewDefinition = serde_json::from_value(json).unwrap();
//! let generated = generate_query(&view, &CompileOptions::default()).unwrap();
//! assert!(generated.sql.contains("r.resource_type = @resourceType"));
//! assert_eq!(generated.parameters.resource_type, "Patient");
//! ```

pub mod builder;
pub mod column;
pub mod combination;
pub mod error;
pub mod fhirpath;
pub mod foreach;
pub mod path_parser;
pub mod repeat;
pub mod view_definition;

pub use builder::{generate_create_table, generate_create_view, generate_query, CompileOptions, GeneratedQuery, Parameters};
pub use column::ColumnInfo;
pub use combination::{expand_view, PlanVariant};
pub use error::{Error, Result};
pub use view_definition::{Column, Constant, Select, Tag, ViewDefinition, WhereClause};
