//! Column type inference for SQL on FHIR views.
//!
//! Maps FHIR primitive type names to fixed MS SQL Server types per the
//! canonical matrix in the specification, and validates `mssql/type` tag
//! overrides.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Information about a column in the emitted result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub sql_type: String,
    pub nullable: bool,
    pub description: Option<String>,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            nullable: true,
            description: None,
        }
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Resolve a FHIR primitive type name to its canonical MS SQL Server type.
/// Unknown or absent types fall back to `NVARCHAR(MAX)`.
pub fn sql_type_for_fhir_type(type_name: Option<&str>) -> &'static str {
    match type_name.map(|t| t.to_ascii_lowercase()).as_deref() {
        Some("id") => "VARCHAR(64)",
        Some("boolean") => "BIT",
        Some("integer") | Some("positiveint") | Some("unsignedint") => "INT",
        Some("integer64") => "BIGINT",
        Some("uuid") => "VARCHAR(100)",
        Some("oid") => "VARCHAR(255)",
        Some("decimal") => "VARCHAR(MAX)",
        Some("date") => "VARCHAR(10)",
        Some("datetime") | Some("instant") => "VARCHAR(50)",
        Some("time") => "VARCHAR(20)",
        Some("string") | Some("markdown") | Some("code") | Some("uri") | Some("url")
        | Some("canonical") => "NVARCHAR(MAX)",
        Some("base64binary") => "VARBINARY(MAX)",
        _ => "NVARCHAR(MAX)",
    }
}

/// Pattern an `mssql/type` tag override must satisfy: letters, digits,
/// underscore, parentheses, commas only, at most 64 characters.
fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_(),]{1,64}$").unwrap())
}

/// Known SQL Server type family names an `mssql/type` override may name,
/// case-insensitively, ignoring any `(n)`/`(p,s)` size suffix.
fn known_type_families() -> &'static [&'static str] {
    &[
        "varchar", "nvarchar", "char", "nchar", "bit", "int", "bigint", "smallint", "tinyint",
        "decimal", "numeric", "float", "real", "date", "datetime", "datetime2", "time",
        "varbinary", "binary", "uniqueidentifier", "money", "smallmoney",
    ]
}

/// Validate an `mssql/type` tag value against the identifier-safe,
/// size-bounded, known-family pattern. Returns [`Error::InvalidTagValue`] on
/// mismatch.
pub fn validate_mssql_type_tag(value: &str) -> Result<(), Error> {
    if !tag_pattern().is_match(value) {
        return Err(Error::InvalidTagValue(value.to_string()));
    }
    let family = value
        .split('(')
        .next()
        .unwrap_or(value)
        .trim()
        .to_ascii_lowercase();
    if !known_type_families().contains(&family.as_str()) {
        return Err(Error::InvalidTagValue(value.to_string()));
    }
    Ok(())
}

/// Resolve the SQL type for a column, honoring an `mssql/type` tag override
/// if present over the FHIR-type-derived default.
pub fn resolve_sql_type(
    fhir_type: Option<&str>,
    tags: &[crate::view_definition::Tag],
) -> Result<String, Error> {
    if let Some(tag) = tags.iter().find(|t| t.name == "mssql/type") {
        validate_mssql_type_tag(&tag.value)?;
        Ok(tag.value.clone())
    } else {
        Ok(sql_type_for_fhir_type(fhir_type).to_string())
    }
}
