//! ViewDefinition parsing, types, and structural validation.
//!
//! This module defines the typed representation of a FHIR ViewDefinition
//! resource (the SQL-on-FHIR v2 projection document) and validates it before
//! the rest of the pipeline ever touches it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// A ViewDefinition resource: a declarative tabular projection over one FHIR
/// resource type. Immutable once parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewDefinition {
    /// Must equal `"ViewDefinition"` when present.
    pub resource_type: Option<String>,

    pub url: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,

    /// `draft | active | retired | unknown`, defaults to `active`.
    #[serde(default = "default_status")]
    pub status: String,

    /// The FHIR resource type this view projects (e.g. `"Patient"`).
    pub resource: String,

    #[serde(default)]
    pub constant: Vec<Constant>,

    #[serde(default, rename = "where")]
    pub where_: Vec<WhereClause>,

    /// Non-empty; validated by [`ViewDefinition::validate`].
    pub select: Vec<Select>,
}

fn default_status() -> String {
    "active".to_string()
}

/// A node in the select tree: columns, nested selects, a `unionAll`
/// alternative set, and/or an iteration directive.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Select {
    pub column: Option<Vec<Column>>,

    #[serde(default)]
    pub select: Vec<Select>,

    pub union_all: Option<Vec<Select>>,

    pub for_each: Option<String>,
    pub for_each_or_null: Option<String>,

    #[serde(default)]
    pub repeat: Vec<String>,

    #[serde(default)]
    pub where_: Vec<WhereClause>,

    pub description: Option<String>,
}

/// A single output column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// Must match `[A-Za-z_][A-Za-z0-9_]*`.
    pub name: String,

    /// FHIRPath expression extracting this column's value.
    pub path: String,

    pub collection: Option<bool>,

    #[serde(rename = "type")]
    pub col_type: Option<String>,

    pub description: Option<String>,

    #[serde(default)]
    pub tag: Vec<Tag>,
}

/// A `{name, value}` tag on a column; only `mssql/type` is interpreted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

/// A row filter: a FHIRPath predicate that must hold for a row to survive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhereClause {
    pub path: String,
}

/// A scalar constant bound to a name, referenced in FHIRPath as `%name`.
/// Exactly one `value[x]` field must be populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constant {
    pub name: String,
    pub value_string: Option<String>,
    pub value_integer: Option<i64>,
    pub value_boolean: Option<bool>,
    pub value_decimal: Option<f64>,
    pub value_date: Option<String>,
    pub value_date_time: Option<String>,
}

impl Constant {
    /// Render this constant's resolved scalar as literal T-SQL text.
    pub fn sql_literal(&self) -> Option<String> {
        if let Some(s) = &self.value_string {
            Some(format!("'{}'", s.replace('\'', "''")))
        } else if let Some(i) = self.value_integer {
            Some(i.to_string())
        } else if let Some(b) = self.value_boolean {
            Some(if *b { "1".to_string() } else { "0".to_string() })
        } else if let Some(d) = self.value_decimal {
            Some(d.to_string())
        } else if let Some(d) = &self.value_date {
            Some(format!("'{}'", d.replace('\'', "''")))
        } else if let Some(d) = &self.value_date_time {
            Some(format!("'{}'", d.replace('\'', "''")))
        } else {
            None
        }
    }

    fn populated_count(&self) -> usize {
        [
            self.value_string.is_some(),
            self.value_integer.is_some(),
            self.value_boolean.is_some(),
            self.value_decimal.is_some(),
            self.value_date.is_some(),
            self.value_date_time.is_some(),
        ]
        .into_iter()
        .filter(|b| *b)
        .count()
    }
}

static COLUMN_NAME_FIRST: fn(char) -> bool = |c| c.is_ascii_alphabetic() || c == '_';
static COLUMN_NAME_REST: fn(char) -> bool = |c| c.is_ascii_alphanumeric() || c == '_';

fn is_valid_column_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if COLUMN_NAME_FIRST(c) => {}
        _ => return false,
    }
    chars.all(COLUMN_NAME_REST)
}

impl ViewDefinition {
    /// Parse a ViewDefinition from a JSON value, then validate it.
    pub fn from_json(value: &Value) -> Result<Self, Error> {
        let view: ViewDefinition = serde_json::from_value(value.clone())?;
        view.validate()?;
        Ok(view)
    }

    /// Parse a ViewDefinition from a JSON string, then validate it.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let value: Value = serde_json::from_str(s)?;
        Self::from_json(&value)
    }

    /// Run every structural/semantic check from the specification.
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(rt) = &self.resource_type {
            if rt != "ViewDefinition" {
                return Err(Error::Validation(format!(
                    "resourceType must be \"ViewDefinition\", got \"{rt}\""
                )));
            }
        }

        if self.resource.trim().is_empty() {
            return Err(Error::Validation("resource is required".to_string()));
        }

        if self.select.is_empty() {
            return Err(Error::Validation(
                "select must be a non-empty array".to_string(),
            ));
        }

        for constant in &self.constant {
            match constant.populated_count() {
                1 => {}
                0 => {
                    return Err(Error::Validation(format!(
                        "constant \"{}\" has no value[x]",
                        constant.name
                    )));
                }
                _ => {
                    return Err(Error::Validation(format!(
                        "constant \"{}\" has more than one value[x]",
                        constant.name
                    )));
                }
            }
        }

        for select in &self.select {
            validate_select(select, false)?;
        }

        Ok(())
    }

    /// Every column name produced by this ViewDefinition, in emission order.
    pub fn column_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        collect_column_names(&self.select, &mut names);
        names
    }
}

fn collect_column_names(selects: &[Select], names: &mut Vec<String>) {
    for select in selects {
        if let Some(columns) = &select.column {
            names.extend(columns.iter().map(|c| c.name.clone()));
        }
        collect_column_names(&select.select, names);
        if let Some(union_selects) = &select.union_all {
            // All branches must expose the same column list; the first
            // branch stands in for the union's contribution to the order.
            if let Some(first) = union_selects.first() {
                collect_column_names(std::slice::from_ref(first), names);
            }
        }
    }
}

fn validate_select(select: &Select, in_iteration: bool) -> Result<(), Error> {
    if select.column.is_none() && select.select.is_empty() && select.union_all.is_none() {
        return Err(Error::Validation(
            "every select must carry at least one of column, select, or unionAll".to_string(),
        ));
    }

    if select.for_each.is_some() && select.for_each_or_null.is_some() {
        return Err(Error::Validation(
            "forEach and forEachOrNull are mutually exclusive".to_string(),
        ));
    }

    let iterates = select.for_each.is_some() || select.for_each_or_null.is_some();
    let child_in_iteration = in_iteration || iterates;

    if let Some(columns) = &select.column {
        for column in columns {
            if !is_valid_column_name(&column.name) {
                return Err(Error::Validation(format!(
                    "invalid column name \"{}\": must match [A-Za-z_][A-Za-z0-9_]*",
                    column.name
                )));
            }
            if column.collection == Some(false)
                && !child_in_iteration
                && is_known_multivalued_path(&column.path)
            {
                return Err(Error::Validation(format!(
                    "column \"{}\" declares collection=false but path \"{}\" yields multiple values outside an iteration context",
                    column.name, column.path
                )));
            }
            for tag in &column.tag {
                if tag.name == "mssql/type" {
                    crate::column::validate_mssql_type_tag(&tag.value)?;
                }
            }
        }
    }

    for nested in &select.select {
        validate_select(nested, child_in_iteration)?;
    }

    if let Some(union_selects) = &select.union_all {
        if union_selects.is_empty() {
            return Err(Error::Validation(
                "unionAll must contain at least one branch".to_string(),
            ));
        }
        let mut reference: Option<Vec<String>> = None;
        for branch in union_selects {
            validate_select(branch, child_in_iteration)?;
            let mut names = Vec::new();
            collect_column_names(std::slice::from_ref(branch), &mut names);
            match &reference {
                None => reference = Some(names),
                Some(expected) if expected != &names => {
                    return Err(Error::Validation(format!(
                        "unionAll branches must expose the same ordered column list; expected {expected:?}, got {names:?}"
                    )));
                }
                Some(_) => {}
            }
        }
    }

    Ok(())
}

/// Known FHIR fields whose path, read without entering an iteration
/// context, would yield more than one value. Used only to reject
/// `collection=false` columns that forget to iterate; this is not an
/// exhaustive FHIR schema, just the shallow knowledge the shared known-array
/// field list (see [`crate::fhirpath::KNOWN_ARRAY_FIELDS`]) already encodes.
fn is_known_multivalued_path(path: &str) -> bool {
    let first_segment = path.split(['.', '[']).next().unwrap_or(path);
    crate::fhirpath::KNOWN_ARRAY_FIELDS.contains(&first_segment)
}

/// Fields considered "known FHIR arrays" by the forEach path distributor.
/// A superset of [`crate::fhirpath::KNOWN_ARRAY_FIELDS`] (adds
/// `communication`/`link`), matching the forEach-specific list in the
/// specification. Exposed as a function rather than inlined so the set can
/// be extended without touching call sites.
pub fn known_foreach_array_fields() -> &'static HashSet<&'static str> {
    use std::sync::OnceLock;
    static FIELDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    FIELDS.get_or_init(|| {
        [
            "name",
            "telecom",
            "address",
            "contact",
            "identifier",
            "communication",
            "link",
        ]
        .into_iter()
        .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_minimal_view_definition() {
        let json = json!({
            "resourceType": "ViewDefinition",
            "resource": "Patient",
            "select": [{
                "column": [
                    {"name": "id", "path": "id"},
                    {"name": "gender", "path": "gender"}
                ]
            }]
        });
        let view = ViewDefinition::from_json(&json).unwrap();
        assert_eq!(view.status, "active");
        assert_eq!(view.column_names(), vec!["id", "gender"]);
    }

    #[test]
    fn rejects_wrong_resource_type() {
        let json = json!({
            "resourceType": "Patient",
            "resource": "Patient",
            "select": [{"column": [{"name": "id", "path": "id"}]}]
        });
        assert!(matches!(
            ViewDefinition::from_json(&json),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn rejects_empty_select() {
        let json = json!({"resource": "Patient", "select": []});
        assert!(ViewDefinition::from_json(&json).is_err());
    }

    #[test]
    fn rejects_select_with_nothing_to_project() {
        let json = json!({"resource": "Patient", "select": [{}]});
        assert!(ViewDefinition::from_json(&json).is_err());
    }

    #[test]
    fn rejects_mutually_exclusive_foreach() {
        let json = json!({
            "resource": "Patient",
            "select": [{
                "forEach": "name",
                "forEachOrNull": "name",
                "column": [{"name": "family", "path": "family"}]
            }]
        });
        assert!(ViewDefinition::from_json(&json).is_err());
    }

    #[test]
    fn rejects_bad_column_name() {
        let json = json!({
            "resource": "Patient",
            "select": [{"column": [{"name": "9bad", "path": "id"}]}]
        });
        assert!(ViewDefinition::from_json(&json).is_err());
    }

    #[test]
    fn rejects_mismatched_union_branches() {
        let json = json!({
            "resource": "Patient",
            "select": [{
                "unionAll": [
                    {"column": [{"name": "a", "path": "a"}]},
                    {"column": [{"name": "b", "path": "b"}]}
                ]
            }]
        });
        assert!(ViewDefinition::from_json(&json).is_err());
    }

    #[test]
    fn rejects_ambiguous_constant() {
        let json = json!({
            "resource": "Patient",
            "constant": [{"name": "sys", "valueString": "a", "valueInteger": 1}],
            "select": [{"column": [{"name": "id", "path": "id"}]}]
        });
        assert!(ViewDefinition::from_json(&json).is_err());
    }

    #[test]
    fn accepts_repeat_without_foreach() {
        let json = json!({
            "resource": "Patient",
            "select": [{
                "repeat": ["link.other"],
                "column": [{"name": "ref", "path": "reference"}]
            }]
        });
        assert!(ViewDefinition::from_json(&json).is_ok());
    }

    #[test]
    fn accepts_matching_union_branches() {
        let json = json!({
            "resource": "Patient",
            "select": [{
                "unionAll": [
                    {"column": [{"name": "a", "path": "x"}]},
                    {"column": [{"name": "a", "path": "y"}]}
                ]
            }]
        });
        assert!(ViewDefinition::from_json(&json).is_ok());
    }
}
