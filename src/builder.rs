//! Select/Where/Column Builders and the Driver.
//!
//! Turns a [`ViewDefinition`] into T-SQL text: one `SELECT` per plan
//! variant, joined by `UNION ALL`, wrapped (for `generate_create_view`/
//! `generate_create_table`) in a fixed prefix/suffix.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::column::{self, ColumnInfo};
use crate::combination::{self, PlanVariant, ResolvedSelect};
use crate::error::Error;
use crate::fhirpath::ir::SqlExpr;
use crate::fhirpath::{lower, TranspilerContext};
use crate::foreach::{self, SelectPlan};
use crate::repeat;
use crate::view_definition::ViewDefinition;

const RESOURCE_ALIAS: &str = "r";

/// Scalar FHIR fields whose `collection=false`/unspecified extraction is
/// still a plain boolean text comparison rather than a JSON path read —
/// kept in sync with [`crate::fhirpath::lower`]'s known boolean fields.
const BOOLEAN_SCALAR_FIELDS: &[&str] = &["active", "deceased", "multipleBirth"];

/// Compile-time options accepted by the driver.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub schema: String,
    pub table: String,
    /// When set, the emitted WHERE binds `test_id = @testId` to isolate
    /// rows belonging to a single test run.
    pub test_id: Option<String>,
    /// Cap on `repeat[]` recursion depth; bound as `@maxRecursion` in every
    /// recursive CTE and passed to `OPTION (MAXRECURSION n)` as a literal.
    pub max_recursion: u32,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            schema: "dbo".to_string(),
            table: "fhir_resources".to_string(),
            test_id: None,
            max_recursion: 100,
        }
    }
}

impl CompileOptions {
    fn table_ref(&self) -> String {
        format!("[{}].[{}]", self.schema, self.table)
    }
}

/// Parameters bound into the emitted SQL text, returned alongside it so a
/// caller can bind them on the `Command`/statement it executes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Parameters {
    pub resource_type: String,
    pub test_id: Option<String>,
    pub max_recursion: Option<i64>,
}

/// The compiled output: SQL text, the ordered column list, and the
/// parameters the SQL text references.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedQuery {
    pub sql: String,
    pub columns: Vec<ColumnInfo>,
    pub parameters: Parameters,
}

/// Compile `view` into a plain `SELECT` — the `UNION ALL` of every plan
/// variant's statement.
pub fn generate_query(view: &ViewDefinition, options: &CompileOptions) -> Result<GeneratedQuery, Error> {
    let variants = combination::expand_view(view);
    tracing::debug!(variant_count = variants.len(), resource = %view.resource, "compiling view definition");

    let root_ctx = build_root_context(view)?;
    let columns = column_descriptions(view)?;

    let mut statements = Vec::with_capacity(variants.len());
    let mut all_ctes = Vec::new();
    for (variant_idx, variant) in variants.iter().enumerate() {
        let (sql, ctes) = build_variant_statement(view, variant, variant_idx, options, &root_ctx)?;
        statements.push(sql);
        all_ctes.extend(ctes);
    }

    let mut sql = statements.join(" UNION ALL ");
    if !all_ctes.is_empty() {
        let cte_sql = all_ctes
            .iter()
            .map(|c| format!("{} {}", c.name, c.body))
            .collect::<Vec<_>>()
            .join(", ");
        sql = format!("WITH {cte_sql} {sql}");
        sql.push_str(&format!(" OPTION (MAXRECURSION {})", options.max_recursion));
    }

    let parameters = Parameters {
        resource_type: view.resource.clone(),
        test_id: options.test_id.clone(),
        max_recursion: if all_ctes.is_empty() { None } else { Some(options.max_recursion as i64) },
    };

    tracing::debug!(sql_len = sql.len(), "generated query");
    Ok(GeneratedQuery { sql, columns, parameters })
}

/// Compile `view` wrapped in `CREATE VIEW <view_name> AS <query>`.
pub fn generate_create_view(
    view: &ViewDefinition,
    options: &CompileOptions,
    view_name: &str,
) -> Result<GeneratedQuery, Error> {
    let mut generated = generate_query(view, options)?;
    generated.sql = format!("CREATE VIEW {view_name} AS {}", generated.sql);
    Ok(generated)
}

/// Compile `view` wrapped in `SELECT ... INTO <table_name> FROM (<query>) AS src`.
pub fn generate_create_table(
    view: &ViewDefinition,
    options: &CompileOptions,
    table_name: &str,
) -> Result<GeneratedQuery, Error> {
    let generated = generate_query(view, options)?;
    let column_list = generated
        .columns
        .iter()
        .map(|c| format!("[{}]", c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {column_list} INTO {table_name} FROM ({}) AS src",
        generated.sql
    );
    Ok(GeneratedQuery { sql, ..generated })
}

fn build_root_context(view: &ViewDefinition) -> Result<TranspilerContext, Error> {
    let mut ctx = TranspilerContext::new(RESOURCE_ALIAS);
    for constant in &view.constant {
        let literal = constant.sql_literal().ok_or_else(|| {
            Error::Internal(format!("constant \"{}\" has no resolvable literal", constant.name))
        })?;
        ctx = ctx.with_constant(constant.name.clone(), literal);
    }
    Ok(ctx)
}

fn build_variant_statement(
    view: &ViewDefinition,
    variant: &PlanVariant,
    variant_idx: usize,
    options: &CompileOptions,
    root_ctx: &TranspilerContext,
) -> Result<(String, Vec<repeat::RepeatCte>), Error> {
    let repeat_prefix = format!("v{variant_idx}_");
    let plan = foreach::build_variant_plan(&variant.selects, RESOURCE_ALIAS, root_ctx, &repeat_prefix)?;

    let mut repeat_ctes = Vec::new();
    collect_repeat_ctes(&plan.plans, options, &mut repeat_ctes)?;

    let select_list = render_select_list(&plan.plans)?;
    let table_ref = options.table_ref();

    let mut from_parts = vec![format!("FROM {table_ref} AS {RESOURCE_ALIAS}")];
    from_parts.extend(plan.applies.iter().cloned());
    for cte in &repeat_ctes {
        from_parts.push(format!(
            "INNER JOIN {name} ON {name}.resource_id = {RESOURCE_ALIAS}.id",
            name = cte.name
        ));
    }

    let where_sql = build_where_clause(view, variant, root_ctx, &plan.plans, options)?;

    let sql = format!("SELECT {select_list} {from} WHERE {where_sql}", from = from_parts.join(" "));
    Ok((sql, repeat_ctes))
}

fn collect_repeat_ctes(
    plans: &[SelectPlan],
    options: &CompileOptions,
    out: &mut Vec<repeat::RepeatCte>,
) -> Result<(), Error> {
    for plan in plans {
        if let Some(alias) = &plan.repeat_alias {
            let cte = repeat::build_repeat_cte(plan.select, alias.clone(), &options.table_ref())?;
            out.push(cte);
        }
        collect_repeat_ctes(&plan.nested, options, out)?;
    }
    Ok(())
}

/// Two-pass column collection at the top level of a variant (non-iterating
/// selects first, then iterating ones); fully declared order within each
/// select's own subtree.
fn render_select_list(plans: &[SelectPlan]) -> Result<String, Error> {
    let mut columns = Vec::new();
    for plan in plans.iter().filter(|p| !p.select.iterates()) {
        collect_columns(plan, &mut columns)?;
    }
    for plan in plans.iter().filter(|p| p.select.iterates()) {
        collect_columns(plan, &mut columns)?;
    }
    if columns.is_empty() {
        return Err(Error::Internal("variant produced no columns".to_string()));
    }
    Ok(columns.join(", "))
}

fn collect_columns(plan: &SelectPlan, out: &mut Vec<String>) -> Result<(), Error> {
    for column in &plan.select.column {
        out.push(render_column(column, &plan.ctx)?);
    }
    for nested in &plan.nested {
        collect_columns(nested, out)?;
    }
    Ok(())
}

fn render_column(column: &crate::view_definition::Column, ctx: &TranspilerContext) -> Result<String, Error> {
    let expr = match column.collection {
        Some(true) => render_collection_expr(&column.path, ctx),
        _ => {
            let lowered = lower(&column.path, ctx)?;
            lowered.render()
        }
    };

    let sql_type = column::resolve_sql_type(column.col_type.as_deref(), &column.tag)?;
    // The bare `id` path already resolves to the base table's own `id`
    // column, already typed per the base table contract; casting it would
    // just repeat what the table definition already guarantees.
    let wrapped = if column.path.trim() == "id" {
        expr
    } else {
        apply_type_cast(&expr, &sql_type, &column.path)
    };
    Ok(format!("{wrapped} AS [{}]", column.name))
}

/// `collection=true` rendering: the `name.family`/`name.given` flattening
/// special case, falling back to a plain `JSON_QUERY` over the resource row.
fn render_collection_expr(path: &str, ctx: &TranspilerContext) -> String {
    let root = ctx
        .iteration_context
        .clone()
        .unwrap_or_else(|| SqlExpr::raw(format!("{}.json", ctx.resource_alias)))
        .render();

    match path {
        "name.family" => format!(
            "(SELECT STRING_AGG(JSON_VALUE([value], '$.family'), ', ') FROM OPENJSON({root}, '$.name'))"
        ),
        "name.given" => format!(
            "(SELECT STRING_AGG(given.value, ', ') FROM OPENJSON({root}, '$.name') AS n \
             CROSS APPLY OPENJSON(n.value, '$.given') AS given)"
        ),
        other => format!("JSON_QUERY({root}, '$.{other}')"),
    }
}

/// `CAST` wrapping per the type-inference rules: `BIT` gets the
/// `'true'`/`'false'` text-match idiom (or a direct predicate cast);
/// anything else gets `CAST(expr AS <type>)` unless the type is the
/// untyped default `NVARCHAR(MAX)`.
fn apply_type_cast(expr: &str, sql_type: &str, path: &str) -> String {
    if sql_type == "BIT" {
        if BOOLEAN_SCALAR_FIELDS.contains(&path) {
            // The FHIRPath visitor only special-cases these fields inside a
            // comparison; a bare column read still needs the text-match cast.
            format!("(CASE WHEN {expr}='true' THEN 1 WHEN {expr}='false' THEN 0 ELSE NULL END)")
        } else if expr.trim_start().starts_with('(') && is_predicate_shaped(expr) {
            format!("(CASE WHEN {expr} THEN 1 ELSE 0 END)")
        } else {
            format!("(CASE WHEN {expr}='true' THEN 1 WHEN {expr}='false' THEN 0 ELSE NULL END)")
        }
    } else if sql_type != "NVARCHAR(MAX)" {
        format!("CAST({expr} AS {sql_type})")
    } else {
        expr.to_string()
    }
}

/// A crude but effective check for whether `expr` already reads as a SQL
/// boolean rather than a scalar value: it was rendered by a comparison,
/// `EXISTS`, or boolean connective, all of which contain one of these
/// operators at their top level.
fn is_predicate_shaped(expr: &str) -> bool {
    ["=", "!=", "<", ">", "EXISTS", "AND", "OR", "NOT"]
        .iter()
        .any(|op| expr.contains(op))
}

fn build_where_clause(
    view: &ViewDefinition,
    variant: &PlanVariant,
    root_ctx: &TranspilerContext,
    plans: &[SelectPlan],
    options: &CompileOptions,
) -> Result<String, Error> {
    let mut predicates = vec![format!("{RESOURCE_ALIAS}.resource_type = @resourceType")];
    if options.test_id.is_some() {
        predicates.push(format!("{RESOURCE_ALIAS}.test_id = @testId"));
    }

    for clause in &view.where_ {
        let lowered = lower(&clause.path, root_ctx)?;
        predicates.push(crate::fhirpath::ir::as_predicate(&lowered));
    }

    for select in &variant.selects {
        collect_select_where(select, root_ctx, &mut predicates)?;
    }
    let _ = plans;

    Ok(predicates
        .into_iter()
        .map(|p| format!("({p})"))
        .collect::<Vec<_>>()
        .join(" AND "))
}

fn collect_select_where(
    select: &ResolvedSelect,
    ctx: &TranspilerContext,
    predicates: &mut Vec<String>,
) -> Result<(), Error> {
    for clause in &select.where_ {
        let lowered = lower(&clause.path, ctx)?;
        predicates.push(crate::fhirpath::ir::as_predicate(&lowered));
    }
    for nested in &select.nested {
        collect_select_where(nested, ctx, predicates)?;
    }
    Ok(())
}

fn column_descriptions(view: &ViewDefinition) -> Result<Vec<ColumnInfo>, Error> {
    let mut out = Vec::new();
    collect_column_infos(&view.select, &mut out)?;
    Ok(out)
}

fn collect_column_infos(
    selects: &[crate::view_definition::Select],
    out: &mut Vec<ColumnInfo>,
) -> Result<(), Error> {
    for select in selects {
        if let Some(columns) = &select.column {
            for column in columns {
                let sql_type = column::resolve_sql_type(column.col_type.as_deref(), &column.tag)?;
                let mut info = ColumnInfo::new(column.name.clone(), sql_type)
                    .with_nullable(select.for_each_or_null.is_some() || column.collection == Some(true));
                if let Some(desc) = &column.description {
                    info = info.with_description(desc.clone());
                }
                out.push(info);
            }
        }
        collect_column_infos(&select.select, out)?;
        if let Some(branches) = &select.union_all {
            if let Some(first) = branches.first() {
                collect_column_infos(std::slice::from_ref(first), out)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn view(json: serde_json::Value) -> ViewDefinition {
        ViewDefinition::from_json(&json).unwrap()
    }

    #[test]
    fn s1_minimal_view_emits_single_select_with_resource_filter() {
        let v = view(json!({
            "resource": "Patient",
            "select": [{"column": [
                {"name": "id", "path": "id", "type": "id"},
                {"name": "gender", "path": "gender", "type": "code"}
            ]}]
        }));
        let generated = generate_query(&v, &CompileOptions::default()).unwrap();
        assert!(generated.sql.starts_with("SELECT r.id AS [id]"));
        assert!(generated.sql.contains("r.resource_type = @resourceType"));
        assert_eq!(generated.parameters.resource_type, "Patient");
        assert!(!generated.sql.contains("UNION ALL"));
    }

    #[test]
    fn s2_implicit_first_element_injection() {
        let v = view(json!({
            "resource": "Patient",
            "select": [{"column": [{"name": "family", "path": "name.family"}]}]
        }));
        let generated = generate_query(&v, &CompileOptions::default()).unwrap();
        assert!(generated.sql.contains("JSON_VALUE(r.json, '$.name[0].family') AS [family]"));
    }

    #[test]
    fn s3_foreach_given_emits_cross_apply_and_value_column() {
        let v = view(json!({
            "resource": "Patient",
            "select": [{
                "forEach": "name.given",
                "column": [{"name": "given", "path": "$this", "type": "string"}]
            }]
        }));
        let generated = generate_query(&v, &CompileOptions::default()).unwrap();
        assert!(generated.sql.contains("CROSS APPLY OPENJSON(r.json, '$.name.given') AS forEach_0"));
        assert!(generated.sql.contains("forEach_0.value AS [given]"));
    }

    #[test]
    fn s4_union_all_produces_two_selects_with_matching_columns() {
        let v = view(json!({
            "resource": "Patient",
            "select": [{
                "unionAll": [
                    {"column": [
                        {"name": "name", "path": "name.family"},
                        {"name": "use", "path": "name.use"}
                    ]},
                    {"column": [
                        {"name": "name", "path": "telecom.value"},
                        {"name": "use", "path": "telecom.use"}
                    ]}
                ]
            }]
        }));
        let generated = generate_query(&v, &CompileOptions::default()).unwrap();
        assert_eq!(generated.sql.matches("UNION ALL").count(), 1);
        let halves: Vec<&str> = generated.sql.split(" UNION ALL ").collect();
        assert_eq!(halves.len(), 2);
    }

    #[test]
    fn s5_boolean_scalar_field_in_view_where() {
        let v = view(json!({
            "resource": "Patient",
            "where": [{"path": "active = true"}],
            "select": [{"column": [{"name": "id", "path": "id"}]}]
        }));
        let generated = generate_query(&v, &CompileOptions::default()).unwrap();
        assert!(generated
            .sql
            .contains("(CASE WHEN JSON_VALUE(r.json, '$.active')='true' THEN 1 ELSE 0 END) = 1"));
    }

    #[test]
    fn s6_repeat_emits_cte_with_two_union_arms() {
        let v = view(json!({
            "resource": "Questionnaire",
            "select": [{
                "repeat": ["item", "answer.item"],
                "column": [{"name": "linkId", "path": "linkId"}]
            }]
        }));
        let generated = generate_query(&v, &CompileOptions::default()).unwrap();
        assert!(generated.sql.starts_with("WITH v0_repeat_0"));
        assert!(generated.sql.contains("INNER JOIN v0_repeat_0 ON v0_repeat_0.resource_id = r.id"));
        assert!(generated.sql.contains("OPTION (MAXRECURSION 100)"));
        assert_eq!(generated.parameters.max_recursion, Some(100));
    }

    #[test]
    fn generate_create_view_wraps_query_only() {
        let v = view(json!({
            "resource": "Patient",
            "select": [{"column": [{"name": "id", "path": "id"}]}]
        }));
        let options = CompileOptions::default();
        let query = generate_query(&v, &options).unwrap();
        let view_sql = generate_create_view(&v, &options, "dbo.patient_ids").unwrap();
        assert_eq!(view_sql.sql, format!("CREATE VIEW dbo.patient_ids AS {}", query.sql));
        assert_eq!(view_sql.columns.len(), query.columns.len());
    }

    #[test]
    fn generate_create_table_wraps_query_with_select_into() {
        let v = view(json!({
            "resource": "Patient",
            "select": [{"column": [{"name": "id", "path": "id"}]}]
        }));
        let options = CompileOptions::default();
        let query = generate_query(&v, &options).unwrap();
        let table_sql = generate_create_table(&v, &options, "#patient_ids").unwrap();
        assert!(table_sql.sql.starts_with("SELECT [id] INTO #patient_ids FROM ("));
        assert!(table_sql.sql.contains(&query.sql));
    }

    #[test]
    fn test_id_isolation_adds_parameter_and_predicate() {
        let v = view(json!({
            "resource": "Patient",
            "select": [{"column": [{"name": "id", "path": "id"}]}]
        }));
        let options = CompileOptions {
            test_id: Some("run-42".to_string()),
            ..CompileOptions::default()
        };
        let generated = generate_query(&v, &options).unwrap();
        assert!(generated.sql.contains("r.test_id = @testId"));
        assert_eq!(generated.parameters.test_id.as_deref(), Some("run-42"));
    }
}
