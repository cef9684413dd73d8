//! The FHIRPath lowering visitor: folds a parsed [`super::ast::Expr`] into a
//! [`super::ir::SqlExpr`] fragment of T-SQL, given the context of the
//! resource alias, any bound constants, and (inside a `forEach`/`repeat` or
//! a `where(...)` continuation) the current iteration item.

use std::collections::HashMap;

use super::ast::{BinaryOp, Expr, Literal, TypeOp, UnaryOp};
use super::ir::{self, SqlExpr};
use super::{is_known_array_field, parse};
use crate::error::Error;

/// Everything the lowering visitor needs to know about where it is: which
/// table alias holds the root resource row, what `%name` constants resolve
/// to, and - when lowering inside an iteration - what the "current item"
/// expression is.
#[derive(Debug, Clone)]
pub struct TranspilerContext {
    /// The table alias carrying `(id, resource_type, json)` for the root
    /// resource row, e.g. `"r"`.
    pub resource_alias: String,
    /// `%name` -> rendered SQL literal text, built from `ViewDefinition.constant`.
    pub constants: HashMap<String, String>,
    /// When set, bare member access resolves against this expression (the
    /// current `forEach`/`repeat` item, or a `where(...)` continuation's
    /// synthesized `$this`) instead of `<resource_alias>.json`.
    pub iteration_context: Option<SqlExpr>,
}

impl TranspilerContext {
    pub fn new(resource_alias: impl Into<String>) -> Self {
        Self {
            resource_alias: resource_alias.into(),
            constants: HashMap::new(),
            iteration_context: None,
        }
    }

    pub fn with_constant(mut self, name: impl Into<String>, literal: impl Into<String>) -> Self {
        self.constants.insert(name.into(), literal.into());
        self
    }

    /// A context identical to this one but lowering against `iteration_context`.
    pub fn with_iteration_context(&self, iteration_context: SqlExpr) -> Self {
        Self {
            resource_alias: self.resource_alias.clone(),
            constants: self.constants.clone(),
            iteration_context: Some(iteration_context),
        }
    }

    fn root(&self) -> SqlExpr {
        self.iteration_context
            .clone()
            .unwrap_or_else(|| SqlExpr::raw(format!("{}.json", self.resource_alias)))
    }
}

/// Parse and lower a FHIRPath expression string to a T-SQL fragment.
pub fn lower(expr: &str, ctx: &TranspilerContext) -> Result<SqlExpr, Error> {
    let tree = parse(expr)?;
    lower_expr(&tree, expr, ctx)
}

fn transpile_err(path: &str, cause: impl Into<String>) -> Error {
    Error::Transpile {
        path: path.to_string(),
        cause: cause.into(),
    }
}

fn lower_expr(expr: &Expr, src: &str, ctx: &TranspilerContext) -> Result<SqlExpr, Error> {
    match expr {
        Expr::Literal(lit) => Ok(SqlExpr::raw(render_literal(lit))),
        Expr::This => Ok(ctx.root()),
        Expr::Index => Ok(SqlExpr::raw("CAST([key] AS INT)")),
        Expr::Total => Ok(SqlExpr::raw("COUNT(*) OVER ()")),
        Expr::EnvVariable(name) => ctx
            .constants
            .get(name.as_str())
            .map(|literal| SqlExpr::raw(literal.clone()))
            .ok_or_else(|| transpile_err(src, format!("unbound constant %{name}"))),
        Expr::Identifier(name) => lower_identifier(name, ctx),
        Expr::DelimitedIdentifier(name) => lower_identifier(name, ctx),
        Expr::Indexer { base, index } => lower_indexer(base, index, src, ctx),
        Expr::Unary { op, expr } => {
            let inner = lower_expr(expr, src, ctx)?;
            let rendered = inner.render();
            Ok(SqlExpr::raw(match op {
                UnaryOp::Plus => rendered,
                UnaryOp::Minus => format!("(-{rendered})"),
            }))
        }
        Expr::Binary { op, lhs, rhs } => lower_binary(*op, lhs, rhs, src, ctx),
        Expr::TypeExpr {
            op,
            expr: inner,
            type_name: _,
        } => {
            let inner = lower_expr(inner, src, ctx)?;
            Ok(match op {
                // Conservative: we do not validate FHIR type conformance,
                // only that the path resolved to something.
                TypeOp::Is => SqlExpr::predicate(format!("({} IS NOT NULL)", inner.render())),
                TypeOp::As => inner,
            })
        }
        Expr::Function { name, args } => {
            lower_function(name, args, ctx.root(), false, src, ctx).map(|(expr, _)| expr)
        }
        Expr::Invocation { .. } => lower_chain(expr, src, ctx),
    }
}

fn lower_identifier(name: &str, ctx: &TranspilerContext) -> Result<SqlExpr, Error> {
    if name == "id" && ctx.iteration_context.is_none() {
        return Ok(SqlExpr::raw(format!("{}.id", ctx.resource_alias)));
    }
    let as_query = is_known_array_field(name);
    Ok(ctx.root().extend_path(name, as_query))
}

/// Walk a spine of `Invocation` nodes (stopping at the first non-`Invocation`
/// node, which becomes the root) so the "first two segments" implicit
/// array-index rule can see the whole dotted chain at once.
fn flatten_invocation<'a>(expr: &'a Expr) -> (&'a Expr, Vec<&'a Expr>) {
    let mut members = Vec::new();
    let mut current = expr;
    while let Expr::Invocation { base, member } = current {
        members.push(member.as_ref());
        current = base.as_ref();
    }
    members.reverse();
    (current, members)
}

fn lower_chain(expr: &Expr, src: &str, ctx: &TranspilerContext) -> Result<SqlExpr, Error> {
    let (root, members) = flatten_invocation(expr);

    let mut current = lower_expr(root, src, ctx)?;

    // Implicit first-element injection: a bare identifier naming a known
    // array field, immediately followed by a further field access, reads as
    // `$.field[0].next` rather than `$.field.next`. A following function
    // call (`.where(...)`, `.count()`, ...) operates over the whole array
    // instead, so it is excluded from this rule.
    if let Expr::Identifier(name) = root {
        let next_is_field = matches!(
            members.first(),
            Some(Expr::Identifier(_)) | Some(Expr::DelimitedIdentifier(_))
        );
        if next_is_field && is_known_array_field(name) {
            current = current.index_path("0");
        }
    }

    let mut idx = 0;
    while idx < members.len() {
        match members[idx] {
            Expr::Identifier(name) | Expr::DelimitedIdentifier(name) => {
                let as_query = idx + 1 < members.len() && is_known_array_field(name);
                current = current.extend_path(name, as_query);
                idx += 1;
            }
            Expr::Function { name, args } => {
                let remaining_after = idx + 1 < members.len();
                let (result, continuation_ctx) =
                    lower_function(name, args, current, remaining_after, src, ctx)?;
                if name == "where" && remaining_after {
                    let fresh_ctx = continuation_ctx
                        .ok_or_else(|| transpile_err(src, "where() produced no continuation"))?;
                    return lower_member_chain(&members[idx + 1..], src, &fresh_ctx);
                }
                current = result;
                idx += 1;
            }
            other => {
                return Err(transpile_err(
                    src,
                    format!("unsupported chain element {other:?}"),
                ))
            }
        }
    }

    Ok(current)
}

/// Continue lowering a member list against a context whose root is already
/// the desired starting point (used after a `where(...)` continuation).
fn lower_member_chain(
    members: &[&Expr],
    src: &str,
    ctx: &TranspilerContext,
) -> Result<SqlExpr, Error> {
    let mut current = ctx.root();
    let mut idx = 0;
    while idx < members.len() {
        match members[idx] {
            Expr::Identifier(name) | Expr::DelimitedIdentifier(name) => {
                let as_query = idx + 1 < members.len() && is_known_array_field(name);
                current = current.extend_path(name, as_query);
                idx += 1;
            }
            Expr::Function { name, args } => {
                let remaining_after = idx + 1 < members.len();
                let (result, continuation_ctx) =
                    lower_function(name, args, current, remaining_after, src, ctx)?;
                if name == "where" && remaining_after {
                    let fresh_ctx = continuation_ctx
                        .ok_or_else(|| transpile_err(src, "where() produced no continuation"))?;
                    return lower_member_chain(&members[idx + 1..], src, &fresh_ctx);
                }
                current = result;
                idx += 1;
            }
            other => {
                return Err(transpile_err(
                    src,
                    format!("unsupported chain element {other:?}"),
                ))
            }
        }
    }
    Ok(current)
}

fn lower_indexer(
    base: &Expr,
    index: &Expr,
    src: &str,
    ctx: &TranspilerContext,
) -> Result<SqlExpr, Error> {
    let base_expr = lower_expr(base, src, ctx)?;
    match index {
        Expr::Literal(Literal::Number(n)) => Ok(base_expr.index_path(n)),
        _ => Err(transpile_err(
            src,
            "only a literal integer index is supported",
        )),
    }
}

fn render_literal(lit: &Literal) -> String {
    match lit {
        Literal::Null => "NULL".to_string(),
        Literal::Bool(true) => "1".to_string(),
        Literal::Bool(false) => "0".to_string(),
        Literal::String(s) => format!("'{}'", s.replace('\'', "''")),
        Literal::Number(n) => n.clone(),
        Literal::LongNumber(n) => n.clone(),
        // FHIRPath date/time literals carry the `@`/`@T` sigil stripped by
        // the lexer already; render as a quoted SQL date/time string.
        Literal::Date(d) => format!("'{d}'"),
        Literal::DateTime(d) => format!("'{d}'"),
        Literal::Time(t) => format!("'{t}'"),
    }
}

fn is_bool_literal(expr: &Expr) -> bool {
    matches!(expr, Expr::Literal(Literal::Bool(_)))
}

/// Scalar boolean-valued FHIR fields compared with the `='true'`/`='false'`
/// text-match idiom rather than a `CAST(... AS BIT)`, per the specification's
/// boolean scalar field wrapping rule.
const KNOWN_BOOLEAN_FIELDS: &[&str] = &["active", "deceased", "multipleBirth"];

fn known_boolean_field(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Identifier(name) if KNOWN_BOOLEAN_FIELDS.contains(&name.as_str()) => Some(name),
        _ => None,
    }
}

fn lower_binary(
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    src: &str,
    ctx: &TranspilerContext,
) -> Result<SqlExpr, Error> {
    let l = lower_expr(lhs, src, ctx)?;
    let r = lower_expr(rhs, src, ctx)?;
    let lt = l.render();
    let rt = r.render();

    Ok(match op {
        BinaryOp::Add => SqlExpr::raw(format!("({lt} + {rt})")),
        BinaryOp::Sub => SqlExpr::raw(format!("({lt} - {rt})")),
        BinaryOp::Mul => SqlExpr::raw(format!("({lt} * {rt})")),
        BinaryOp::Div | BinaryOp::IntDiv => SqlExpr::raw(format!("({lt} / {rt})")),
        BinaryOp::Mod => SqlExpr::raw(format!("({lt} % {rt})")),
        BinaryOp::Concat => SqlExpr::raw(format!("CONCAT({lt}, {rt})")),
        BinaryOp::Union => SqlExpr::raw(format!(
            "(SELECT [value] FROM (SELECT [value] FROM OPENJSON({lt}) UNION SELECT [value] FROM OPENJSON({rt})) AS u)"
        )),
        BinaryOp::Lt => SqlExpr::predicate(format!("({lt} < {rt})")),
        BinaryOp::Lte => SqlExpr::predicate(format!("({lt} <= {rt})")),
        BinaryOp::Gt => SqlExpr::predicate(format!("({lt} > {rt})")),
        BinaryOp::Gte => SqlExpr::predicate(format!("({lt} >= {rt})")),
        BinaryOp::Eq | BinaryOp::Equiv => lower_equality(lhs, rhs, &lt, &rt, true),
        BinaryOp::Neq | BinaryOp::NEquiv => lower_equality(lhs, rhs, &lt, &rt, false),
        BinaryOp::In => SqlExpr::predicate(format!(
            "EXISTS (SELECT 1 FROM OPENJSON({rt}) WHERE [value] = {lt})"
        )),
        BinaryOp::Contains => SqlExpr::predicate(format!(
            "EXISTS (SELECT 1 FROM OPENJSON({lt}) WHERE [value] = {rt})"
        )),
        BinaryOp::And => SqlExpr::predicate(format!("({} AND {})", as_predicate(&l), as_predicate(&r))),
        BinaryOp::Or => SqlExpr::predicate(format!("({} OR {})", as_predicate(&l), as_predicate(&r))),
        BinaryOp::Xor => {
            let (a, b) = (as_predicate(&l), as_predicate(&r));
            SqlExpr::predicate(format!("(({a} AND NOT {b}) OR (NOT {a} AND {b}))"))
        }
        BinaryOp::Implies => {
            let (a, b) = (as_predicate(&l), as_predicate(&r));
            SqlExpr::predicate(format!("((NOT {a}) OR {b})"))
        }
    })
}

fn as_predicate(expr: &SqlExpr) -> String {
    if expr.is_predicate() {
        expr.render()
    } else {
        format!("({} = 1)", expr.render())
    }
}

/// Equality/equivalence lowering. A comparison against a literal boolean
/// (which already rendered to `1`/`0`) casts the other side to `BIT` first,
/// since a JSON text extraction otherwise compares as `NVARCHAR`.
fn lower_equality(lhs: &Expr, rhs: &Expr, lt: &str, rt: &str, positive: bool) -> SqlExpr {
    let op = if positive { "=" } else { "!=" };
    let (lt, rt) = if is_bool_literal(rhs) && known_boolean_field(lhs).is_some() {
        (format!("(CASE WHEN {lt}='true' THEN 1 ELSE 0 END)"), rt.to_string())
    } else if is_bool_literal(lhs) && known_boolean_field(rhs).is_some() {
        (lt.to_string(), format!("(CASE WHEN {rt}='true' THEN 1 ELSE 0 END)"))
    } else if is_bool_literal(rhs) && !is_bool_literal(lhs) {
        (format!("CAST({lt} AS BIT)"), rt.to_string())
    } else if is_bool_literal(lhs) && !is_bool_literal(rhs) {
        (lt.to_string(), format!("CAST({rt} AS BIT)"))
    } else {
        (lt.to_string(), rt.to_string())
    };
    SqlExpr::predicate(format!("({lt} {op} {rt})"))
}

/// Lower a supported FHIRPath function call against `base` (the already
/// lowered expression the function is invoked on). Returns the lowered
/// result and, for `where(...)`, a continuation context to resume lowering
/// any members that follow it in the same chain.
fn lower_function(
    name: &str,
    args: &[Expr],
    base: SqlExpr,
    has_continuation: bool,
    src: &str,
    ctx: &TranspilerContext,
) -> Result<(SqlExpr, Option<TranspilerContext>), Error> {
    match name {
        "exists" => {
            if args.is_empty() {
                Ok((
                    SqlExpr::predicate(format!("({} IS NOT NULL)", base.render())),
                    None,
                ))
            } else {
                let (arr_src, arr_path) = as_array_source(base, src)?;
                let item_ctx = ctx.with_iteration_context(SqlExpr::raw("item.value"));
                let pred = lower_expr(&args[0], src, &item_ctx)?;
                Ok((
                    SqlExpr::predicate(format!(
                        "EXISTS (SELECT 1 FROM OPENJSON({arr_src}, '$.{arr_path}') AS item WHERE {})",
                        as_predicate(&pred)
                    )),
                    None,
                ))
            }
        }
        "empty" => Ok((
            SqlExpr::predicate(format!("({} IS NULL)", base.render())),
            None,
        )),
        "first" => Ok((base.index_path("0"), None)),
        "last" => {
            let (arr_src, arr_path) = as_array_source(base, src)?;
            Ok((
                SqlExpr::raw(format!(
                    "(SELECT TOP 1 [value] FROM OPENJSON({arr_src}, '$.{arr_path}') ORDER BY CAST([key] AS INT) DESC)"
                )),
                None,
            ))
        }
        "count" => {
            let (arr_src, arr_path) = as_array_source(base, src)?;
            Ok((
                SqlExpr::raw(format!(
                    "(SELECT COUNT(*) FROM OPENJSON({arr_src}, '$.{arr_path}'))"
                )),
                None,
            ))
        }
        "join" => {
            let sep = match args.first() {
                Some(Expr::Literal(Literal::String(s))) => s.replace('\'', "''"),
                None => String::new(),
                Some(_) => {
                    return Err(transpile_err(
                        src,
                        "join() separator must be a string literal",
                    ))
                }
            };
            let (arr_src, arr_path) = as_array_source(base, src)?;
            Ok((
                SqlExpr::raw(format!(
                    "(SELECT STRING_AGG([value], '{sep}') FROM OPENJSON({arr_src}, '$.{arr_path}'))"
                )),
                None,
            ))
        }
        "where" => {
            if args.len() != 1 {
                return Err(transpile_err(src, "where() takes exactly one predicate"));
            }
            let (arr_src, arr_path) = as_array_source(base, src)?;
            let item_ctx = ctx.with_iteration_context(SqlExpr::raw("item.value"));
            let pred = lower_expr(&args[0], src, &item_ctx)?;
            let predicate_sql = as_predicate(&pred);
            if has_continuation {
                // The chain keeps going past `where(...)` (`.exists()`,
                // `.first()`, a further member, ...), so the filtered items
                // need to survive as a JSON array rather than collapse to a
                // boolean. Re-aggregate the matching items back into JSON
                // array text and resume lowering against that as the new
                // root.
                let filtered = SqlExpr::raw(format!(
                    "(SELECT '[' + STRING_AGG(item.value, ',') + ']' FROM OPENJSON({arr_src}, '$.{arr_path}') AS item WHERE {predicate_sql})"
                ));
                Ok((SqlExpr::raw(""), Some(ctx.with_iteration_context(filtered))))
            } else {
                Ok((
                    SqlExpr::predicate(format!(
                        "EXISTS (SELECT 1 FROM OPENJSON({arr_src}, '$.{arr_path}') AS item WHERE {predicate_sql})"
                    )),
                    None,
                ))
            }
        }
        "select" => {
            // Identity on the argument: select(expr) re-lowers its argument
            // against the caller's context, ignoring `base`.
            let arg = args
                .first()
                .ok_or_else(|| transpile_err(src, "select() requires one argument"))?;
            Ok((lower_expr(arg, src, ctx)?, None))
        }
        "ofType" => Ok((base, None)), // identity on context
        "not" => {
            let predicate = as_predicate(&base);
            Ok((SqlExpr::predicate(format!("(NOT {predicate})")), None))
        }
        "extension" => {
            // Naive: opens `$.extension` without filtering by url.
            Ok((base.extend_path("extension", true), None))
        }
        "getResourceKey" => Ok((SqlExpr::raw(format!("{}.id", ctx.resource_alias)), None)),
        "getReferenceKey" => {
            let rendered = base.render();
            Ok((
                SqlExpr::raw(format!(
                    "(CASE WHEN CHARINDEX('/', {rendered}) > 0 THEN SUBSTRING({rendered}, CHARINDEX('/', {rendered}) + 1, LEN({rendered})) ELSE {rendered} END)"
                )),
                None,
            ))
        }
        "lowBoundary" | "highBoundary" => Ok((base, None)), // identity
        other => Err(Error::UnsupportedFunction {
            name: other.to_string(),
            expr: src.to_string(),
        }),
    }
}

/// Decompose a JSON-path-carrying node into `(src, path)` text so an
/// `OPENJSON(src, '$.path')` call can be built over it. Functions that need
/// to iterate (`where`, `count`, `last`, `join`, `exists([e])`) require their
/// base to already be such a node.
fn as_array_source(expr: SqlExpr, src: &str) -> Result<(String, String), Error> {
    match expr {
        SqlExpr::JsonValue { src: root, path } | SqlExpr::JsonQuery { src: root, path } => {
            Ok((root.render(), path))
        }
        other => Err(transpile_err(
            src,
            format!("cannot iterate over non-path expression `{}`", other.render()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> TranspilerContext {
        TranspilerContext::new("r")
    }

    #[test]
    fn lowers_simple_member_access() {
        let expr = lower("gender", &ctx()).unwrap();
        assert_eq!(expr.render(), "JSON_VALUE(r.json, '$.gender')");
    }

    #[test]
    fn injects_implicit_first_element_for_known_array() {
        let expr = lower("name.family", &ctx()).unwrap();
        assert_eq!(expr.render(), "JSON_VALUE(r.json, '$.name[0].family')");
    }

    #[test]
    fn does_not_index_a_bare_array_field() {
        let expr = lower("name", &ctx()).unwrap();
        assert_eq!(expr.render(), "JSON_QUERY(r.json, '$.name')");
    }

    #[test]
    fn explicit_index_suppresses_implicit_injection_downstream() {
        let expr = lower("name[1].family", &ctx()).unwrap();
        assert_eq!(expr.render(), "JSON_VALUE(r.json, '$.name[1].family')");
    }

    #[test]
    fn lowers_id_identifier_to_row_column() {
        let expr = lower("id", &ctx()).unwrap();
        assert_eq!(expr.render(), "r.id");
    }

    #[test]
    fn lowers_equality_with_boolean_literal_casts_other_side() {
        let expr = lower("gender = true", &ctx()).unwrap();
        assert_eq!(
            expr.render(),
            "(CAST(JSON_VALUE(r.json, '$.gender') AS BIT) = 1)"
        );
    }

    #[test]
    fn lowers_known_boolean_field_equality_as_case_when() {
        let expr = lower("active = true", &ctx()).unwrap();
        assert_eq!(
            expr.render(),
            "((CASE WHEN JSON_VALUE(r.json, '$.active')='true' THEN 1 ELSE 0 END) = 1)"
        );
    }

    #[test]
    fn lowers_exists_with_no_args() {
        let expr = lower("deceasedBoolean.exists()", &ctx()).unwrap();
        assert_eq!(
            expr.render(),
            "(JSON_VALUE(r.json, '$.deceasedBoolean') IS NOT NULL)"
        );
    }

    #[test]
    fn lowers_count_over_array_field() {
        let expr = lower("telecom.count()", &ctx()).unwrap();
        assert_eq!(
            expr.render(),
            "(SELECT COUNT(*) FROM OPENJSON(r.json, '$.telecom'))"
        );
    }

    #[test]
    fn lowers_last_as_ordered_top_one() {
        let expr = lower("identifier.last()", &ctx()).unwrap();
        assert_eq!(
            expr.render(),
            "(SELECT TOP 1 [value] FROM OPENJSON(r.json, '$.identifier') ORDER BY CAST([key] AS INT) DESC)"
        );
    }

    #[test]
    fn lowers_join_with_separator() {
        let expr = lower("name.given.join(' ')", &ctx()).unwrap();
        assert_eq!(
            expr.render(),
            "(SELECT STRING_AGG([value], ' ') FROM OPENJSON(r.json, '$.name[0].given'))"
        );
    }

    #[test]
    fn lowers_and_or_xor_implies() {
        assert_eq!(
            lower("true and false", &ctx()).unwrap().render(),
            "((1 = 1) AND (0 = 1))"
        );
        assert_eq!(
            lower("true implies false", &ctx()).unwrap().render(),
            "((NOT (1 = 1)) OR (0 = 1))"
        );
    }

    #[test]
    fn lowers_where_predicate_over_array() {
        let expr = lower("telecom.where(system = 'phone')", &ctx()).unwrap();
        assert_eq!(
            expr.render(),
            "EXISTS (SELECT 1 FROM OPENJSON(r.json, '$.telecom') AS item WHERE (JSON_VALUE(item.value, '$.system') = 'phone'))"
        );
    }

    #[test]
    fn lowers_where_with_continuation_filters_before_exists() {
        let expr = lower("identifier.where(system = 'abc').exists()", &ctx()).unwrap();
        assert_eq!(
            expr.render(),
            "((SELECT '[' + STRING_AGG(item.value, ',') + ']' FROM OPENJSON(r.json, '$.identifier') AS item WHERE (JSON_VALUE(item.value, '$.system') = 'abc')) IS NOT NULL)"
        );
    }

    #[test]
    fn resolves_bound_constant() {
        let c = ctx().with_constant("sys", "'http://example.org'");
        let expr = lower("%sys", &c).unwrap();
        assert_eq!(expr.render(), "'http://example.org'");
    }

    #[test]
    fn unbound_constant_is_a_transpile_error() {
        assert!(lower("%missing", &ctx()).is_err());
    }

    #[test]
    fn unsupported_function_is_reported_by_name() {
        let err = lower("name.matches('a')", &ctx()).unwrap_err();
        match err {
            Error::UnsupportedFunction { name, .. } => assert_eq!(name, "matches"),
            other => panic!("expected UnsupportedFunction, got {other:?}"),
        }
    }
}
