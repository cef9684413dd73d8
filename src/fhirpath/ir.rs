//! A small internal SQL IR.
//!
//! Member access in FHIRPath composes by extending a JSON path; rather than
//! rendering each step straight to text and re-parsing that text with a
//! regex to find where to splice the next segment (a pattern that leaks
//! bugs when nesting gets deep), lowering builds one of these nodes and
//! renders the whole thing to T-SQL exactly once.

#[derive(Debug, Clone, PartialEq)]
pub enum SqlExpr {
    /// `JSON_VALUE(src, '$.path')` — a scalar extraction.
    JsonValue { src: Box<SqlExpr>, path: String },
    /// `JSON_QUERY(src, '$.path')` — a sub-document/array extraction.
    JsonQuery { src: Box<SqlExpr>, path: String },
    /// Verbatim SQL text: a resource alias, a literal, a rendered function
    /// call, or anything else that isn't a composable JSON path.
    Raw(String),
    /// An already-boolean SQL fragment (a comparison, `EXISTS (...)`, ...).
    /// Kept distinct from [`SqlExpr::Raw`] so callers can tell a predicate
    /// apart from a scalar without re-parsing text.
    Predicate(String),
}

impl SqlExpr {
    pub fn raw(sql: impl Into<String>) -> Self {
        SqlExpr::Raw(sql.into())
    }

    pub fn predicate(sql: impl Into<String>) -> Self {
        SqlExpr::Predicate(sql.into())
    }

    /// Extend this expression's JSON path with another `.segment`, without
    /// forcing a render. If `self` is already a [`SqlExpr::JsonValue`] or
    /// [`SqlExpr::JsonQuery`], the new segment is appended to its path in
    /// place; otherwise a fresh `JSON_VALUE`/`JSON_QUERY` node is created
    /// rooted at `self`.
    pub fn extend_path(self, segment: &str, as_query: bool) -> Self {
        match self {
            SqlExpr::JsonValue { src, mut path } if !as_query => {
                path.push('.');
                path.push_str(segment);
                SqlExpr::JsonValue { src, path }
            }
            SqlExpr::JsonQuery { src, mut path } => {
                path.push('.');
                path.push_str(segment);
                if as_query {
                    SqlExpr::JsonQuery { src, path }
                } else {
                    SqlExpr::JsonValue { src, path }
                }
            }
            other => {
                let base = Box::new(other);
                let path = segment.to_string();
                if as_query {
                    SqlExpr::JsonQuery { src: base, path }
                } else {
                    SqlExpr::JsonValue { src: base, path }
                }
            }
        }
    }

    /// Append an array index to the current path: `$.name[0]`.
    pub fn index_path(self, index: &str) -> Self {
        match self {
            SqlExpr::JsonValue { src, mut path } => {
                path.push('[');
                path.push_str(index);
                path.push(']');
                SqlExpr::JsonValue { src, path }
            }
            SqlExpr::JsonQuery { src, mut path } => {
                path.push('[');
                path.push_str(index);
                path.push(']');
                SqlExpr::JsonQuery { src, path }
            }
            other => SqlExpr::JsonValue {
                src: Box::new(other),
                path: format!("[{index}]"),
            },
        }
    }

    /// Re-root a JSON path node to query (`JSON_QUERY`) instead of value
    /// (`JSON_VALUE`) extraction, leaving non-JSON-path nodes untouched.
    pub fn as_query(self) -> Self {
        match self {
            SqlExpr::JsonValue { src, path } => SqlExpr::JsonQuery { src, path },
            other => other,
        }
    }

    /// Render this node to T-SQL text. Each node renders exactly once, at
    /// the end of lowering.
    pub fn render(&self) -> String {
        match self {
            SqlExpr::JsonValue { src, path } => {
                format!("JSON_VALUE({}, '$.{}')", src.render(), path)
            }
            SqlExpr::JsonQuery { src, path } => {
                format!("JSON_QUERY({}, '$.{}')", src.render(), path)
            }
            SqlExpr::Raw(sql) => sql.clone(),
            SqlExpr::Predicate(sql) => sql.clone(),
        }
    }

    /// Whether this node already reads as a SQL boolean expression.
    pub fn is_predicate(&self) -> bool {
        matches!(self, SqlExpr::Predicate(_))
    }
}

/// Render `expr` as a SQL boolean: as-is if it already is one, otherwise
/// compared against the bit value `1`.
pub fn as_predicate(expr: &SqlExpr) -> String {
    if expr.is_predicate() {
        expr.render()
    } else {
        format!("({} = 1)", expr.render())
    }
}
