//! FHIRPath abstract syntax tree produced by [`super::parser::Parser`].

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    String(String),
    Number(String),
    LongNumber(String),
    Date(String),
    DateTime(String),
    Time(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    IntDiv,
    Mod,
    Add,
    Sub,
    Concat,
    Union,
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
    Equiv,
    Neq,
    NEquiv,
    In,
    Contains,
    And,
    Or,
    Xor,
    Implies,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeOp {
    Is,
    As,
}

/// A FHIRPath expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// A bare identifier: a field name or, at the head of an expression, a
    /// resource-type qualifier such as `Patient`.
    Identifier(String),
    /// A backtick-delimited identifier, e.g. `` `where` ``.
    DelimitedIdentifier(String),
    /// `%name` — a reference to a ViewDefinition constant or environment
    /// variable such as `%resource`.
    EnvVariable(String),
    This,
    Index,
    Total,
    /// `base.member`
    Invocation { base: Box<Expr>, member: Box<Expr> },
    /// `name(args...)` — either a top-level call or the member side of an
    /// [`Expr::Invocation`].
    Function { name: String, args: Vec<Expr> },
    /// `base[index]`
    Indexer { base: Box<Expr>, index: Box<Expr> },
    Unary { op: UnaryOp, expr: Box<Expr> },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `expr is Type` / `expr as Type`
    TypeExpr {
        op: TypeOp,
        expr: Box<Expr>,
        type_name: String,
    },
}
