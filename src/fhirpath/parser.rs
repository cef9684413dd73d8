//! FHIRPath recursive-descent parser.
//!
//! Implements the operator-precedence chain from the published FHIRPath
//! grammar, tightest to loosest:
//! `invocation (.) > indexer ([]) > polarity > multiplicative > additive >
//! type (is/as) > union (|) > inequality > equality > membership (in/contains)
//! > and > or/xor > implies`.
//! `implies` is right-associative; every other binary level is
//! left-associative.

use super::ast::{BinaryOp, Expr, Literal, TypeOp, UnaryOp};
use super::lexer::Lexer;
use super::token::{Token, TokenKind};
use crate::error::Error;

/// Parse a FHIRPath expression into an [`Expr`] tree, or a
/// [`Error::Syntax`] describing the failure. Does not recover: the first
/// lexing or parsing diagnostic ends the parse.
pub fn parse(expr: &str) -> Result<Expr, Error> {
    let tokens = Lexer::new(expr).tokenize()?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        source: expr,
    };
    let tree = parser.parse_implies()?;
    parser.expect_eof()?;
    Ok(tree)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    source: &'a str,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.tokens[self.pos].kind.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        kind
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::Syntax {
            expr: self.source.to_string(),
            message: message.into(),
        }
    }

    fn expect_eof(&self) -> Result<(), Error> {
        if matches!(self.peek(), TokenKind::Eof) {
            Ok(())
        } else {
            Err(self.error(format!("unexpected trailing token {:?}", self.peek())))
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), Error> {
        if self.peek() == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {kind:?}, found {:?}",
                self.peek().clone()
            )))
        }
    }

    // implies (right-associative, loosest)
    fn parse_implies(&mut self) -> Result<Expr, Error> {
        let lhs = self.parse_or()?;
        if matches!(self.peek(), TokenKind::Implies) {
            self.advance();
            let rhs = self.parse_implies()?;
            Ok(Expr::Binary {
                op: BinaryOp::Implies,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            })
        } else {
            Ok(lhs)
        }
    }

    fn parse_or(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_and()?;
        loop {
            let op = match self.peek() {
                TokenKind::Or => BinaryOp::Or,
                TokenKind::Xor => BinaryOp::Xor,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_membership()?;
        while matches!(self.peek(), TokenKind::And) {
            self.advance();
            let rhs = self.parse_membership()?;
            lhs = Expr::Binary {
                op: BinaryOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_membership(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_equality()?;
        loop {
            let op = match self.peek() {
                TokenKind::In => BinaryOp::In,
                TokenKind::Contains => BinaryOp::Contains,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_equality()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_inequality()?;
        loop {
            let op = match self.peek() {
                TokenKind::Eq => BinaryOp::Eq,
                TokenKind::Equiv => BinaryOp::Equiv,
                TokenKind::Neq => BinaryOp::Neq,
                TokenKind::NEquiv => BinaryOp::NEquiv,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_inequality()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_inequality(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_union()?;
        loop {
            let op = match self.peek() {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Lte => BinaryOp::Lte,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Gte => BinaryOp::Gte,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_union()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_union(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_type()?;
        while matches!(self.peek(), TokenKind::Pipe) {
            self.advance();
            let rhs = self.parse_type()?;
            lhs = Expr::Binary {
                op: BinaryOp::Union,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_type(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                TokenKind::Is => TypeOp::Is,
                TokenKind::As => TypeOp::As,
                _ => break,
            };
            self.advance();
            let type_name = self.parse_type_specifier()?;
            lhs = Expr::TypeExpr {
                op,
                expr: Box::new(lhs),
                type_name,
            };
        }
        Ok(lhs)
    }

    fn parse_type_specifier(&mut self) -> Result<String, Error> {
        let mut name = match self.advance() {
            TokenKind::Identifier(name) => name,
            other => return Err(self.error(format!("expected a type name, found {other:?}"))),
        };
        while matches!(self.peek(), TokenKind::Dot) {
            self.advance();
            match self.advance() {
                TokenKind::Identifier(part) => {
                    name.push('.');
                    name.push_str(&part);
                }
                other => {
                    return Err(self.error(format!("expected a type name segment, found {other:?}")));
                }
            }
        }
        Ok(name)
    }

    fn parse_additive(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                TokenKind::Amp => BinaryOp::Concat,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_polarity()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Div => BinaryOp::IntDiv,
                TokenKind::Mod => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_polarity()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_polarity(&mut self) -> Result<Expr, Error> {
        let op = match self.peek() {
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Minus),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let expr = self.parse_polarity()?;
            Ok(Expr::Unary {
                op,
                expr: Box::new(expr),
            })
        } else {
            self.parse_postfix()
        }
    }

    // invocation (.member) and indexer ([expr]), tightest binding
    fn parse_postfix(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_term()?;
        loop {
            match self.peek() {
                TokenKind::Dot => {
                    self.advance();
                    let member = self.parse_invocation_target()?;
                    expr = Expr::Invocation {
                        base: Box::new(expr),
                        member: Box::new(member),
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_implies()?;
                    self.expect(&TokenKind::RBracket)?;
                    expr = Expr::Indexer {
                        base: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Parse the right-hand side of `.`: an identifier, a function call, or
    /// one of the special `$this`/`$index`/`$total` terms.
    fn parse_invocation_target(&mut self) -> Result<Expr, Error> {
        match self.peek().clone() {
            TokenKind::Identifier(name) => {
                self.advance();
                if matches!(self.peek(), TokenKind::LParen) {
                    self.parse_call_args(name)
                } else {
                    Ok(Expr::Identifier(name))
                }
            }
            TokenKind::DelimitedIdentifier(name) => {
                self.advance();
                Ok(Expr::DelimitedIdentifier(name))
            }
            TokenKind::This => {
                self.advance();
                Ok(Expr::This)
            }
            TokenKind::Index => {
                self.advance();
                Ok(Expr::Index)
            }
            TokenKind::Total => {
                self.advance();
                Ok(Expr::Total)
            }
            // Keywords are valid unquoted member names in FHIRPath.
            TokenKind::As => {
                self.advance();
                Ok(Expr::Identifier("as".to_string()))
            }
            TokenKind::Is => {
                self.advance();
                Ok(Expr::Identifier("is".to_string()))
            }
            other => Err(self.error(format!("expected a member name, found {other:?}"))),
        }
    }

    fn parse_call_args(&mut self, name: String) -> Result<Expr, Error> {
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        if !matches!(self.peek(), TokenKind::RParen) {
            loop {
                args.push(self.parse_implies()?);
                if matches!(self.peek(), TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(Expr::Function { name, args })
    }

    fn parse_term(&mut self) -> Result<Expr, Error> {
        match self.peek().clone() {
            TokenKind::True => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(false)))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::Literal(Literal::String(s)))
            }
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::Number(n)))
            }
            TokenKind::LongNumber(n) => {
                self.advance();
                Ok(Expr::Literal(Literal::LongNumber(n)))
            }
            TokenKind::Date(d) => {
                self.advance();
                Ok(Expr::Literal(Literal::Date(d)))
            }
            TokenKind::DateTime(d) => {
                self.advance();
                Ok(Expr::Literal(Literal::DateTime(d)))
            }
            TokenKind::Time(t) => {
                self.advance();
                Ok(Expr::Literal(Literal::Time(t)))
            }
            TokenKind::Constant(name) => {
                self.advance();
                Ok(Expr::EnvVariable(name))
            }
            TokenKind::This => {
                self.advance();
                Ok(Expr::This)
            }
            TokenKind::Index => {
                self.advance();
                Ok(Expr::Index)
            }
            TokenKind::Total => {
                self.advance();
                Ok(Expr::Total)
            }
            TokenKind::DelimitedIdentifier(name) => {
                self.advance();
                Ok(Expr::DelimitedIdentifier(name))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                if matches!(self.peek(), TokenKind::LParen) {
                    self.parse_call_args(name)
                } else {
                    Ok(Expr::Identifier(name))
                }
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_implies()?;
                self.expect(&TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::LBrace => {
                self.advance();
                self.expect(&TokenKind::RBrace)?;
                Ok(Expr::Literal(Literal::Null))
            }
            other => Err(self.error(format!("unexpected token {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_member_path() {
        let tree = parse("name.family").unwrap();
        assert_eq!(
            tree,
            Expr::Invocation {
                base: Box::new(Expr::Identifier("name".into())),
                member: Box::new(Expr::Identifier("family".into())),
            }
        );
    }

    #[test]
    fn parses_function_call_with_predicate() {
        let tree = parse("name.where(use = 'official')").unwrap();
        let Expr::Invocation { member, .. } = tree else {
            panic!("expected invocation");
        };
        let Expr::Function { name, args } = *member else {
            panic!("expected function");
        };
        assert_eq!(name, "where");
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn implies_is_right_associative() {
        let tree = parse("a implies b implies c").unwrap();
        match tree {
            Expr::Binary {
                op: BinaryOp::Implies,
                rhs,
                ..
            } => {
                assert!(matches!(
                    *rhs,
                    Expr::Binary {
                        op: BinaryOp::Implies,
                        ..
                    }
                ));
            }
            _ => panic!("expected implies"),
        }
    }

    #[test]
    fn respects_precedence_between_additive_and_multiplicative() {
        let tree = parse("1 + 2 * 3").unwrap();
        match tree {
            Expr::Binary {
                op: BinaryOp::Add,
                rhs,
                ..
            } => assert!(matches!(
                *rhs,
                Expr::Binary {
                    op: BinaryOp::Mul,
                    ..
                }
            )),
            _ => panic!("expected additive at the top"),
        }
    }

    #[test]
    fn indexer_binds_tighter_than_invocation_dot() {
        let tree = parse("name[0].family").unwrap();
        assert_eq!(
            tree,
            Expr::Invocation {
                base: Box::new(Expr::Indexer {
                    base: Box::new(Expr::Identifier("name".into())),
                    index: Box::new(Expr::Literal(Literal::Number("0".into()))),
                }),
                member: Box::new(Expr::Identifier("family".into())),
            }
        );
    }

    #[test]
    fn errors_on_unbalanced_parens() {
        assert!(parse("(1 + 2").is_err());
    }

    #[test]
    fn errors_on_trailing_garbage() {
        assert!(parse("1 2").is_err());
    }

    #[test]
    fn round_trips_is_and_as() {
        let tree = parse("value as Quantity").unwrap();
        assert!(matches!(
            tree,
            Expr::TypeExpr {
                op: TypeOp::As,
                ..
            }
        ));
    }

    #[test]
    fn parses_env_constant() {
        assert_eq!(parse("%resource").unwrap(), Expr::EnvVariable("resource".into()));
    }
}
