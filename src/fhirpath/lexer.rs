//! FHIRPath lexer — tokenises a FHIRPath expression string.
//!
//! Whitespace and comments (`//` line comments, `/* */` block comments) are
//! skipped; every other lexical rule in the FHIRPath grammar is implemented
//! here.

use super::token::{Token, TokenKind};
use crate::error::Error;

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    source: String,
}

impl Lexer {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let chars = source.chars().collect();
        Self {
            chars,
            pos: 0,
            line: 1,
            column: 1,
            source,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::Syntax {
            expr: self.source.clone(),
            message: message.into(),
        }
    }

    fn skip_trivia(&mut self) -> Result<(), Error> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek2() == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek2() == Some('*') => {
                    self.advance();
                    self.advance();
                    loop {
                        match self.peek() {
                            None => return Err(self.error("unterminated block comment")),
                            Some('*') if self.peek2() == Some('/') => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            Some(_) => {
                                self.advance();
                            }
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Tokenise the entire input, always ending in [`TokenKind::Eof`].
    pub fn tokenize(mut self) -> Result<Vec<Token>, Error> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            let (line, column) = (self.line, self.column);
            let Some(c) = self.peek() else {
                tokens.push(Token::new(TokenKind::Eof, line, column));
                break;
            };

            let kind = match c {
                '.' => {
                    self.advance();
                    TokenKind::Dot
                }
                '(' => {
                    self.advance();
                    TokenKind::LParen
                }
                ')' => {
                    self.advance();
                    TokenKind::RParen
                }
                '[' => {
                    self.advance();
                    TokenKind::LBracket
                }
                ']' => {
                    self.advance();
                    TokenKind::RBracket
                }
                '{' => {
                    self.advance();
                    TokenKind::LBrace
                }
                '}' => {
                    self.advance();
                    TokenKind::RBrace
                }
                ',' => {
                    self.advance();
                    TokenKind::Comma
                }
                '+' => {
                    self.advance();
                    TokenKind::Plus
                }
                '-' => {
                    self.advance();
                    TokenKind::Minus
                }
                '*' => {
                    self.advance();
                    TokenKind::Star
                }
                '/' => {
                    self.advance();
                    TokenKind::Slash
                }
                '|' => {
                    self.advance();
                    TokenKind::Pipe
                }
                '&' => {
                    self.advance();
                    TokenKind::Amp
                }
                '=' => {
                    self.advance();
                    TokenKind::Eq
                }
                '~' => {
                    self.advance();
                    TokenKind::Equiv
                }
                '!' => {
                    self.advance();
                    match self.peek() {
                        Some('=') => {
                            self.advance();
                            TokenKind::Neq
                        }
                        Some('~') => {
                            self.advance();
                            TokenKind::NEquiv
                        }
                        _ => return Err(self.error("expected '=' or '~' after '!'")),
                    }
                }
                '<' => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        TokenKind::Lte
                    } else {
                        TokenKind::Lt
                    }
                }
                '>' => {
                    self.advance();
                    if self.peek() == Some('=') {
                        self.advance();
                        TokenKind::Gte
                    } else {
                        TokenKind::Gt
                    }
                }
                '\'' => self.lex_string()?,
                '`' => self.lex_delimited_identifier()?,
                '%' => self.lex_constant()?,
                '$' => self.lex_special_variable()?,
                '@' => self.lex_date_time()?,
                c if c.is_ascii_digit() => self.lex_number()?,
                c if c.is_alphabetic() || c == '_' => self.lex_word()?,
                other => return Err(self.error(format!("unexpected character '{other}'"))),
            };

            tokens.push(Token::new(kind, line, column));
        }
        Ok(tokens)
    }

    fn lex_string(&mut self) -> Result<TokenKind, Error> {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.advance() {
                None => return Err(self.error("unterminated string literal")),
                Some('\'') => {
                    if self.peek() == Some('\'') {
                        // doubled quote escapes to a literal quote
                        self.advance();
                        value.push('\'');
                    } else {
                        break;
                    }
                }
                Some('\\') => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('\\') => value.push('\\'),
                    Some('\'') => value.push('\''),
                    Some(other) => value.push(other),
                    None => return Err(self.error("unterminated string literal")),
                },
                Some(c) => value.push(c),
            }
        }
        Ok(TokenKind::String(value))
    }

    fn lex_delimited_identifier(&mut self) -> Result<TokenKind, Error> {
        self.advance(); // opening backtick
        let mut value = String::new();
        loop {
            match self.advance() {
                None => return Err(self.error("unterminated delimited identifier")),
                Some('`') => break,
                Some(c) => value.push(c),
            }
        }
        Ok(TokenKind::DelimitedIdentifier(value))
    }

    fn lex_constant(&mut self) -> Result<TokenKind, Error> {
        self.advance(); // '%'
        if self.peek() == Some('\'') {
            if let TokenKind::String(s) = self.lex_string()? {
                return Ok(TokenKind::Constant(s));
            }
        }
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if name.is_empty() {
            return Err(self.error("expected a name after '%'"));
        }
        Ok(TokenKind::Constant(name))
    }

    fn lex_special_variable(&mut self) -> Result<TokenKind, Error> {
        self.advance(); // '$'
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() {
                name.push(c);
                self.advance();
            } else {
                break;
            }
        }
        match name.as_str() {
            "this" => Ok(TokenKind::This),
            "index" => Ok(TokenKind::Index),
            "total" => Ok(TokenKind::Total),
            other => Err(self.error(format!("unknown special variable '${other}'"))),
        }
    }

    fn lex_date_time(&mut self) -> Result<TokenKind, Error> {
        self.advance(); // '@'
        let is_time = self.peek() == Some('T');
        if is_time {
            self.advance();
        }
        let mut value = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || matches!(c, '-' | ':' | '.' | 'T' | 'Z' | '+') {
                value.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if value.is_empty() {
            return Err(self.error("expected a date/time literal after '@'"));
        }
        if is_time {
            Ok(TokenKind::Time(value))
        } else if value.contains('T') {
            Ok(TokenKind::DateTime(value))
        } else {
            Ok(TokenKind::Date(value))
        }
    }

    fn lex_number(&mut self) -> Result<TokenKind, Error> {
        let mut value = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                value.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if self.peek() == Some('.') && self.peek2().is_some_and(|c| c.is_ascii_digit()) {
            value.push('.');
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    value.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }
        if self.peek() == Some('L') {
            self.advance();
            return Ok(TokenKind::LongNumber(value));
        }
        Ok(TokenKind::Number(value))
    }

    fn lex_word(&mut self) -> Result<TokenKind, Error> {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }
        Ok(match word.as_str() {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "xor" => TokenKind::Xor,
            "implies" => TokenKind::Implies,
            "div" => TokenKind::Div,
            "mod" => TokenKind::Mod,
            "is" => TokenKind::Is,
            "as" => TokenKind::As,
            "in" => TokenKind::In,
            "contains" => TokenKind::Contains,
            _ => TokenKind::Identifier(word),
        })
    }
}
