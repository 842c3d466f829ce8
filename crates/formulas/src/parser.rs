//! Formula parser module

use crate::refs::CellAddress;
use crate::{ErrorValue, FormulaError};

/// Parsed formula expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Text(String),
    Bool(bool),
    Error(ErrorValue),
    Cell(CellAddress),
    Range(CellAddress, CellAddress),
    Unary {
        op: UnaryOperator,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Concat,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Plus,
    Percent,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Text(String),
    Ident(String),
    Error(ErrorValue),
    LParen,
    RParen,
    Comma,
    Colon,
    Bang,
    Quoted(String),
    Op(char),
    Compare(BinaryOperator),
}

struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    source: &'a str,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            source,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn tokenize(mut self) -> Result<Vec<Token>, FormulaError> {
        let mut tokens = Vec::new();
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.pos += 1;
                continue;
            }
            let token = match ch {
                '(' => self.single(Token::LParen),
                ')' => self.single(Token::RParen),
                ',' | ';' => self.single(Token::Comma),
                ':' => self.single(Token::Colon),
                '!' => self.single(Token::Bang),
                '+' | '-' | '*' | '/' | '^' | '&' | '%' => self.single(Token::Op(ch)),
                '=' => self.single(Token::Compare(BinaryOperator::Equal)),
                '<' => {
                    self.pos += 1;
                    match self.peek() {
                        Some('=') => self.single(Token::Compare(BinaryOperator::LessThanOrEqual)),
                        Some('>') => self.single(Token::Compare(BinaryOperator::NotEqual)),
                        _ => Token::Compare(BinaryOperator::LessThan),
                    }
                }
                '>' => {
                    self.pos += 1;
                    if self.peek() == Some('=') {
                        self.single(Token::Compare(BinaryOperator::GreaterThanOrEqual))
                    } else {
                        Token::Compare(BinaryOperator::GreaterThan)
                    }
                }
                '"' => Token::Text(self.delimited('"')?),
                '\'' => Token::Quoted(self.delimited('\'')?),
                '#' => self.error_literal()?,
                '0'..='9' | '.' => self.number()?,
                c if c.is_alphabetic() || c == '_' || c == '$' => self.identifier(),
                other => {
                    return Err(FormulaError::ParseError(format!(
                        "Unexpected character '{}' at {} in '{}'",
                        other, self.pos, self.source
                    )))
                }
            };
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn single(&mut self, token: Token) -> Token {
        self.pos += 1;
        token
    }

    /// Quote-delimited text where a doubled quote is an escaped quote.
    fn delimited(&mut self, quote: char) -> Result<String, FormulaError> {
        self.pos += 1;
        let mut text = String::new();
        loop {
            match self.peek() {
                Some(c) if c == quote => {
                    self.pos += 1;
                    if self.peek() == Some(quote) {
                        text.push(quote);
                        self.pos += 1;
                    } else {
                        return Ok(text);
                    }
                }
                Some(c) => {
                    text.push(c);
                    self.pos += 1;
                }
                None => {
                    return Err(FormulaError::ParseError(format!(
                        "Unterminated {} in '{}'",
                        if quote == '"' { "string" } else { "sheet name" },
                        self.source
                    )))
                }
            }
        }
    }

    fn error_literal(&mut self) -> Result<Token, FormulaError> {
        let mut literal = String::from('#');
        self.pos += 1;
        while let Some(c) = self.peek() {
            literal.push(c);
            self.pos += 1;
            if matches!(c, '!' | '?') || literal.eq_ignore_ascii_case("#N/A") {
                break;
            }
        }
        ErrorValue::from_label(&literal)
            .map(Token::Error)
            .ok_or_else(|| FormulaError::ParseError(format!("Unknown error literal '{literal}'")))
    }

    fn number(&mut self) -> Result<Token, FormulaError> {
        let start = self.pos;
        while matches!(self.peek(), Some('0'..='9' | '.')) {
            self.pos += 1;
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let next = self.chars.get(self.pos + 1).copied();
            let after_sign = self.chars.get(self.pos + 2).copied();
            let has_exponent = next.is_some_and(|c| c.is_ascii_digit())
                || (matches!(next, Some('+' | '-')) && after_sign.is_some_and(|c| c.is_ascii_digit()));
            if has_exponent {
                self.pos += 2;
                while matches!(self.peek(), Some('0'..='9')) {
                    self.pos += 1;
                }
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| FormulaError::ParseError(format!("Invalid number '{text}'")))
    }

    fn identifier(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || matches!(c, '_' | '$' | '.') {
                self.pos += 1;
            } else {
                break;
            }
        }
        Token::Ident(self.chars[start..self.pos].iter().collect())
    }
}

/// Parse formula text into an expression tree.
///
/// A leading `=` is optional. Sheet-qualified references and named ranges
/// are reported as [`FormulaError::Unsupported`].
pub fn parse_formula(formula: &str) -> Result<Expr, FormulaError> {
    let body = formula.trim();
    let body = body.strip_prefix('=').unwrap_or(body);
    if body.trim().is_empty() {
        return Err(FormulaError::ParseError("Empty formula".to_string()));
    }

    let tokens = Lexer::new(body).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.comparison()?;
    if let Some(token) = parser.peek() {
        return Err(FormulaError::ParseError(format!(
            "Unexpected token {token:?} in '{body}'"
        )));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), FormulaError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(FormulaError::ParseError(format!(
                "Expected {token:?}, found {:?}",
                self.peek()
            )))
        }
    }

    fn comparison(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.concat()?;
        while let Some(Token::Compare(op)) = self.peek().cloned() {
            self.pos += 1;
            let right = self.concat()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn concat(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.additive()?;
        while self.eat(&Token::Op('&')) {
            let right = self.additive()?;
            left = binary(BinaryOperator::Concat, left, right);
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Op('+')) => BinaryOperator::Add,
                Some(Token::Op('-')) => BinaryOperator::Subtract,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.multiplicative()?;
            left = binary(op, left, right);
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.power()?;
        loop {
            let op = match self.peek() {
                Some(Token::Op('*')) => BinaryOperator::Multiply,
                Some(Token::Op('/')) => BinaryOperator::Divide,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.power()?;
            left = binary(op, left, right);
        }
    }

    fn power(&mut self) -> Result<Expr, FormulaError> {
        let mut left = self.unary()?;
        while self.eat(&Token::Op('^')) {
            let right = self.unary()?;
            left = binary(BinaryOperator::Power, left, right);
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, FormulaError> {
        let op = match self.peek() {
            Some(Token::Op('-')) => UnaryOperator::Negate,
            Some(Token::Op('+')) => UnaryOperator::Plus,
            _ => return self.postfix(),
        };
        self.pos += 1;
        let expr = self.unary()?;
        Ok(Expr::Unary {
            op,
            expr: Box::new(expr),
        })
    }

    fn postfix(&mut self) -> Result<Expr, FormulaError> {
        let mut expr = self.primary()?;
        while self.eat(&Token::Op('%')) {
            expr = Expr::Unary {
                op: UnaryOperator::Percent,
                expr: Box::new(expr),
            };
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, FormulaError> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Text(s)) => Ok(Expr::Text(s)),
            Some(Token::Error(e)) => Ok(Expr::Error(e)),
            Some(Token::LParen) => {
                let expr = self.comparison()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Some(Token::Quoted(sheet)) => Err(FormulaError::Unsupported(format!(
                "sheet reference '{sheet}'"
            ))),
            Some(Token::Ident(name)) => self.identifier(name),
            other => Err(FormulaError::ParseError(format!(
                "Unexpected token {other:?}"
            ))),
        }
    }

    fn identifier(&mut self, name: String) -> Result<Expr, FormulaError> {
        if self.eat(&Token::LParen) {
            let args = self.arguments()?;
            return Ok(Expr::Call {
                name: name.to_ascii_uppercase(),
                args,
            });
        }

        if self.peek() == Some(&Token::Bang) {
            return Err(FormulaError::Unsupported(format!("sheet reference '{name}!'")));
        }

        if let Some(start) = CellAddress::parse_a1(&name) {
            if self.eat(&Token::Colon) {
                return match self.next() {
                    Some(Token::Ident(end)) => CellAddress::parse_a1(&end)
                        .map(|end| Expr::Range(start, end))
                        .ok_or_else(|| {
                            FormulaError::ParseError(format!("Invalid range end '{end}'"))
                        }),
                    other => Err(FormulaError::ParseError(format!(
                        "Invalid range end {other:?}"
                    ))),
                };
            }
            return Ok(Expr::Cell(start));
        }

        match name.to_ascii_uppercase().as_str() {
            "TRUE" => Ok(Expr::Bool(true)),
            "FALSE" => Ok(Expr::Bool(false)),
            _ => Err(FormulaError::Unsupported(format!("name '{name}'"))),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, FormulaError> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.comparison()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RParen)?;
            return Ok(args);
        }
    }
}

fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}
