//! Mapping expression parser
//!
//! A recursive descent parser producing [`Expr`] trees. Precedence from
//! loosest to tightest: conditional, `or`, `and`, comparison, `&`,
//! additive, multiplicative, unary prefix, primary.
//!
//! Copyright (c) 2025 Transmap Team
//! Licensed under the Apache-2.0 license

use super::ast::*;
use super::error::ExpressionError;
use std::iter::Peekable;
use std::str::Chars;

type ParseResult<T> = std::result::Result<T, ExpressionError>;

/// Mapping expression parser
pub struct Parser<'a> {
    /// Input string being parsed
    input: &'a str,
    /// Character iterator
    chars: Peekable<Chars<'a>>,
    /// Current byte offset in input
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given input
    pub fn new(input: &'a str) -> ParseResult<Self> {
        if input.trim().is_empty() {
            return Err(ExpressionError::parse("Empty expression", 0, input));
        }

        Ok(Self {
            input,
            chars: input.chars().peekable(),
            position: 0,
        })
    }

    /// Parse the complete input into an expression tree
    pub fn parse(mut self) -> ParseResult<Expr> {
        let expr = self.parse_expression()?;
        self.skip_whitespace();

        if let Some(ch) = self.current_char() {
            return Err(ExpressionError::syntax(
                "Unexpected trailing input",
                self.position,
                self.input,
                vec!["operator".to_string(), "end of input".to_string()],
                ch.to_string(),
            ));
        }

        Ok(expr)
    }

    fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.parse_condition()
    }

    /// Parse `condition ? then : otherwise`
    fn parse_condition(&mut self) -> ParseResult<Expr> {
        let condition = self.parse_or()?;
        self.skip_whitespace();

        if self.current_char() != Some('?') {
            return Ok(condition);
        }
        self.advance();

        let then = self.parse_expression()?;
        self.skip_whitespace();
        let otherwise = if self.current_char() == Some(':') {
            self.advance();
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };

        Ok(Expr::Condition {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise,
        })
    }

    /// Parse logical OR expression
    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_and()?;

        loop {
            self.skip_whitespace();
            if !self.match_keyword("or") {
                break;
            }
            let right = self.parse_and()?;
            expr = Expr::binary(BinaryOp::Or, expr, right);
        }

        Ok(expr)
    }

    /// Parse logical AND expression
    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_comparison()?;

        loop {
            self.skip_whitespace();
            if !self.match_keyword("and") {
                break;
            }
            let right = self.parse_comparison()?;
            expr = Expr::binary(BinaryOp::And, expr, right);
        }

        Ok(expr)
    }

    /// Parse equality and ordering comparisons
    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_concat()?;

        loop {
            self.skip_whitespace();
            let op = if self.match_operator("!=") {
                BinaryOp::Ne
            } else if self.match_operator("<=") {
                BinaryOp::Le
            } else if self.match_operator(">=") {
                BinaryOp::Ge
            } else if self.match_operator("=") {
                BinaryOp::Eq
            } else if self.match_operator("<") {
                BinaryOp::Lt
            } else if self.match_operator(">") {
                BinaryOp::Gt
            } else {
                break;
            };
            let right = self.parse_concat()?;
            expr = Expr::binary(op, expr, right);
        }

        Ok(expr)
    }

    /// Parse string concatenation
    fn parse_concat(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_additive()?;

        loop {
            self.skip_whitespace();
            if !self.match_operator("&") {
                break;
            }
            let right = self.parse_additive()?;
            expr = Expr::binary(BinaryOp::Concat, expr, right);
        }

        Ok(expr)
    }

    /// Parse `+` and `-`
    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_multiplicative()?;

        loop {
            self.skip_whitespace();
            let op = if self.match_operator("+") {
                BinaryOp::Add
            } else if self.match_operator("-") {
                BinaryOp::Sub
            } else {
                break;
            };
            let right = self.parse_multiplicative()?;
            expr = Expr::binary(op, expr, right);
        }

        Ok(expr)
    }

    /// Parse `*`, `/` and `%`
    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_unary()?;

        loop {
            self.skip_whitespace();
            let op = if self.match_operator("*") {
                BinaryOp::Mul
            } else if self.match_operator("/") {
                BinaryOp::Div
            } else if self.match_operator("%") {
                BinaryOp::Mod
            } else {
                break;
            };
            let right = self.parse_unary()?;
            expr = Expr::binary(op, expr, right);
        }

        Ok(expr)
    }

    /// Parse prefix `-` and `+`
    fn parse_unary(&mut self) -> ParseResult<Expr> {
        self.skip_whitespace();

        match self.current_char() {
            Some('-') => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::unary(UnaryOp::Minus, operand))
            }
            Some('+') => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::unary(UnaryOp::Plus, operand))
            }
            _ => self.parse_primary(),
        }
    }

    /// Parse literals, paths, blocks and function calls
    fn parse_primary(&mut self) -> ParseResult<Expr> {
        self.skip_whitespace();

        match self.current_char() {
            Some('(') => self.parse_block(),
            Some('\'') | Some('"') => Ok(Expr::String(self.parse_quoted_string()?)),
            Some(ch) if ch.is_ascii_digit() => Ok(Expr::Number(self.parse_number()?)),
            Some('$') => {
                self.advance();
                let name = self.parse_identifier()?;
                self.skip_whitespace();
                if self.current_char() != Some('(') {
                    return Err(ExpressionError::Unsupported {
                        feature: format!("variable reference ${}", name),
                    });
                }
                self.advance();
                let args = self.parse_function_args()?;
                self.expect_char(')')?;
                Ok(Expr::Function { name, args })
            }
            Some('`') => {
                let first = self.parse_quoted_name()?;
                self.parse_path(first)
            }
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let ident = self.parse_identifier()?;
                match ident.as_str() {
                    "true" => Ok(Expr::Bool(true)),
                    "false" => Ok(Expr::Bool(false)),
                    "null" => Ok(Expr::Null),
                    _ => self.parse_path(ident),
                }
            }
            Some(ch) => Err(ExpressionError::syntax(
                "Unexpected character in expression",
                self.position,
                self.input,
                vec![
                    "(".to_string(),
                    "string".to_string(),
                    "number".to_string(),
                    "$function".to_string(),
                    "path".to_string(),
                ],
                ch.to_string(),
            )),
            None => Err(ExpressionError::parse(
                "Unexpected end of input",
                self.position,
                self.input,
            )),
        }
    }

    /// Parse `( expr ; expr ... )`
    fn parse_block(&mut self) -> ParseResult<Expr> {
        self.advance(); // consume '('
        let mut exprs = Vec::new();

        loop {
            self.skip_whitespace();
            if self.current_char() == Some(')') {
                break;
            }
            exprs.push(self.parse_expression()?);
            self.skip_whitespace();
            if self.current_char() == Some(';') {
                self.advance();
            } else {
                break;
            }
        }

        self.skip_whitespace();
        self.expect_char(')')?;

        // A single parenthesized expression is only grouping
        if exprs.len() == 1 {
            return Ok(exprs.remove(0));
        }
        Ok(Expr::Block(exprs))
    }

    /// Parse the remaining `.name` segments of a path
    fn parse_path(&mut self, first: String) -> ParseResult<Expr> {
        let mut segments = vec![first];

        while self.current_char() == Some('.') {
            self.advance();
            let segment = match self.current_char() {
                Some('`') => self.parse_quoted_name()?,
                _ => self.parse_identifier()?,
            };
            segments.push(segment);
        }

        Ok(Expr::Path(segments))
    }

    /// Parse function arguments up to the closing parenthesis
    fn parse_function_args(&mut self) -> ParseResult<Vec<Expr>> {
        let mut args = Vec::new();

        self.skip_whitespace();
        if self.current_char() == Some(')') {
            return Ok(args);
        }

        loop {
            args.push(self.parse_expression()?);
            self.skip_whitespace();

            if self.current_char() == Some(',') {
                self.advance();
            } else {
                break;
            }
        }

        Ok(args)
    }

    /// Parse an identifier
    fn parse_identifier(&mut self) -> ParseResult<String> {
        let mut identifier = String::new();

        if !self
            .current_char()
            .map(|c| c.is_alphabetic() || c == '_')
            .unwrap_or(false)
        {
            return Err(ExpressionError::syntax(
                "Expected identifier",
                self.position,
                self.input,
                vec!["letter or _".to_string(), "`quoted name`".to_string()],
                self.current_char()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "EOF".to_string()),
            ));
        }

        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                identifier.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        Ok(identifier)
    }

    /// Parse a backtick-quoted path segment
    fn parse_quoted_name(&mut self) -> ParseResult<String> {
        let start = self.position;
        self.advance(); // consume opening backtick

        let mut name = String::new();
        while let Some(ch) = self.advance() {
            if ch == '`' {
                return Ok(name);
            }
            name.push(ch);
        }

        Err(ExpressionError::parse(
            "Unterminated quoted name",
            start,
            self.input,
        ))
    }

    /// Parse a quoted string
    fn parse_quoted_string(&mut self) -> ParseResult<String> {
        let start = self.position;
        let quote_char = match self.advance() {
            Some(ch) => ch,
            None => {
                return Err(ExpressionError::parse(
                    "Expected string literal",
                    start,
                    self.input,
                ))
            }
        };

        let mut string = String::new();
        let mut escaped = false;

        while let Some(ch) = self.advance() {
            if escaped {
                match ch {
                    'n' => string.push('\n'),
                    'r' => string.push('\r'),
                    't' => string.push('\t'),
                    '\\' => string.push('\\'),
                    '\'' => string.push('\''),
                    '"' => string.push('"'),
                    _ => {
                        string.push('\\');
                        string.push(ch);
                    }
                }
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == quote_char {
                return Ok(string);
            } else {
                string.push(ch);
            }
        }

        Err(ExpressionError::parse(
            "Unterminated string literal",
            start,
            self.input,
        ))
    }

    /// Parse an unsigned number
    fn parse_number(&mut self) -> ParseResult<f64> {
        let start = self.position;
        let mut number_str = String::new();

        self.take_digits(&mut number_str);

        // A dot only continues the number when a digit follows it
        if self.current_char() == Some('.')
            && self.peek_char().map(|c| c.is_ascii_digit()).unwrap_or(false)
        {
            number_str.push('.');
            self.advance();
            self.take_digits(&mut number_str);
        }

        if let Some(ch) = self.current_char() {
            if ch == 'e' || ch == 'E' {
                number_str.push(ch);
                self.advance();

                if let Some(sign) = self.current_char() {
                    if sign == '+' || sign == '-' {
                        number_str.push(sign);
                        self.advance();
                    }
                }

                self.take_digits(&mut number_str);
            }
        }

        number_str.parse().map_err(|_| {
            ExpressionError::parse(format!("Invalid number: {}", number_str), start, self.input)
        })
    }

    fn take_digits(&mut self, out: &mut String) {
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                out.push(ch);
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Match and consume an operator
    fn match_operator(&mut self, op: &str) -> bool {
        let remaining: String = self.chars.clone().take(op.chars().count()).collect();
        if remaining == op {
            for _ in op.chars() {
                self.advance();
            }
            true
        } else {
            false
        }
    }

    /// Match and consume a word operator not followed by a name character
    fn match_keyword(&mut self, word: &str) -> bool {
        let mut lookahead = self.chars.clone();
        for expected in word.chars() {
            if lookahead.next() != Some(expected) {
                return false;
            }
        }
        if lookahead
            .peek()
            .map(|c| c.is_alphanumeric() || *c == '_')
            .unwrap_or(false)
        {
            return false;
        }
        self.match_operator(word)
    }

    /// Skip whitespace characters
    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Get current character without advancing
    fn current_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// Get next character without advancing
    fn peek_char(&mut self) -> Option<char> {
        let mut clone = self.chars.clone();
        clone.next();
        clone.peek().copied()
    }

    /// Advance to next character
    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        self.position += ch.len_utf8();
        Some(ch)
    }

    /// Expect a specific character
    fn expect_char(&mut self, expected: char) -> ParseResult<()> {
        match self.current_char() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(ExpressionError::syntax(
                format!("Expected '{}'", expected),
                self.position,
                self.input,
                vec![expected.to_string()],
                ch.to_string(),
            )),
            None => Err(ExpressionError::parse(
                format!("Expected '{}' but reached end of input", expected),
                self.position,
                self.input,
            )),
        }
    }
}
