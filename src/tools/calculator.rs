//! Arithmetic calculator tool.
//!
//! Input text is never handed to a general-purpose evaluator. It passes a
//! character allow-list, is tokenized, then parsed by a small recursive-descent
//! parser with the usual precedence:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '//') unary)*
//! unary   := ('+' | '-') unary | power
//! power   := primary ('**' unary)?
//! primary := number | '(' expr ')'
//! ```

use crate::tools::registry::Tool;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Nesting limit for parentheses and chained unary operators.
const MAX_DEPTH: usize = 64;

pub const INVALID_CHARACTERS_MESSAGE: &str = "Error: Invalid characters in expression. Only numbers and basic operators (+, -, *, /, parentheses) are allowed.";
pub const DIVISION_BY_ZERO_MESSAGE: &str = "Error: Division by zero";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalcError {
    #[error("invalid character '{0}'")]
    InvalidCharacter(char),

    #[error("division by zero")]
    DivisionByZero,

    #[error("{0}")]
    Syntax(String),

    #[error("result is not a finite number")]
    NonFinite,
}

pub struct Calculator;

#[async_trait]
impl Tool for Calculator {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Evaluate a mathematical expression (e.g. \"2 + 2\", \"10 * 5\"). Supports + - * / ** //, parentheses and decimals."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "A mathematical expression to evaluate"
                }
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let expression = args
            .get("expression")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::InvalidInput("Missing 'expression' parameter".to_string()))?;

        Ok(calculate(expression))
    }
}

/// Evaluate `expression` and render the tool's reply text.
///
/// Every failure is reported in the returned string.
pub fn calculate(expression: &str) -> String {
    match evaluate(expression) {
        Ok(value) => format!("Result: {} = {}", expression, value),
        Err(CalcError::InvalidCharacter(_)) => INVALID_CHARACTERS_MESSAGE.to_string(),
        Err(CalcError::DivisionByZero) => DIVISION_BY_ZERO_MESSAGE.to_string(),
        Err(e) => format!("Error: Could not evaluate expression. {}", e),
    }
}

/// A calculator value.
///
/// Integer literals stay exact through `+ - * // **` and turn into floats when
/// the result no longer fits. `/` and any float operand always give a float.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i128),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Number::Int(i) => i == 0,
            Number::Float(f) => f == 0.0,
        }
    }

    fn neg(self) -> Number {
        match self {
            Number::Int(i) => i.checked_neg().map_or(Number::Float(-(i as f64)), Number::Int),
            Number::Float(f) => Number::Float(-f),
        }
    }

    fn add(self, rhs: Number) -> Number {
        int_or_float(self, rhs, i128::checked_add, |a, b| a + b)
    }

    fn sub(self, rhs: Number) -> Number {
        int_or_float(self, rhs, i128::checked_sub, |a, b| a - b)
    }

    fn mul(self, rhs: Number) -> Number {
        int_or_float(self, rhs, i128::checked_mul, |a, b| a * b)
    }

    fn div(self, rhs: Number) -> std::result::Result<Number, CalcError> {
        if rhs.is_zero() {
            return Err(CalcError::DivisionByZero);
        }
        Ok(Number::Float(self.as_f64() / rhs.as_f64()))
    }

    fn floor_div(self, rhs: Number) -> std::result::Result<Number, CalcError> {
        if rhs.is_zero() {
            return Err(CalcError::DivisionByZero);
        }
        Ok(int_or_float(self, rhs, checked_floor_div, |a, b| (a / b).floor()))
    }

    fn pow(self, exponent: Number) -> std::result::Result<Number, CalcError> {
        if self.is_zero() && exponent.as_f64() < 0.0 {
            return Err(CalcError::DivisionByZero);
        }
        if let (Number::Int(base), Number::Int(exp)) = (self, exponent) {
            if exp >= 0 {
                let exact = u32::try_from(exp).ok().and_then(|e| base.checked_pow(e));
                if let Some(value) = exact {
                    return Ok(Number::Int(value));
                }
            }
        }
        Ok(Number::Float(self.as_f64().powf(exponent.as_f64())))
    }
}

fn int_or_float(
    lhs: Number,
    rhs: Number,
    int_op: fn(i128, i128) -> Option<i128>,
    float_op: fn(f64, f64) -> f64,
) -> Number {
    if let (Number::Int(a), Number::Int(b)) = (lhs, rhs) {
        if let Some(value) = int_op(a, b) {
            return Number::Int(value);
        }
    }
    Number::Float(float_op(lhs.as_f64(), rhs.as_f64()))
}

fn checked_floor_div(a: i128, b: i128) -> Option<i128> {
    let q = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

/// Floats always carry a fractional part or an exponent, so `10 / 2` reads `5.0`.
impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(x) => {
                let magnitude = x.abs();
                if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
                    write!(f, "{}", scientific(x))
                } else if x.fract() == 0.0 {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{}", x)
                }
            }
        }
    }
}

/// `1e16` renders as `1e+16` and `1e-5` as `1e-05`.
fn scientific(x: f64) -> String {
    let rendered = format!("{:e}", x);
    match rendered.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exp),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => rendered,
    }
}

/// Parse and evaluate an arithmetic expression.
pub fn evaluate(expression: &str) -> std::result::Result<Number, CalcError> {
    if let Some(bad) = expression.chars().find(|c| !is_allowed(*c)) {
        return Err(CalcError::InvalidCharacter(bad));
    }

    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(CalcError::Syntax("empty expression".to_string()));
    }

    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if let Some(token) = parser.peek() {
        return Err(CalcError::Syntax(format!("unexpected {}", token)));
    }
    if !value.as_f64().is_finite() {
        return Err(CalcError::NonFinite);
    }
    Ok(value)
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_digit() || "+-*/().".contains(c) || c.is_whitespace()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(Number),
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,
    LParen,
    RParen,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Num(n) => write!(f, "number {}", n),
            Token::Plus => write!(f, "'+'"),
            Token::Minus => write!(f, "'-'"),
            Token::Star => write!(f, "'*'"),
            Token::StarStar => write!(f, "'**'"),
            Token::Slash => write!(f, "'/'"),
            Token::SlashSlash => write!(f, "'//'"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
        }
    }
}

fn parse_literal(literal: &str) -> std::result::Result<Number, CalcError> {
    let invalid = || CalcError::Syntax(format!("invalid number '{}'", literal));
    if literal.contains('.') {
        return literal.parse::<f64>().map(Number::Float).map_err(|_| invalid());
    }
    match literal.parse::<i128>() {
        Ok(value) => Ok(Number::Int(value)),
        Err(_) => literal.parse::<f64>().map(Number::Float).map_err(|_| invalid()),
    }
}

fn tokenize(input: &str) -> std::result::Result<Vec<Token>, CalcError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                tokens.push(Token::Num(parse_literal(&literal)?));
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    tokens.push(Token::StarStar);
                    i += 2;
                } else {
                    tokens.push(Token::Star);
                    i += 1;
                }
            }
            '/' => {
                if chars.get(i + 1) == Some(&'/') {
                    tokens.push(Token::SlashSlash);
                    i += 2;
                } else {
                    tokens.push(Token::Slash);
                    i += 1;
                }
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            other => return Err(CalcError::InvalidCharacter(other)),
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn enter(&mut self) -> std::result::Result<(), CalcError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CalcError::Syntax("expression nested too deeply".to_string()));
        }
        Ok(())
    }

    fn expr(&mut self) -> std::result::Result<Number, CalcError> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.advance();
            let rhs = self.term()?;
            value = if op == Token::Plus {
                value.add(rhs)
            } else {
                value.sub(rhs)
            };
        }
        Ok(value)
    }

    fn term(&mut self) -> std::result::Result<Number, CalcError> {
        let mut value = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash | Token::SlashSlash)) = self.peek() {
            self.advance();
            let rhs = self.unary()?;
            value = match op {
                Token::Star => value.mul(rhs),
                Token::Slash => value.div(rhs)?,
                _ => value.floor_div(rhs)?,
            };
        }
        Ok(value)
    }

    fn unary(&mut self) -> std::result::Result<Number, CalcError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                self.enter()?;
                let value = self.unary()?.neg();
                self.depth -= 1;
                Ok(value)
            }
            Some(Token::Plus) => {
                self.advance();
                self.enter()?;
                let value = self.unary()?;
                self.depth -= 1;
                Ok(value)
            }
            _ => self.power(),
        }
    }

    // Right-associative, and binds tighter than a unary sign on its left.
    fn power(&mut self) -> std::result::Result<Number, CalcError> {
        let base = self.primary()?;
        if self.peek() == Some(Token::StarStar) {
            self.advance();
            self.enter()?;
            let exponent = self.unary()?;
            self.depth -= 1;
            return base.pow(exponent);
        }
        Ok(base)
    }

    fn primary(&mut self) -> std::result::Result<Number, CalcError> {
        match self.advance() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                self.enter()?;
                let value = self.expr()?;
                self.depth -= 1;
                match self.advance() {
                    Some(Token::RParen) => Ok(value),
                    Some(other) => Err(CalcError::Syntax(format!(
                        "expected ')' but found {}",
                        other
                    ))),
                    None => Err(CalcError::Syntax("missing closing ')'".to_string())),
                }
            }
            Some(other) => Err(CalcError::Syntax(format!("unexpected {}", other))),
            None => Err(CalcError::Syntax("unexpected end of expression".to_string())),
        }
    }
}
