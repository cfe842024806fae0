//! Restricted arithmetic evaluator used by the `calculate` tool.
//!
//! Input is tokenized, parsed into a tree that can only hold numbers, unary
//! signs and the four arithmetic operators plus exponentiation, and then
//! evaluated by walking that tree. Nothing else is ever interpreted.

use thiserror::Error;

const MAX_EXPRESSION_LENGTH: usize = 1000;
const MAX_NESTING_DEPTH: usize = 64;
const MAX_EXPONENT: f64 = 1000.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("Invalid syntax: {0}")]
    Syntax(String),

    #[error("Unsupported expression: {0} is not allowed")]
    ForbiddenConstruct(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("{0}")]
    ResourceExceeded(String),

    #[error("Result is too large")]
    Overflow,

    #[error("Result is not a real number")]
    ComplexResult,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Power,
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(value) => format!("number {}", value),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::Power => "'**'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum UnaryOp {
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

fn forbidden(what: impl Into<String>) -> EvalError {
    EvalError::ForbiddenConstruct(what.into())
}

fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let next = chars.get(i + 1).copied();
        match ch {
            c if c.is_whitespace() => i += 1,
            '.' if !next.is_some_and(|c| c.is_ascii_digit()) => {
                return Err(forbidden("attribute access"));
            }
            '0'..='9' | '.' => {
                let (value, end) = scan_number(&chars, i)?;
                tokens.push(Token::Number(value));
                i = end;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' if next == Some('*') => {
                tokens.push(Token::Power);
                i += 2;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Power);
                i += 1;
            }
            '/' if next == Some('/') => return Err(forbidden("floor division '//'")),
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            c if c.is_alphabetic() || c == '_' => {
                let name: String = chars[i..]
                    .iter()
                    .take_while(|c| c.is_alphanumeric() || **c == '_')
                    .collect();
                return Err(forbidden(format!("name '{}'", name)));
            }
            '\'' | '"' => return Err(forbidden("string literal")),
            '%' => return Err(forbidden("modulo operator '%'")),
            '[' | ']' | '{' | '}' | ',' => return Err(forbidden("collection or subscript")),
            '=' | '<' | '>' | '!' => return Err(forbidden("comparison or assignment")),
            '&' | '|' | '~' | '@' => return Err(forbidden(format!("operator '{}'", ch))),
            other => {
                return Err(EvalError::Syntax(format!(
                    "unexpected character '{}'",
                    other
                )))
            }
        }
    }

    Ok(tokens)
}

/// Scans `digits ['.' digits] [exponent]` or `'.' digits` starting at `start`
fn scan_number(chars: &[char], start: usize) -> Result<(f64, usize), EvalError> {
    let len = chars.len();
    let mut end = start;

    while end < len && chars[end].is_ascii_digit() {
        end += 1;
    }
    if end < len && chars[end] == '.' {
        end += 1;
        while end < len && chars[end].is_ascii_digit() {
            end += 1;
        }
    }
    // An 'e' only belongs to the number when digits follow it
    if end < len && (chars[end] == 'e' || chars[end] == 'E') {
        let mut exp_end = end + 1;
        if exp_end < len && (chars[exp_end] == '+' || chars[exp_end] == '-') {
            exp_end += 1;
        }
        if exp_end < len && chars[exp_end].is_ascii_digit() {
            while exp_end < len && chars[exp_end].is_ascii_digit() {
                exp_end += 1;
            }
            end = exp_end;
        }
    }

    let text: String = chars[start..end].iter().collect();
    text.parse::<f64>()
        .map(|value| (value, end))
        .map_err(|_| EvalError::Syntax(format!("invalid number '{}'", text)))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

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

    fn parse(mut self) -> Result<Expr, EvalError> {
        let expr = self.parse_expr()?;
        match self.peek() {
            None => Ok(expr),
            Some(Token::RParen) => Err(EvalError::Syntax("unbalanced parentheses".to_string())),
            Some(Token::Number(_)) | Some(Token::LParen) => Err(EvalError::Syntax(
                "missing operator between operands".to_string(),
            )),
            Some(token) => Err(EvalError::Syntax(format!(
                "unexpected {}",
                token.describe()
            ))),
        }
    }

    // expr := term (('+' | '-') term)*
    fn parse_expr(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_term()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    // term := unary (('*' | '/') unary)*
    fn parse_term(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    // unary := ('+' | '-') unary | power
    fn parse_unary(&mut self) -> Result<Expr, EvalError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(EvalError::ResourceExceeded(format!(
                "Expression nested too deeply (max {})",
                MAX_NESTING_DEPTH
            )));
        }

        let op = match self.peek() {
            Some(Token::Plus) => Some(UnaryOp::Plus),
            Some(Token::Minus) => Some(UnaryOp::Minus),
            _ => None,
        };
        let expr = match op {
            Some(op) => {
                self.advance();
                let operand = self.parse_unary()?;
                Expr::Unary {
                    op,
                    operand: Box::new(operand),
                }
            }
            None => self.parse_power()?,
        };

        self.depth -= 1;
        Ok(expr)
    }

    // power := atom ('**' unary)?, right-associative through the unary operand
    fn parse_power(&mut self) -> Result<Expr, EvalError> {
        let base = self.parse_atom()?;
        if self.peek() != Some(Token::Power) {
            return Ok(base);
        }
        self.advance();
        let exponent = self.parse_unary()?;
        Ok(Expr::Binary {
            op: BinaryOp::Pow,
            left: Box::new(base),
            right: Box::new(exponent),
        })
    }

    // atom := NUMBER | '(' expr ')'
    fn parse_atom(&mut self) -> Result<Expr, EvalError> {
        match self.advance() {
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(EvalError::Syntax("unbalanced parentheses".to_string())),
                }
            }
            Some(token) => Err(EvalError::Syntax(format!(
                "unexpected {}",
                token.describe()
            ))),
            None => Err(EvalError::Syntax(
                "unexpected end of expression".to_string(),
            )),
        }
    }
}

fn checked(value: f64) -> Result<f64, EvalError> {
    if value.is_nan() {
        Err(EvalError::ComplexResult)
    } else if value.is_infinite() {
        Err(EvalError::Overflow)
    } else {
        Ok(value)
    }
}

fn eval(expr: &Expr) -> Result<f64, EvalError> {
    match expr {
        Expr::Number(value) => checked(*value),
        Expr::Unary { op, operand } => {
            let value = eval(operand)?;
            Ok(match op {
                UnaryOp::Plus => value,
                UnaryOp::Minus => -value,
            })
        }
        Expr::Binary { op, left, right } => {
            let left = eval(left)?;
            let right = eval(right)?;
            let value = match op {
                BinaryOp::Add => left + right,
                BinaryOp::Sub => left - right,
                BinaryOp::Mul => left * right,
                BinaryOp::Div => {
                    if right == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    left / right
                }
                BinaryOp::Pow => {
                    if right.abs() > MAX_EXPONENT {
                        return Err(EvalError::ResourceExceeded(format!(
                            "Exponent too large (max {})",
                            MAX_EXPONENT
                        )));
                    }
                    if left == 0.0 && right < 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    left.powf(right)
                }
            };
            checked(value)
        }
    }
}

/// Evaluates arithmetic expressions without interpreting anything else
#[derive(Debug, Default, Clone)]
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(&self, expression: &str) -> Result<f64, EvalError> {
        if expression.trim().is_empty() {
            return Err(EvalError::Syntax("empty expression".to_string()));
        }
        if expression.chars().count() > MAX_EXPRESSION_LENGTH {
            return Err(EvalError::ResourceExceeded(format!(
                "Expression too long (max {} characters)",
                MAX_EXPRESSION_LENGTH
            )));
        }

        let tokens = tokenize(expression)?;
        let tree = Parser::new(tokens).parse()?;
        eval(&tree)
    }
}
