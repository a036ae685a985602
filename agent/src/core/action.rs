//! Closed set of actions the executor is allowed to perform.
//!
//! Planner output is untrusted model text. It is classified into one of the
//! [`Action`] variants and never executed as code. Arithmetic expressions are
//! evaluated by a small recursive-descent evaluator; everything else is
//! recorded as done.

use std::fmt;

/// Prefix the planner uses when the completion call failed.
pub const PLANNER_ERROR_PREFIX: &str = "Error generating task:";

/// Longest token sequence accepted as an arithmetic expression. Bounds the
/// height of left-leaning operator chains.
pub const MAX_EXPR_TOKENS: usize = 256;

/// Deepest nesting of parentheses and unary signs accepted.
pub const MAX_EXPR_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A pure arithmetic expression such as `(2 + 3) * 4`.
    Arithmetic(Expr),
    /// The planner could not produce a task; carries its error message.
    Failed(String),
    /// Free-form subtask text, recorded without execution.
    Record(String),
}

/// Outcome of performing an action. `Err` holds a human-readable reason.
pub type ActionOutcome = Result<String, String>;

impl Action {
    /// Classify task text into an action.
    pub fn classify(task: &str) -> Self {
        let trimmed = task.trim();
        if let Some(message) = trimmed.strip_prefix(PLANNER_ERROR_PREFIX) {
            return Action::Failed(message.trim().to_string());
        }
        match parse_expr(trimmed) {
            Some(expr) => Action::Arithmetic(expr),
            None => Action::Record(trimmed.to_string()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Action::Arithmetic(_) => "arithmetic",
            Action::Failed(_) => "failed",
            Action::Record(_) => "record",
        }
    }

    pub fn perform(&self) -> ActionOutcome {
        match self {
            Action::Arithmetic(expr) => expr.eval().map(format_number).map_err(|e| e.to_string()),
            Action::Failed(message) => Err(format!("planner failed: {message}")),
            Action::Record(text) => Ok(format!("Recorded: {text}")),
        }
    }
}

/// Parsed arithmetic expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Neg(Box<Expr>),
    Binary(Box<Expr>, BinOp, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    DivisionByZero,
    NotFinite,
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::DivisionByZero => f.write_str("division by zero"),
            EvalError::NotFinite => f.write_str("result is not a finite number"),
        }
    }
}

impl Expr {
    pub fn eval(&self) -> Result<f64, EvalError> {
        let value = match self {
            Expr::Number(n) => *n,
            Expr::Neg(inner) => -inner.eval()?,
            Expr::Binary(lhs, op, rhs) => {
                let (a, b) = (lhs.eval()?, rhs.eval()?);
                match op {
                    BinOp::Add => a + b,
                    BinOp::Sub => a - b,
                    BinOp::Mul => a * b,
                    BinOp::Div | BinOp::Rem if b == 0.0 => {
                        return Err(EvalError::DivisionByZero);
                    }
                    BinOp::Div => a / b,
                    BinOp::Rem => a % b,
                }
            }
        };
        if !value.is_finite() {
            return Err(EvalError::NotFinite);
        }
        Ok(value)
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Op(BinOp),
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Option<Vec<Token>> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if tokens.len() > MAX_EXPR_TOKENS {
            return None;
        }
        let c = bytes[i];
        match c {
            b' ' | b'\t' | b'\n' | b'\r' => i += 1,
            b'0'..=b'9' | b'.' => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                let value: f64 = input[start..i].parse().ok()?;
                tokens.push(Token::Num(value));
            }
            b'+' | b'-' | b'*' | b'/' | b'%' => {
                let op = match c {
                    b'+' => BinOp::Add,
                    b'-' => BinOp::Sub,
                    b'*' => BinOp::Mul,
                    b'/' => BinOp::Div,
                    _ => BinOp::Rem,
                };
                tokens.push(Token::Op(op));
                i += 1;
            }
            b'(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            b')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            _ => return None,
        }
    }
    Some(tokens)
}

/// Parse `input` as an arithmetic expression. Returns `None` unless the whole
/// input is a well-formed expression containing at least one number and stays
/// within [`MAX_EXPR_TOKENS`] and [`MAX_EXPR_DEPTH`].
pub fn parse_expr(input: &str) -> Option<Expr> {
    let tokens = tokenize(input)?;
    if tokens.len() > MAX_EXPR_TOKENS || !tokens.iter().any(|t| matches!(t, Token::Num(_))) {
        return None;
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expr()?;
    (parser.pos == parser.tokens.len()).then_some(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> Option<Expr> {
        let mut lhs = self.term()?;
        while let Some(Token::Op(op @ (BinOp::Add | BinOp::Sub))) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary(Box::new(lhs), op, Box::new(rhs));
        }
        Some(lhs)
    }

    fn term(&mut self) -> Option<Expr> {
        let mut lhs = self.factor()?;
        while let Some(Token::Op(op @ (BinOp::Mul | BinOp::Div | BinOp::Rem))) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            lhs = Expr::Binary(Box::new(lhs), op, Box::new(rhs));
        }
        Some(lhs)
    }

    fn factor(&mut self) -> Option<Expr> {
        if self.depth >= MAX_EXPR_DEPTH {
            return None;
        }
        self.depth += 1;
        let expr = self.nested_factor();
        self.depth -= 1;
        expr
    }

    fn nested_factor(&mut self) -> Option<Expr> {
        match self.next()? {
            Token::Op(BinOp::Sub) => Some(Expr::Neg(Box::new(self.factor()?))),
            Token::Op(BinOp::Add) => self.factor(),
            Token::Num(n) => Some(Expr::Number(n)),
            Token::LParen => {
                let inner = self.expr()?;
                match self.next()? {
                    Token::RParen => Some(inner),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(task: &str) -> ActionOutcome {
        Action::classify(task).perform()
    }

    #[test]
    fn evaluates_arithmetic_with_precedence() {
        assert_eq!(run("2 + 3 * 4"), Ok("14".to_string()));
        assert_eq!(run("(2 + 3) * 4"), Ok("20".to_string()));
        assert_eq!(run("-(1 - 4) % 2"), Ok("1".to_string()));
        assert_eq!(run("7 / 2"), Ok("3.5".to_string()));
    }

    #[test]
    fn division_by_zero_is_an_error_outcome() {
        assert_eq!(run("1 / (2 - 2)"), Err("division by zero".to_string()));
    }

    #[test]
    fn prose_is_recorded_not_executed() {
        let action = Action::classify("Draft three haiku themes");
        assert_eq!(action.kind(), "record");
        assert_eq!(
            action.perform(),
            Ok("Recorded: Draft three haiku themes".to_string())
        );
    }

    #[test]
    fn code_like_text_is_recorded() {
        let action = Action::classify("__import__('os').system('rm -rf /')");
        assert_eq!(action.kind(), "record");
    }

    #[test]
    fn malformed_expressions_fall_back_to_record() {
        assert_eq!(Action::classify("1 +").kind(), "record");
        assert_eq!(Action::classify("(1 + 2").kind(), "record");
        assert_eq!(Action::classify("1.2.3").kind(), "record");
        assert_eq!(Action::classify("()").kind(), "record");
    }

    #[test]
    fn deep_nesting_is_recorded_without_evaluation() {
        let parens = format!("{}1", "(".repeat(100_000));
        assert_eq!(Action::classify(&parens).kind(), "record");
        let negations = format!("{}1", "-".repeat(100_000));
        assert_eq!(Action::classify(&negations).kind(), "record");
        let chain = vec!["1"; 100_000].join(" + ");
        assert_eq!(Action::classify(&chain).kind(), "record");
    }

    #[test]
    fn nesting_within_limits_still_evaluates() {
        let depth = MAX_EXPR_DEPTH - 1;
        let nested = format!("{}7{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(run(&nested), Ok("7".to_string()));
        assert_eq!(run("--3"), Ok("3".to_string()));
    }

    #[test]
    fn planner_errors_are_failed_actions() {
        let action = Action::classify("Error generating task: request timed out");
        assert_eq!(action, Action::Failed("request timed out".to_string()));
        assert_eq!(
            action.perform(),
            Err("planner failed: request timed out".to_string())
        );
    }
}
