//! Slice filter - a boolean predicate over cell coordinates.
//!
//! User text is never evaluated as code. An expression goes through:
//! 1. a character whitelist (`x y z`, digits, `.`, whitespace and
//!    `+ - * / % < > = ! & | ( )`), checked before anything else
//! 2. a logos tokenizer
//! 3. a Pratt parser with JavaScript operator precedence, bounded in depth
//! 4. compilation into a closure tree over `(x, y, z)`
//! 5. a smoke evaluation at the origin
//!
//! Evaluation follows JavaScript coercion: booleans count as 1/0 in numeric
//! contexts, `&&`/`||` yield one of their operands, and `===`/`!==` compare
//! without coercion. Every well-formed expression therefore evaluates; only
//! the whitelist and the parser reject input.
//!
//! The filter only decides visibility; it never touches counts.

use crate::catalog::CellCoord;
use crate::error::SliceError;
use logos::Logos;
use std::sync::Arc;
use tracing::debug;

fn allowed(c: char) -> bool {
    c.is_whitespace() || c.is_ascii_digit() || "xyz<>=!&|()%/*+.-".contains(c)
}

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum Token {
    #[token("x")]
    X,
    #[token("y")]
    Y,
    #[token("z")]
    Z,
    #[regex(r"[0-9]+(\.[0-9]*)?|\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("==")]
    Eq,
    #[token("!=")]
    Ne,
    #[token("===")]
    StrictEq,
    #[token("!==")]
    StrictNe,
    #[token("&&")]
    And,
    #[token("||")]
    Or,
    #[token("!")]
    Not,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
    Z,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnaryOp {
    Neg,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    And,
    Or,
}

impl BinaryOp {
    fn from_token(token: Token) -> Option<Self> {
        Some(match token {
            Token::Plus => BinaryOp::Add,
            Token::Minus => BinaryOp::Sub,
            Token::Star => BinaryOp::Mul,
            Token::Slash => BinaryOp::Div,
            Token::Percent => BinaryOp::Rem,
            Token::Lt => BinaryOp::Lt,
            Token::Gt => BinaryOp::Gt,
            Token::Le => BinaryOp::Le,
            Token::Ge => BinaryOp::Ge,
            Token::Eq => BinaryOp::Eq,
            Token::Ne => BinaryOp::Ne,
            Token::StrictEq => BinaryOp::StrictEq,
            Token::StrictNe => BinaryOp::StrictNe,
            Token::And => BinaryOp::And,
            Token::Or => BinaryOp::Or,
            _ => return None,
        })
    }

    /// Left binding power; all binary operators are left-associative.
    fn binding_power(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::StrictEq | BinaryOp::StrictNe => 3,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 6,
        }
    }
}

const PREFIX_BP: u8 = 7;

/// Bound on parenthesis/prefix nesting and on expression tree depth.
const MAX_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Var(Axis),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

/// Result of evaluating a sub-expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SliceValue {
    Number(f64),
    Bool(bool),
}

impl SliceValue {
    /// Non-zero, non-NaN numbers and `true` are truthy.
    pub fn truthy(self) -> bool {
        match self {
            SliceValue::Number(n) => n != 0.0 && !n.is_nan(),
            SliceValue::Bool(b) => b,
        }
    }

    /// Numeric value; `true` is 1 and `false` is 0.
    pub fn as_number(self) -> f64 {
        match self {
            SliceValue::Number(n) => n,
            SliceValue::Bool(b) => f64::from(u8::from(b)),
        }
    }

    fn strict_eq(self, other: SliceValue) -> bool {
        match (self, other) {
            (SliceValue::Number(a), SliceValue::Number(b)) => a == b,
            (SliceValue::Bool(a), SliceValue::Bool(b)) => a == b,
            _ => false,
        }
    }
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    len: usize,
    /// Open parentheses and prefix operators around the current position
    nesting: usize,
}

fn too_deep() -> SliceError {
    SliceError::Syntax("expression nested too deeply".to_string())
}

impl Parser {
    fn tokenize(source: &str) -> Result<Self, SliceError> {
        let mut tokens = Vec::new();
        let mut lexer = Token::lexer(source);
        while let Some(token) = lexer.next() {
            match token {
                Ok(token) => tokens.push((token, lexer.span().start)),
                Err(()) => {
                    return Err(SliceError::Syntax(format!(
                        "unexpected {:?} at {}",
                        lexer.slice(),
                        lexer.span().start
                    )))
                }
            }
        }
        Ok(Self {
            tokens,
            pos: 0,
            len: source.len(),
            nesting: 0,
        })
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).map(|(t, _)| *t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|(_, at)| *at).unwrap_or(self.len)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Parses an expression; also returns the depth of its tree.
    fn expr(&mut self, min_bp: u8) -> Result<(Expr, usize), SliceError> {
        let (mut lhs, mut depth) = self.prefix()?;
        while let Some(op) = self.peek().and_then(BinaryOp::from_token) {
            let bp = op.binding_power();
            if bp <= min_bp {
                break;
            }
            self.advance();
            let (rhs, rhs_depth) = self.expr(bp)?;
            depth = 1 + depth.max(rhs_depth);
            if depth > MAX_DEPTH {
                return Err(too_deep());
            }
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok((lhs, depth))
    }

    fn nested(&mut self, min_bp: u8) -> Result<(Expr, usize), SliceError> {
        self.nesting += 1;
        if self.nesting > MAX_DEPTH {
            return Err(too_deep());
        }
        let inner = self.expr(min_bp);
        self.nesting -= 1;
        inner
    }

    fn unary(&mut self, op: UnaryOp) -> Result<(Expr, usize), SliceError> {
        let (inner, depth) = self.nested(PREFIX_BP)?;
        if depth + 1 > MAX_DEPTH {
            return Err(too_deep());
        }
        Ok((Expr::Unary(op, Box::new(inner)), depth + 1))
    }

    fn prefix(&mut self) -> Result<(Expr, usize), SliceError> {
        let at = self.offset();
        match self.advance() {
            Some(Token::Number(n)) => Ok((Expr::Number(n), 1)),
            Some(Token::X) => Ok((Expr::Var(Axis::X), 1)),
            Some(Token::Y) => Ok((Expr::Var(Axis::Y), 1)),
            Some(Token::Z) => Ok((Expr::Var(Axis::Z), 1)),
            Some(Token::Minus) => self.unary(UnaryOp::Neg),
            Some(Token::Plus) => self.unary(UnaryOp::Plus),
            Some(Token::Not) => self.unary(UnaryOp::Not),
            Some(Token::LParen) => {
                let inner = self.nested(0)?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(SliceError::Syntax(format!("expected ')' at {}", at))),
                }
            }
            Some(token) => Err(SliceError::Syntax(format!("unexpected {:?} at {}", token, at))),
            None => Err(SliceError::Syntax("unexpected end of expression".to_string())),
        }
    }

    fn parse(mut self) -> Result<Expr, SliceError> {
        let (expr, _) = self.expr(0)?;
        match self.peek() {
            None => Ok(expr),
            Some(token) => Err(SliceError::Syntax(format!(
                "unexpected {:?} at {}",
                token,
                self.offset()
            ))),
        }
    }
}

type Compiled = Arc<dyn Fn(CellCoord) -> SliceValue + Send + Sync>;

fn node(f: impl Fn(CellCoord) -> SliceValue + Send + Sync + 'static) -> Compiled {
    Arc::new(f)
}

fn compile(expr: Expr) -> Compiled {
    match expr {
        Expr::Number(n) => node(move |_| SliceValue::Number(n)),
        Expr::Var(axis) => node(move |c| {
            let v = match axis {
                Axis::X => c.x,
                Axis::Y => c.y,
                Axis::Z => c.z,
            };
            SliceValue::Number(f64::from(v))
        }),
        Expr::Unary(op, inner) => {
            let inner = compile(*inner);
            node(move |c| {
                let v = inner(c);
                match op {
                    UnaryOp::Neg => SliceValue::Number(-v.as_number()),
                    UnaryOp::Plus => SliceValue::Number(v.as_number()),
                    UnaryOp::Not => SliceValue::Bool(!v.truthy()),
                }
            })
        }
        Expr::Binary(op, lhs, rhs) => {
            let (lhs, rhs) = (compile(*lhs), compile(*rhs));
            node(move |c| binary(op, lhs(c), rhs(c)))
        }
    }
}

fn binary(op: BinaryOp, l: SliceValue, r: SliceValue) -> SliceValue {
    use SliceValue::{Bool, Number};
    let (a, b) = (l.as_number(), r.as_number());
    match op {
        BinaryOp::Eq => Bool(a == b),
        BinaryOp::Ne => Bool(a != b),
        BinaryOp::StrictEq => Bool(l.strict_eq(r)),
        BinaryOp::StrictNe => Bool(!l.strict_eq(r)),
        BinaryOp::Lt => Bool(a < b),
        BinaryOp::Gt => Bool(a > b),
        BinaryOp::Le => Bool(a <= b),
        BinaryOp::Ge => Bool(a >= b),
        BinaryOp::Add => Number(a + b),
        BinaryOp::Sub => Number(a - b),
        BinaryOp::Mul => Number(a * b),
        BinaryOp::Div => Number(a / b),
        BinaryOp::Rem => Number(a % b),
        BinaryOp::And => {
            if l.truthy() {
                r
            } else {
                l
            }
        }
        BinaryOp::Or => {
            if l.truthy() {
                l
            } else {
                r
            }
        }
    }
}

/// A compiled slice predicate.
#[derive(Clone)]
pub struct SliceFilter {
    expression: String,
    eval: Compiled,
}

impl SliceFilter {
    /// Compiles an expression over `x`, `y`, `z`.
    ///
    /// Returns `Ok(None)` for an empty expression, meaning "no filter".
    pub fn compile(expression: &str) -> Result<Option<Self>, SliceError> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Ok(None);
        }
        if let Some(c) = expression.chars().find(|c| !allowed(*c)) {
            return Err(SliceError::DisallowedCharacter(c));
        }

        let ast = Parser::tokenize(expression)?.parse()?;
        let filter = Self {
            expression: expression.to_string(),
            eval: compile(ast),
        };
        debug!("Slice {:?} at origin: {:?}", filter.expression, filter.evaluate(CellCoord::ORIGIN));
        Ok(Some(filter))
    }

    /// Source text of the expression.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Raw evaluation result at a coordinate.
    pub fn evaluate(&self, coord: CellCoord) -> SliceValue {
        (self.eval)(coord)
    }

    /// Whether a cell at `coord` is visible.
    pub fn matches(&self, coord: CellCoord) -> bool {
        self.evaluate(coord).truthy()
    }
}

impl std::fmt::Debug for SliceFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SliceFilter")
            .field("expression", &self.expression)
            .finish()
    }
}
