//! Small boolean/arithmetic expression language.
//!
//! Used in two places: per-row cross-field consistency rules (identifiers
//! resolve to the row's column values) and standard-level custom rules
//! (identifiers resolve to report scores). An expression is parsed once
//! and evaluated many times against a resolver closure.
//!
//! Grammar (precedence low to high): `or` < `and` < `not` < comparison
//! < `+ -` < `* /` < unary minus. `&&`, `||`, `!` are accepted as
//! synonyms. String literals use single or double quotes.

use crate::error::ExprError;

/// A runtime value an identifier can resolve to.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Num(_) => "number",
            Value::Str(_) => "string",
        }
    }
}

/// A parsed expression, ready for repeated evaluation.
#[derive(Debug, Clone)]
pub struct Expr {
    root: Node,
    source: String,
}

#[derive(Debug, Clone)]
enum Node {
    Literal(Value),
    Ident(String),
    Unary(UnaryOp, Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl Expr {
    /// Parse an expression from source text.
    pub fn parse(source: &str) -> Result<Self, ExprError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser { tokens, pos: 0 };
        let root = parser.parse_or()?;
        if parser.pos != parser.tokens.len() {
            let (offset, _) = parser.tokens[parser.pos].clone();
            return Err(ExprError::Parse {
                offset,
                message: "unexpected trailing input".to_string(),
            });
        }
        Ok(Self {
            root,
            source: source.to_string(),
        })
    }

    /// The original source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against a resolver mapping identifiers to values.
    /// An unknown identifier or a `Null` operand is an error; callers
    /// treat that as row-level non-conformity rather than a fault.
    pub fn eval<F>(&self, resolve: &F) -> Result<Value, ExprError>
    where
        F: Fn(&str) -> Option<Value>,
    {
        eval_node(&self.root, resolve)
    }

    /// Evaluate and require a boolean outcome.
    pub fn eval_bool<F>(&self, resolve: &F) -> Result<bool, ExprError>
    where
        F: Fn(&str) -> Option<Value>,
    {
        match self.eval(resolve)? {
            Value::Bool(b) => Ok(b),
            other => Err(ExprError::Eval {
                message: format!("expression is not boolean, got {}", other.type_name()),
            }),
        }
    }

    /// Evaluate and require a numeric outcome.
    pub fn eval_num<F>(&self, resolve: &F) -> Result<f64, ExprError>
    where
        F: Fn(&str) -> Option<Value>,
    {
        match self.eval(resolve)? {
            Value::Num(n) => Ok(n),
            other => Err(ExprError::Eval {
                message: format!("expression is not numeric, got {}", other.type_name()),
            }),
        }
    }
}

fn eval_node<F>(node: &Node, resolve: &F) -> Result<Value, ExprError>
where
    F: Fn(&str) -> Option<Value>,
{
    match node {
        Node::Literal(v) => Ok(v.clone()),
        Node::Ident(name) => match resolve(name) {
            Some(Value::Null) | None => Err(ExprError::UnknownIdentifier { name: name.clone() }),
            Some(v) => Ok(v),
        },
        Node::Unary(op, inner) => {
            let v = eval_node(inner, resolve)?;
            match (op, v) {
                (UnaryOp::Neg, Value::Num(n)) => Ok(Value::Num(-n)),
                (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                (_, v) => Err(ExprError::Eval {
                    message: format!("unary operator not applicable to {}", v.type_name()),
                }),
            }
        }
        Node::Binary(op, lhs, rhs) => {
            // Short-circuit the logical operators.
            if matches!(op, BinaryOp::And | BinaryOp::Or) {
                let l = expect_bool(eval_node(lhs, resolve)?)?;
                return match (op, l) {
                    (BinaryOp::And, false) => Ok(Value::Bool(false)),
                    (BinaryOp::Or, true) => Ok(Value::Bool(true)),
                    _ => Ok(Value::Bool(expect_bool(eval_node(rhs, resolve)?)?)),
                };
            }
            let l = eval_node(lhs, resolve)?;
            let r = eval_node(rhs, resolve)?;
            eval_binary(*op, l, r)
        }
    }
}

fn expect_bool(v: Value) -> Result<bool, ExprError> {
    match v {
        Value::Bool(b) => Ok(b),
        other => Err(ExprError::Eval {
            message: format!("logical operand is not boolean, got {}", other.type_name()),
        }),
    }
}

fn eval_binary(op: BinaryOp, l: Value, r: Value) -> Result<Value, ExprError> {
    use BinaryOp as Op;
    match (op, &l, &r) {
        (Op::Add, Value::Num(a), Value::Num(b)) => Ok(Value::Num(a + b)),
        (Op::Sub, Value::Num(a), Value::Num(b)) => Ok(Value::Num(a - b)),
        (Op::Mul, Value::Num(a), Value::Num(b)) => Ok(Value::Num(a * b)),
        (Op::Div, Value::Num(a), Value::Num(b)) => {
            if *b == 0.0 {
                Err(ExprError::Eval {
                    message: "division by zero".to_string(),
                })
            } else {
                Ok(Value::Num(a / b))
            }
        }
        (Op::Eq, _, _) => Ok(Value::Bool(values_equal(&l, &r)?)),
        (Op::Ne, _, _) => Ok(Value::Bool(!values_equal(&l, &r)?)),
        (Op::Lt, _, _) | (Op::Le, _, _) | (Op::Gt, _, _) | (Op::Ge, _, _) => {
            let ord = values_compare(&l, &r)?;
            let outcome = match op {
                Op::Lt => ord.is_lt(),
                Op::Le => ord.is_le(),
                Op::Gt => ord.is_gt(),
                Op::Ge => ord.is_ge(),
                _ => unreachable!(),
            };
            Ok(Value::Bool(outcome))
        }
        _ => Err(ExprError::Eval {
            message: format!(
                "operator not applicable to {} and {}",
                l.type_name(),
                r.type_name()
            ),
        }),
    }
}

fn values_equal(l: &Value, r: &Value) -> Result<bool, ExprError> {
    match (l, r) {
        (Value::Num(a), Value::Num(b)) => Ok(a == b),
        (Value::Str(a), Value::Str(b)) => Ok(a == b),
        (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
        _ => Err(ExprError::Eval {
            message: format!(
                "cannot compare {} with {}",
                l.type_name(),
                r.type_name()
            ),
        }),
    }
}

fn values_compare(l: &Value, r: &Value) -> Result<std::cmp::Ordering, ExprError> {
    match (l, r) {
        (Value::Num(a), Value::Num(b)) => {
            a.partial_cmp(b).ok_or_else(|| ExprError::Eval {
                message: "cannot order NaN".to_string(),
            })
        }
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        _ => Err(ExprError::Eval {
            message: format!(
                "cannot order {} against {}",
                l.type_name(),
                r.type_name()
            ),
        }),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Str(String),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
}

fn tokenize(source: &str) -> Result<Vec<(usize, Token)>, ExprError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\r' | '\n' => i += 1,
            '(' => {
                tokens.push((i, Token::LParen));
                i += 1;
            }
            ')' => {
                tokens.push((i, Token::RParen));
                i += 1;
            }
            '+' => {
                tokens.push((i, Token::Op("+")));
                i += 1;
            }
            '-' => {
                tokens.push((i, Token::Op("-")));
                i += 1;
            }
            '*' => {
                tokens.push((i, Token::Op("*")));
                i += 1;
            }
            '/' => {
                tokens.push((i, Token::Op("/")));
                i += 1;
            }
            '=' | '!' | '<' | '>' => {
                // i + 2 may fall inside a multibyte char; slice a single
                // byte instead so the arm reports a parse error.
                let two = if i + 2 <= source.len() && source.is_char_boundary(i + 2) {
                    &source[i..i + 2]
                } else {
                    &source[i..i + 1]
                };
                match two {
                    "==" | "!=" | "<=" | ">=" => {
                        tokens.push((i, Token::Op(intern_op(two))));
                        i += 2;
                    }
                    _ => match c {
                        '<' => {
                            tokens.push((i, Token::Op("<")));
                            i += 1;
                        }
                        '>' => {
                            tokens.push((i, Token::Op(">")));
                            i += 1;
                        }
                        '!' => {
                            tokens.push((i, Token::Op("!")));
                            i += 1;
                        }
                        _ => {
                            return Err(ExprError::Parse {
                                offset: i,
                                message: "expected '==' after '='".to_string(),
                            });
                        }
                    },
                }
            }
            '&' | '|' => {
                let two = if i + 2 <= source.len() && source.is_char_boundary(i + 2) {
                    &source[i..i + 2]
                } else {
                    &source[i..i + 1]
                };
                match two {
                    "&&" => {
                        tokens.push((i, Token::Op("and")));
                        i += 2;
                    }
                    "||" => {
                        tokens.push((i, Token::Op("or")));
                        i += 2;
                    }
                    _ => {
                        return Err(ExprError::Parse {
                            offset: i,
                            message: format!("unexpected character '{c}'"),
                        });
                    }
                }
            }
            '\'' | '"' => {
                let quote = c;
                let start = i + 1;
                let mut j = start;
                while j < bytes.len() && bytes[j] as char != quote {
                    j += 1;
                }
                if j >= bytes.len() {
                    return Err(ExprError::Parse {
                        offset: i,
                        message: "unterminated string literal".to_string(),
                    });
                }
                tokens.push((i, Token::Str(source[start..j].to_string())));
                i = j + 1;
            }
            _ if c.is_ascii_digit() || (c == '.' && i + 1 < bytes.len()) => {
                let start = i;
                let mut j = i;
                while j < bytes.len()
                    && ((bytes[j] as char).is_ascii_digit() || bytes[j] as char == '.')
                {
                    j += 1;
                }
                let text = &source[start..j];
                let value = text.parse::<f64>().map_err(|_| ExprError::Parse {
                    offset: start,
                    message: format!("invalid number '{text}'"),
                })?;
                tokens.push((start, Token::Num(value)));
                i = j;
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                let mut j = i;
                while j < bytes.len()
                    && ((bytes[j] as char).is_ascii_alphanumeric() || bytes[j] as char == '_')
                {
                    j += 1;
                }
                let word = &source[start..j];
                let token = match word.to_ascii_lowercase().as_str() {
                    "and" => Token::Op("and"),
                    "or" => Token::Op("or"),
                    "not" => Token::Op("!"),
                    _ => Token::Ident(word.to_string()),
                };
                tokens.push((start, token));
                i = j;
            }
            _ => {
                return Err(ExprError::Parse {
                    offset: i,
                    message: format!("unexpected character '{c}'"),
                });
            }
        }
    }
    Ok(tokens)
}

fn intern_op(op: &str) -> &'static str {
    match op {
        "==" => "==",
        "!=" => "!=",
        "<=" => "<=",
        ">=" => ">=",
        _ => unreachable!(),
    }
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if matches!(self.peek(), Some(Token::Op(o)) if *o == op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error_here(&self, message: impl Into<String>) -> ExprError {
        let offset = self.tokens.get(self.pos).map(|(o, _)| *o).unwrap_or(0);
        ExprError::Parse {
            offset,
            message: message.into(),
        }
    }

    fn parse_or(&mut self) -> Result<Node, ExprError> {
        let mut node = self.parse_and()?;
        while self.eat_op("or") {
            let rhs = self.parse_and()?;
            node = Node::Binary(BinaryOp::Or, Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    fn parse_and(&mut self) -> Result<Node, ExprError> {
        let mut node = self.parse_not()?;
        while self.eat_op("and") {
            let rhs = self.parse_not()?;
            node = Node::Binary(BinaryOp::And, Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    fn parse_not(&mut self) -> Result<Node, ExprError> {
        if self.eat_op("!") {
            let inner = self.parse_not()?;
            return Ok(Node::Unary(UnaryOp::Not, Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Node, ExprError> {
        let lhs = self.parse_additive()?;
        let op = match self.peek() {
            Some(Token::Op("==")) => Some(BinaryOp::Eq),
            Some(Token::Op("!=")) => Some(BinaryOp::Ne),
            Some(Token::Op("<=")) => Some(BinaryOp::Le),
            Some(Token::Op(">=")) => Some(BinaryOp::Ge),
            Some(Token::Op("<")) => Some(BinaryOp::Lt),
            Some(Token::Op(">")) => Some(BinaryOp::Gt),
            _ => None,
        };
        match op {
            Some(op) => {
                self.pos += 1;
                let rhs = self.parse_additive()?;
                Ok(Node::Binary(op, Box::new(lhs), Box::new(rhs)))
            }
            None => Ok(lhs),
        }
    }

    fn parse_additive(&mut self) -> Result<Node, ExprError> {
        let mut node = self.parse_multiplicative()?;
        loop {
            if self.eat_op("+") {
                let rhs = self.parse_multiplicative()?;
                node = Node::Binary(BinaryOp::Add, Box::new(node), Box::new(rhs));
            } else if self.eat_op("-") {
                let rhs = self.parse_multiplicative()?;
                node = Node::Binary(BinaryOp::Sub, Box::new(node), Box::new(rhs));
            } else {
                break;
            }
        }
        Ok(node)
    }

    fn parse_multiplicative(&mut self) -> Result<Node, ExprError> {
        let mut node = self.parse_unary()?;
        loop {
            if self.eat_op("*") {
                let rhs = self.parse_unary()?;
                node = Node::Binary(BinaryOp::Mul, Box::new(node), Box::new(rhs));
            } else if self.eat_op("/") {
                let rhs = self.parse_unary()?;
                node = Node::Binary(BinaryOp::Div, Box::new(node), Box::new(rhs));
            } else {
                break;
            }
        }
        Ok(node)
    }

    fn parse_unary(&mut self) -> Result<Node, ExprError> {
        if self.eat_op("-") {
            let inner = self.parse_unary()?;
            return Ok(Node::Unary(UnaryOp::Neg, Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Node, ExprError> {
        match self.peek().cloned() {
            Some(Token::Num(n)) => {
                self.pos += 1;
                Ok(Node::Literal(Value::Num(n)))
            }
            Some(Token::Str(s)) => {
                self.pos += 1;
                Ok(Node::Literal(Value::Str(s)))
            }
            Some(Token::Ident(name)) => {
                self.pos += 1;
                match name.as_str() {
                    "true" => Ok(Node::Literal(Value::Bool(true))),
                    "false" => Ok(Node::Literal(Value::Bool(false))),
                    _ => Ok(Node::Ident(name)),
                }
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.parse_or()?;
                if !matches!(self.peek(), Some(Token::RParen)) {
                    return Err(self.error_here("expected ')'"));
                }
                self.pos += 1;
                Ok(inner)
            }
            _ => Err(self.error_here("expected a value, identifier, or '('")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver<'a>(pairs: &'a [(&'a str, Value)]) -> impl Fn(&str) -> Option<Value> + 'a {
        move |name: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.clone())
        }
    }

    #[test]
    fn comparison_over_fields() {
        let expr = Expr::parse("min_value <= max_value").expect("parse");
        let ctx = [
            ("min_value", Value::Num(10.0)),
            ("max_value", Value::Num(100.0)),
        ];
        assert!(expr.eval_bool(&resolver(&ctx)).expect("eval"));
    }

    #[test]
    fn arithmetic_and_logic() {
        let expr = Expr::parse("price * quantity > 100 and price > 0").expect("parse");
        let ctx = [("price", Value::Num(12.5)), ("quantity", Value::Num(10.0))];
        assert!(expr.eval_bool(&resolver(&ctx)).expect("eval"));
    }

    #[test]
    fn string_equality() {
        let expr = Expr::parse("status == 'active'").expect("parse");
        let ctx = [("status", Value::Str("active".to_string()))];
        assert!(expr.eval_bool(&resolver(&ctx)).expect("eval"));
    }

    #[test]
    fn missing_identifier_is_an_error() {
        let expr = Expr::parse("a < b").expect("parse");
        let ctx = [("a", Value::Num(1.0))];
        assert!(expr.eval_bool(&resolver(&ctx)).is_err());
    }

    #[test]
    fn trailing_garbage_rejected() {
        assert!(Expr::parse("a < b extra").is_err());
    }

    #[test]
    fn multibyte_after_operator_is_a_parse_error() {
        // The two-byte operator lookahead must not slice into a
        // multibyte character.
        assert!(Expr::parse("a <é").is_err());
        assert!(Expr::parse("a =é").is_err());
        assert!(Expr::parse("&é").is_err());
        assert!(Expr::parse("|\u{16b72}").is_err());
        assert!(Expr::parse("a <= b").is_ok());
    }

    proptest::proptest! {
        // The parser must reject or accept arbitrary input without
        // panicking; evaluation of whatever parses must also not panic.
        #[test]
        fn parser_never_panics(source in "\\PC{0,40}") {
            if let Ok(expr) = Expr::parse(&source) {
                let _ = expr.eval_bool(&|_name: &str| Some(Value::Num(1.0)));
            }
        }
    }
}
