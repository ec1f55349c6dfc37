use super::lexer::Token;
use super::{ExprError, Value, Vars};

/// Expression syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal value.
    Lit(Value),
    /// Variable reference.
    Var(String),
    /// Unary operator applied to an operand.
    Unary(UnaryOp, Box<Node>),
    /// Binary operator.
    Binary(Box<Node>, BinaryOp, Box<Node>),
    /// `cond ? then : else`
    Cond(Box<Node>, Box<Node>, Box<Node>),
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `-`
    Neg,
    /// `+`
    Pos,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `||`
    Or,
    /// `&&`
    And,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `===`
    StrictEq,
    /// `!==`
    StrictNotEq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
}

impl Node {
    pub(super) fn idents(&self, out: &mut Vec<String>) {
        match self {
            Node::Lit(_) => {}
            Node::Var(name) => out.push(name.clone()),
            Node::Unary(_, inner) => inner.idents(out),
            Node::Binary(l, _, r) => {
                l.idents(out);
                r.idents(out);
            }
            Node::Cond(c, t, e) => {
                c.idents(out);
                t.idents(out);
                e.idents(out);
            }
        }
    }

    pub(super) fn eval(&self, vars: &Vars) -> Result<Value, ExprError> {
        Ok(match self {
            Node::Lit(v) => *v,
            Node::Var(name) => vars
                .get(name)
                .copied()
                .map(Value::Num)
                .ok_or_else(|| ExprError::UnknownVariable(name.clone()))?,
            Node::Unary(op, inner) => {
                let v = inner.eval(vars)?;
                match op {
                    UnaryOp::Not => Value::Bool(!v.truthy()),
                    UnaryOp::Neg => Value::Num(-v.as_num()),
                    UnaryOp::Pos => Value::Num(v.as_num()),
                }
            }
            Node::Cond(c, t, e) => {
                if c.eval(vars)?.truthy() {
                    t.eval(vars)?
                } else {
                    e.eval(vars)?
                }
            }
            Node::Binary(l, op, r) => {
                let lv = l.eval(vars)?;
                // Logical operators short-circuit and yield an operand.
                match op {
                    BinaryOp::Or if lv.truthy() => return Ok(lv),
                    BinaryOp::And if !lv.truthy() => return Ok(lv),
                    BinaryOp::Or | BinaryOp::And => return r.eval(vars),
                    _ => {}
                }
                let rv = r.eval(vars)?;
                let (a, b) = (lv.as_num(), rv.as_num());
                match op {
                    BinaryOp::Eq => Value::Bool(a == b),
                    BinaryOp::NotEq => Value::Bool(a != b),
                    BinaryOp::StrictEq => Value::Bool(strict_eq(lv, rv)),
                    BinaryOp::StrictNotEq => Value::Bool(!strict_eq(lv, rv)),
                    BinaryOp::Lt => Value::Bool(a < b),
                    BinaryOp::Le => Value::Bool(a <= b),
                    BinaryOp::Gt => Value::Bool(a > b),
                    BinaryOp::Ge => Value::Bool(a >= b),
                    BinaryOp::Add => Value::Num(a + b),
                    BinaryOp::Sub => Value::Num(a - b),
                    BinaryOp::Mul => Value::Num(a * b),
                    BinaryOp::Div => Value::Num(a / b),
                    BinaryOp::Rem => Value::Num(a % b),
                    BinaryOp::Or | BinaryOp::And => rv,
                }
            }
        })
    }
}

fn strict_eq(a: Value, b: Value) -> bool {
    match (a, b) {
        (Value::Num(x), Value::Num(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        _ => false,
    }
}

pub(super) fn parse(tokens: Vec<Token>) -> Result<Node, ExprError> {
    let mut p = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let node = p.ternary()?;
    match p.tokens.get(p.pos) {
        None => Ok(node),
        Some(tok) => Err(ExprError::UnexpectedToken(format!("{tok:?}"))),
    }
}

/// Nesting allowed for parentheses, unary chains and ternaries.
const MAX_DEPTH: usize = 64;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, tok: &Token) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn nested(&mut self, inner: fn(&mut Self) -> Result<Node, ExprError>) -> Result<Node, ExprError> {
        if self.depth >= MAX_DEPTH {
            return Err(ExprError::TooDeep);
        }
        self.depth += 1;
        let node = inner(self)?;
        self.depth -= 1;
        Ok(node)
    }

    fn ternary(&mut self) -> Result<Node, ExprError> {
        let cond = self.or()?;
        if !self.eat(&Token::Question) {
            return Ok(cond);
        }
        let then = self.nested(Self::ternary)?;
        if !self.eat(&Token::Colon) {
            return match self.peek() {
                Some(tok) => Err(ExprError::UnexpectedToken(format!("{tok:?}"))),
                None => Err(ExprError::UnexpectedEnd),
            };
        }
        let otherwise = self.nested(Self::ternary)?;
        Ok(Node::Cond(Box::new(cond), Box::new(then), Box::new(otherwise)))
    }

    /// Parses one left-associative precedence level.
    fn level(
        &mut self,
        ops: &[(Token, BinaryOp)],
        next: fn(&mut Self) -> Result<Node, ExprError>,
    ) -> Result<Node, ExprError> {
        let mut lhs = next(self)?;
        'outer: loop {
            for (tok, op) in ops {
                if self.eat(tok) {
                    let rhs = next(self)?;
                    lhs = Node::Binary(Box::new(lhs), *op, Box::new(rhs));
                    continue 'outer;
                }
            }
            return Ok(lhs);
        }
    }

    fn or(&mut self) -> Result<Node, ExprError> {
        self.level(&[(Token::Or, BinaryOp::Or)], Self::and)
    }

    fn and(&mut self) -> Result<Node, ExprError> {
        self.level(&[(Token::And, BinaryOp::And)], Self::equality)
    }

    fn equality(&mut self) -> Result<Node, ExprError> {
        self.level(
            &[
                (Token::Eq, BinaryOp::Eq),
                (Token::NotEq, BinaryOp::NotEq),
                (Token::StrictEq, BinaryOp::StrictEq),
                (Token::StrictNotEq, BinaryOp::StrictNotEq),
            ],
            Self::relational,
        )
    }

    fn relational(&mut self) -> Result<Node, ExprError> {
        self.level(
            &[
                (Token::Lt, BinaryOp::Lt),
                (Token::Le, BinaryOp::Le),
                (Token::Gt, BinaryOp::Gt),
                (Token::Ge, BinaryOp::Ge),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> Result<Node, ExprError> {
        self.level(
            &[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> Result<Node, ExprError> {
        self.level(
            &[
                (Token::Star, BinaryOp::Mul),
                (Token::Slash, BinaryOp::Div),
                (Token::Percent, BinaryOp::Rem),
            ],
            Self::unary,
        )
    }

    fn unary(&mut self) -> Result<Node, ExprError> {
        let op = if self.eat(&Token::Not) {
            UnaryOp::Not
        } else if self.eat(&Token::Minus) {
            UnaryOp::Neg
        } else if self.eat(&Token::Plus) {
            UnaryOp::Pos
        } else {
            return self.primary();
        };
        Ok(Node::Unary(op, Box::new(self.nested(Self::unary)?)))
    }

    fn primary(&mut self) -> Result<Node, ExprError> {
        let tok = self.peek().cloned().ok_or(ExprError::UnexpectedEnd)?;
        self.pos += 1;
        match tok {
            Token::Num(n) => Ok(Node::Lit(Value::Num(n))),
            Token::Bool(b) => Ok(Node::Lit(Value::Bool(b))),
            Token::Ident(name) => Ok(Node::Var(name)),
            Token::LParen => {
                let inner = self.nested(Self::ternary)?;
                if self.eat(&Token::RParen) {
                    Ok(inner)
                } else {
                    match self.peek() {
                        Some(tok) => Err(ExprError::UnexpectedToken(format!("{tok:?}"))),
                        None => Err(ExprError::UnexpectedEnd),
                    }
                }
            }
            other => Err(ExprError::UnexpectedToken(format!("{other:?}"))),
        }
    }
}
