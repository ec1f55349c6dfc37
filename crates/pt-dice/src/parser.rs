//! Recursive descent parser for dice notation.
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('-' | '+') unary | primary
//! primary := INT | INT? 'd' (INT | '%') modifier* | '(' expr ')'
//! ```

use crate::ast::{BinOp, DiceTerm, Expr, Selector};
use crate::error::{NotationError, NotationResult};
use crate::lexer::{Token, lex};

/// Upper bound on dice rolled by a single term.
pub const MAX_DICE: u64 = 1000;
/// Upper bound on the number of sides of a die.
pub const MAX_SIDES: u64 = 100_000;
/// Upper bound on notation length in bytes.
pub const MAX_NOTATION_LEN: usize = 512;
/// Upper bound on parenthesis nesting.
pub const MAX_DEPTH: usize = 64;

/// Parse notation into an [`Expr`].
pub fn parse(notation: &str) -> NotationResult<Expr> {
    if notation.len() > MAX_NOTATION_LEN {
        return Err(NotationError::TooLong(notation.len()));
    }
    let tokens: Vec<Token> = lex(notation)?.into_iter().map(|(t, _)| t).collect();
    if tokens.is_empty() {
        return Err(NotationError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expr()?;
    match parser.peek() {
        None => Ok(expr),
        Some(tok) => Err(NotationError::UnexpectedToken(tok.to_string())),
    }
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
        let tok = self.peek();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expr(&mut self) -> NotationResult<Expr> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary(Box::new(lhs), op, Box::new(rhs));
        }
    }

    fn term(&mut self) -> NotationResult<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary(Box::new(lhs), op, Box::new(rhs));
        }
    }

    /// Signs fold into at most one negation.
    fn unary(&mut self) -> NotationResult<Expr> {
        let mut negate = false;
        loop {
            match self.peek() {
                Some(Token::Minus) => negate = !negate,
                Some(Token::Plus) => {}
                _ => break,
            }
            self.pos += 1;
        }
        let operand = self.primary()?;
        Ok(if negate {
            Expr::Neg(Box::new(operand))
        } else {
            operand
        })
    }

    fn primary(&mut self) -> NotationResult<Expr> {
        match self.next() {
            Some(Token::Int(n)) => {
                if self.peek() == Some(Token::Die) {
                    self.pos += 1;
                    self.dice(n)
                } else {
                    i64::try_from(n)
                        .map(Expr::Num)
                        .map_err(|_| NotationError::Overflow)
                }
            }
            Some(Token::Die) => self.dice(1),
            Some(Token::LParen) => {
                if self.depth >= MAX_DEPTH {
                    return Err(NotationError::TooDeep);
                }
                self.depth += 1;
                let inner = self.expr()?;
                self.depth -= 1;
                match self.next() {
                    Some(Token::RParen) => Ok(Expr::Group(Box::new(inner))),
                    Some(tok) => Err(NotationError::UnexpectedToken(tok.to_string())),
                    None => Err(NotationError::UnexpectedEnd),
                }
            }
            Some(tok) => Err(NotationError::UnexpectedToken(tok.to_string())),
            None => Err(NotationError::UnexpectedEnd),
        }
    }

    /// Parses the part after `d`, the die count having been consumed.
    fn dice(&mut self, count: u64) -> NotationResult<Expr> {
        if count > MAX_DICE {
            return Err(NotationError::TooManyDice(count));
        }
        let sides = match self.next() {
            Some(Token::Int(n)) => n,
            Some(Token::Percent) => 100,
            Some(tok) => return Err(NotationError::UnexpectedToken(tok.to_string())),
            None => return Err(NotationError::UnexpectedEnd),
        };
        if sides == 0 || sides > MAX_SIDES {
            return Err(NotationError::InvalidSides(sides));
        }
        // Both values are bounded by the limits above.
        let mut term = DiceTerm::new(count as u32, sides as u32);

        loop {
            let make: fn(u32) -> Selector = match self.peek() {
                Some(Token::KeepHigh) => Selector::KeepHighest,
                Some(Token::KeepLow) => Selector::KeepLowest,
                Some(Token::DropHigh) => Selector::DropHighest,
                Some(Token::DropLow) => Selector::DropLowest,
                Some(Token::Explode) => {
                    self.pos += 1;
                    term.explode = true;
                    continue;
                }
                _ => break,
            };
            self.pos += 1;
            let n = match self.peek() {
                Some(Token::Int(n)) => {
                    self.pos += 1;
                    n.min(MAX_DICE) as u32
                }
                _ => 1,
            };
            term = term.with_selector(make(n));
        }

        Ok(Expr::Dice(term))
    }
}
