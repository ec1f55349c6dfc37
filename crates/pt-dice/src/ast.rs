//! Syntax tree for dice notation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which dice of a term count towards its total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selector {
    /// Keep the highest n dice.
    KeepHighest(u32),
    /// Keep the lowest n dice.
    KeepLowest(u32),
    /// Drop the highest n dice.
    DropHighest(u32),
    /// Drop the lowest n dice.
    DropLowest(u32),
}

/// A single `NdS` term with its modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceTerm {
    /// Number of dice rolled.
    pub count: u32,
    /// Sides per die (`%` is 100).
    pub sides: u32,
    /// Optional keep/drop selector.
    pub selector: Option<Selector>,
    /// Whether a maximum roll adds another die.
    pub explode: bool,
}

impl DiceTerm {
    /// A plain `count`d`sides` term.
    pub fn new(count: u32, sides: u32) -> Self {
        Self {
            count,
            sides,
            selector: None,
            explode: false,
        }
    }

    /// Attach a keep/drop selector.
    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selector = Some(selector);
        self
    }
}

/// Arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`, truncating toward zero.
    Div,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinOp::Add => write!(f, "+"),
            BinOp::Sub => write!(f, "-"),
            BinOp::Mul => write!(f, "*"),
            BinOp::Div => write!(f, "/"),
        }
    }
}

/// A parsed dice expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    /// Integer constant.
    Num(i64),
    /// A dice term.
    Dice(DiceTerm),
    /// Unary minus.
    Neg(Box<Expr>),
    /// Binary operation.
    Binary(Box<Expr>, BinOp, Box<Expr>),
    /// Parenthesized sub-expression.
    Group(Box<Expr>),
}

impl Expr {
    /// Whether the expression rolls any dice at all.
    pub fn has_dice(&self) -> bool {
        match self {
            Expr::Num(_) => false,
            Expr::Dice(_) => true,
            Expr::Neg(e) | Expr::Group(e) => e.has_dice(),
            Expr::Binary(l, _, r) => l.has_dice() || r.has_dice(),
        }
    }
}
