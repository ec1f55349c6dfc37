//! Dice notation for the paotuan dice engine.
//!
//! Parses and evaluates expressions such as `d100`, `3d6+2`, `2d20kh1`,
//! `4d6dl1`, `d%` and `(1d6+1)*2`. Rolls go through the [`DiceRng`] trait
//! so callers can inject a seeded or fixed source of randomness.

pub mod ast;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod result;
pub mod rng;

pub use ast::{BinOp, DiceTerm, Expr, Selector};
pub use error::{NotationError, NotationResult};
pub use eval::{RollMode, is_dice_notation, roll, roll_with};
pub use parser::parse;
pub use result::{DiceRollResult, DieResult};
pub use rng::{DiceRng, FixedRng, SequenceRng};
