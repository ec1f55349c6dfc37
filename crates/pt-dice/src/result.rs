//! Roll results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The result of rolling a single die.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DieResult {
    /// Sides of the die.
    pub sides: u32,
    /// The face rolled.
    pub value: u32,
    /// Whether the die counts towards the total.
    pub kept: bool,
    /// Whether the die triggered an explosion.
    pub exploded: bool,
}

impl fmt::Display for DieResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)?;
        if self.exploded {
            write!(f, "!")?;
        }
        if !self.kept {
            write!(f, "d")?;
        }
        Ok(())
    }
}

/// The evaluated result of a whole notation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRollResult {
    /// The notation as written, whitespace removed.
    pub notation: String,
    /// The notation with each dice term replaced by its faces.
    pub rolls: String,
    /// The final total.
    pub total: i64,
    /// Every die rolled, in order.
    pub dice: Vec<DieResult>,
}

impl DiceRollResult {
    /// `notation: rolls = total`, e.g. `2d6+3: [4, 2]+3 = 9`.
    pub fn output(&self) -> String {
        self.to_string()
    }

    /// The first natural face of a die with the given sides.
    pub fn first_die(&self, sides: u32) -> Option<u32> {
        self.dice.iter().find(|d| d.sides == sides).map(|d| d.value)
    }
}

impl fmt::Display for DiceRollResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} = {}", self.notation, self.rolls, self.total)
    }
}
