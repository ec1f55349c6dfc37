//! Randomness sources for rolling.

use rand::Rng;
use rand::rngs::StdRng;

/// A source of die faces.
pub trait DiceRng: Send {
    /// Returns a value in `low..=high`.
    fn next_in(&mut self, low: u32, high: u32) -> u32;
}

impl DiceRng for StdRng {
    fn next_in(&mut self, low: u32, high: u32) -> u32 {
        if low >= high {
            return low;
        }
        self.random_range(low..=high)
    }
}

/// Always yields the same face, clamped into the requested range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedRng(pub u32);

impl DiceRng for FixedRng {
    fn next_in(&mut self, low: u32, high: u32) -> u32 {
        self.0.clamp(low, high.max(low))
    }
}

/// Cycles through a fixed list of faces, clamping each into range.
#[derive(Debug, Clone, Default)]
pub struct SequenceRng {
    values: Vec<u32>,
    pos: usize,
}

impl SequenceRng {
    /// Create a sequence from the given faces.
    pub fn new(values: impl Into<Vec<u32>>) -> Self {
        Self {
            values: values.into(),
            pos: 0,
        }
    }
}

impl DiceRng for SequenceRng {
    fn next_in(&mut self, low: u32, high: u32) -> u32 {
        if self.values.is_empty() {
            return low;
        }
        let value = self.values[self.pos % self.values.len()];
        self.pos += 1;
        value.clamp(low, high.max(low))
    }
}
