//! Error types for dice notation.

/// Errors that can occur while lexing, parsing or evaluating dice notation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotationError {
    /// The notation was empty.
    #[error("empty dice notation")]
    Empty,

    /// A character that is not part of the notation grammar.
    #[error("unexpected character {found:?} at {offset}")]
    UnexpectedChar {
        /// The offending text.
        found: String,
        /// Byte offset into the notation.
        offset: usize,
    },

    /// A token appeared where the grammar does not allow it.
    #[error("unexpected '{0}'")]
    UnexpectedToken(String),

    /// The notation ended in the middle of an expression.
    #[error("unexpected end of notation")]
    UnexpectedEnd,

    /// A term rolls more dice than allowed.
    #[error("too many dice: {0}")]
    TooManyDice(u64),

    /// A die has an unsupported number of sides.
    #[error("invalid die size: d{0}")]
    InvalidSides(u64),

    /// Division by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// The notation is longer than a chat command plausibly needs.
    #[error("dice notation too long: {0} bytes")]
    TooLong(usize),

    /// Parentheses nest deeper than allowed.
    #[error("dice notation nested too deeply")]
    TooDeep,

    /// The result does not fit in a 64-bit integer.
    #[error("arithmetic overflow")]
    Overflow,
}

/// Convenience result type for notation operations.
pub type NotationResult<T> = Result<T, NotationError>;
