//! Error types for the dice engine.

use thiserror::Error;

use crate::expr::ExprError;

/// Result type for engine operations.
pub type DiceResult<T> = Result<T, DiceError>;

/// Errors that can occur while parsing, rolling or applying a command.
#[derive(Debug, Error)]
pub enum DiceError {
    /// The dice notation could not be parsed or evaluated.
    #[error("{0}")]
    Notation(#[from] pt_dice::NotationError),

    /// A rule or alias expression failed to compile or evaluate.
    #[error("{0}")]
    Expression(#[from] ExprError),

    /// Template or alias expansion nested deeper than allowed.
    #[error("recursion limit exceeded while expanding '{0}'")]
    RecursionLimit(String),

    /// A roll lifecycle method was called out of order.
    #[error("invalid roll phase: {0}")]
    InvalidPhase(String),

    /// A pattern or regex in an alias rule is malformed.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Persisted data carries a version newer than this engine understands.
    #[error("unsupported {kind} version {found} (latest is {supported})")]
    UnsupportedVersion {
        /// What was being loaded.
        kind: &'static str,
        /// Version found in the data.
        found: u32,
        /// Newest supported version.
        supported: u32,
    },

    /// Malformed JSON for a card or config.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    /// A referenced card is not registered.
    #[error("card '{0}' not found")]
    CardNotFound(String),
}
