//! Error types for episode loading and slice filtering.

use thiserror::Error;

/// Fatal errors raised while loading an episode.
///
/// Any of these rejects the whole load; the previously loaded episode stays active.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EpisodeError {
    /// Text contains characters outside the numeric literal grammar
    #[error("{source_name}: unexpected characters (not a numeric array): {found:?}")]
    InvalidCharacters { source_name: &'static str, found: char },

    /// Nested literal could not be parsed
    #[error("{source_name}: syntax error at offset {offset}: {message}")]
    Syntax {
        source_name: &'static str,
        offset: usize,
        message: String,
    },

    /// Catalog did not resolve to exactly one list per discipline
    #[error("valid: expected {expected} discipline lists, got {found}")]
    DisciplineCount { expected: usize, found: usize },

    /// An action row does not have one entry per discipline
    #[error("recorded_actions: row {row} is not length {expected} (got {found})")]
    RowLength {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// An action entry is not a finite number
    #[error("recorded_actions: non-numeric at [{row}][{column}]")]
    NonNumeric { row: usize, column: usize },

    /// A catalog entry matches none of the admissible shapes
    #[error("valid: unexpected entry at [{discipline}][{index}]: {reason}")]
    InvalidEntry {
        discipline: usize,
        index: usize,
        reason: String,
    },

    /// Structurally empty or wrongly nested input
    #[error("{source_name}: {message}")]
    Shape {
        source_name: &'static str,
        message: String,
    },

    /// Catalog map keyed by an unknown discipline name
    #[error("valid: unknown discipline {0:?}")]
    UnknownDiscipline(String),

    /// Structured (JSON) input failed to deserialize
    #[error("JSON error: {0}")]
    Json(String),
}

impl EpisodeError {
    /// Creates a shape error.
    pub fn shape(source_name: &'static str, message: impl Into<String>) -> Self {
        Self::Shape {
            source_name,
            message: message.into(),
        }
    }

    /// Creates an invalid catalog entry error.
    pub fn invalid_entry(discipline: usize, index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidEntry {
            discipline,
            index,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for EpisodeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}

/// Errors raised while compiling a slice filter expression.
///
/// A rejected filter is never installed; the prior filter stays in effect.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SliceError {
    #[error("Invalid slice expression: {0:?} is not allowed (use x, y, z, numbers and operators)")]
    DisallowedCharacter(char),

    #[error("Could not parse slice expression: {0}")]
    Syntax(String),
}
