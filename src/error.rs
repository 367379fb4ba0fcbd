//! Error types for planning operations.

use thiserror::Error;

use crate::score::ScoreParseError;

/// Main error type for the planning core.
#[derive(Debug, Error)]
pub enum PlanningError {
    /// A derived field was read before propagation established it.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// An edit referenced a nonexistent entity or broke a structural precondition.
    ///
    /// The solution is left unchanged.
    #[error("Invalid move: {0}")]
    InvalidMove(String),

    /// Score text did not match `{hard}hard/{soft}soft`.
    #[error(transparent)]
    ScoreParse(#[from] ScoreParseError),

    /// The problem instance is malformed.
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    /// No solution is registered under the given id.
    #[error("Unknown problem id: {0}")]
    UnknownProblem(String),
}

/// Result type alias for planning operations.
pub type Result<T> = std::result::Result<T, PlanningError>;
