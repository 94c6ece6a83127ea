//! Error types returned by the matching entry points.

use std::collections::TryReserveError;

use thiserror::Error;

/// Result type for matching operations
pub type MatchOutcome<T> = Result<T, MatchError>;

/// Errors that can occur while cross-matching two catalogs.
///
/// None of these are transient; callers should not retry without changing
/// their inputs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    /// Empty catalog, non-positive radius or non-positive cell size.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Grid or candidate storage could not be obtained.
    #[error("Allocation failure: {0}")]
    AllocationFailure(String),

    /// The exclusive match count exceeded `min(N1, N2)`.
    #[error("Invariant violation: {matches} exclusive matches exceed bound of {bound}")]
    InvariantViolation { matches: usize, bound: usize },

    /// More radius-qualifying candidates than `max_matches` allows.
    #[error("Too many matches: found {found} candidates, maximum is {max}")]
    TooManyMatches { found: usize, max: usize },
}

impl From<TryReserveError> for MatchError {
    fn from(err: TryReserveError) -> Self {
        MatchError::AllocationFailure(err.to_string())
    }
}
