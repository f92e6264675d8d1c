use thiserror::Error;

use crate::simulate::{MAX_ITERATIONS, MIN_ITERATIONS};

/// Validation and operational errors. All of these are raised before any
/// computation starts, so a failed request never leaves partial state behind.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid odds for {match_id}: every decimal price must exceed 1.0 (got {home}/{draw}/{away})")]
    InvalidOdds {
        match_id: String,
        home: f64,
        draw: f64,
        away: f64,
    },

    #[error("duplicate match id '{0}' in slate")]
    DuplicateMatchId(String),

    #[error("slate has {got} matches, expected {expected}")]
    SlateSize { got: usize, expected: usize },

    #[error("unknown risk profile '{0}' (expected one of: safe, balanced, risky)")]
    UnknownProfile(String),

    #[error(
        "coverage counts {halves} half + {fulls} full + {singles} single = {} do not cover {expected} matches",
        halves + fulls + singles
    )]
    ConfigMismatch {
        halves: usize,
        fulls: usize,
        singles: usize,
        expected: usize,
    },

    #[error("iterations {0} outside allowed range {MIN_ITERATIONS}..={MAX_ITERATIONS}")]
    IterationsOutOfBounds(u64),

    #[error("system would expand to {rows} rows, above the ceiling of {ceiling}")]
    SystemTooLarge { rows: u64, ceiling: u64 },

    #[error("simulation cancelled before completion")]
    Cancelled,
}

pub fn validate_slate_size(got: usize, expected: usize) -> Result<(), EngineError> {
    if got != expected {
        return Err(EngineError::SlateSize { got, expected });
    }
    Ok(())
}

pub fn validate_iterations(iterations: u64) -> Result<(), EngineError> {
    if !(MIN_ITERATIONS..=MAX_ITERATIONS).contains(&iterations) {
        return Err(EngineError::IterationsOutOfBounds(iterations));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_bounds_are_inclusive() {
        assert!(validate_iterations(MIN_ITERATIONS).is_ok());
        assert!(validate_iterations(MAX_ITERATIONS).is_ok());
        assert!(validate_iterations(MIN_ITERATIONS - 1).is_err());
        assert!(validate_iterations(MAX_ITERATIONS + 1).is_err());
    }

    #[test]
    fn slate_size_mismatch_is_reported() {
        assert!(validate_slate_size(13, 13).is_ok());
        let err = validate_slate_size(12, 13).unwrap_err();
        assert!(err.to_string().contains("12"));
    }
}
