//! Snap constraints: a piece of target geometry plus the engagement rules
//! that decide whether a moving point is pulled onto it.
//!
//! Built-in geometry is a closed enum evaluated with a `match`; anything
//! else plugs in through [`CustomGeometry`].

pub mod types;


pub use types::*;

use thiserror::Error;

/// Errors raised while building or configuring constraints.
///
/// None of these are produced on the per-tick path.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConstraintError {
    #[error("Snap distance must be finite and non-negative, got {0}")]
    InvalidSnapDistance(f64),

    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type ConstraintResult<T> = Result<T, ConstraintError>;
