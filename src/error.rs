//! Provides [`HocsimError`], the error type for every fallible operation
//! in the crate.
use std::fmt::{self, Display};

#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
/// The error type surfaced by the simulation engine and its components.
///
/// Nothing is retried internally; every error propagates to the caller.
pub enum HocsimError {
    /// A state transition was requested that the current node state does
    /// not admit, e.g. infecting an already-infected node. Indicates
    /// mis-use of the public API or an internal bug.
    InvariantViolation(String),
    /// A structural operation was invalid: mutating an absent key,
    /// inserting a duplicate, or constructing a component from
    /// malformed inputs.
    InvalidOperation(String),
    /// A weighted sample was requested from an empty set.
    Empty,
    /// A weight fell outside the declared envelope. Weights are never
    /// clamped; the caller must choose the envelope to cover every
    /// reachable rate.
    OutOfRange { value: f64, min: f64, max: f64 },
}

impl From<String> for HocsimError {
    fn from(error: String) -> Self {
        HocsimError::InvalidOperation(error)
    }
}

impl From<&str> for HocsimError {
    fn from(error: &str) -> Self {
        HocsimError::InvalidOperation(error.to_string())
    }
}

impl std::error::Error for HocsimError {}

impl Display for HocsimError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Error: {self:?}")?;
        Ok(())
    }
}
