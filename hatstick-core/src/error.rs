//! Controller error types

use crate::scheduler::ControllerId;
use thiserror::Error;

/// Errors from the rate controller and its collaborators
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    /// Direction component outside {-1, 0, 1}
    #[error("Invalid direction: {0} (expected -1, 0 or 1)")]
    InvalidDirection(i32),

    /// Rate parameter outside its allowed range
    #[error("Invalid parameter {name}: {value} (allowed 0..={max})")]
    InvalidParameter {
        name: &'static str,
        value: u32,
        max: u32,
    },

    /// Axis value that cannot be written (NaN or infinite)
    #[error("Invalid axis value: {0}")]
    InvalidValue(f64),

    /// Controller bound to the scheduler more than once
    #[error("Controller {0} is already bound")]
    DuplicateController(ControllerId),

    /// The axis device rejected a write
    #[error("Axis write failed: {0}")]
    Axis(String),
}
