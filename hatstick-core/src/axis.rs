//! Virtual axis abstraction
//!
//! The controller never touches a device directly. It returns a
//! [`TickAction`](crate::controller::TickAction) and whoever owns the axis
//! performs the write through [`VirtualAxis`].
//!
//! Values are normalized to `[-1.0, 1.0]` with rest at `0.0`. Both write
//! modes saturate at the range limits.

use crate::controller::TickAction;
use crate::error::ControlError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lower bound of the normalized axis range
pub const AXIS_NORM_MIN: f64 = -1.0;
/// Upper bound of the normalized axis range
pub const AXIS_NORM_MAX: f64 = 1.0;
/// Rest (center) value
pub const AXIS_REST: f64 = 0.0;

/// Joystick axis identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisId {
    X,
    Y,
    RX,
    RY,
    Z,
    RZ,
}

impl AxisId {
    /// Get display name for the axis
    pub fn display_name(&self) -> &'static str {
        match self {
            AxisId::X => "X",
            AxisId::Y => "Y",
            AxisId::RX => "RX",
            AxisId::RY => "RY",
            AxisId::Z => "Z",
            AxisId::RZ => "RZ",
        }
    }
}

impl fmt::Display for AxisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Address of one axis on one virtual device
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AxisTarget {
    /// Virtual device identifier (the uinput device name)
    pub device: String,
    pub axis: AxisId,
}

impl AxisTarget {
    pub fn new(device: impl Into<String>, axis: AxisId) -> Self {
        Self {
            device: device.into(),
            axis,
        }
    }
}

impl fmt::Display for AxisTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.device, self.axis)
    }
}

/// How a written value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Set the axis to the value
    Absolute,
    /// Add the value to the current axis value
    Relative,
}

/// A readable and writable normalized axis
pub trait VirtualAxis: Send {
    /// Current normalized value
    fn read(&self) -> f64;

    /// Write a value. Implementations clamp the result to `[-1.0, 1.0]`.
    fn write(&mut self, value: f64, mode: WriteMode) -> Result<(), ControlError>;
}

/// Resolve the value an axis should hold after a write, with saturation
pub fn resolve_write(current: f64, value: f64, mode: WriteMode) -> Result<f64, ControlError> {
    if !value.is_finite() {
        return Err(ControlError::InvalidValue(value));
    }
    let target = match mode {
        WriteMode::Absolute => value,
        WriteMode::Relative => current + value,
    };
    Ok(target.clamp(AXIS_NORM_MIN, AXIS_NORM_MAX))
}

/// Perform the write a tick asked for. Returns whether anything was written.
pub fn apply<A: VirtualAxis + ?Sized>(axis: &mut A, action: TickAction) -> Result<bool, ControlError> {
    match action {
        TickAction::NoAction => Ok(false),
        TickAction::RelativeWrite(delta) => axis.write(delta, WriteMode::Relative).map(|_| true),
        TickAction::AbsoluteWrite(value) => axis.write(value, WriteMode::Absolute).map(|_| true),
    }
}

/// In-memory axis, used for dry runs and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryAxis {
    value: f64,
    writes: usize,
}

impl MemoryAxis {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start at a given value (clamped)
    pub fn with_value(value: f64) -> Self {
        Self {
            value: value.clamp(AXIS_NORM_MIN, AXIS_NORM_MAX),
            writes: 0,
        }
    }

    /// Number of writes performed so far
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl VirtualAxis for MemoryAxis {
    fn read(&self) -> f64 {
        self.value
    }

    fn write(&mut self, value: f64, mode: WriteMode) -> Result<(), ControlError> {
        self.value = resolve_write(self.value, value, mode)?;
        self.writes += 1;
        Ok(())
    }
}
