//! Virtual joystick device using evdev/uinput
//!
//! Creates a virtual gamepad whose absolute axes are moved by the rate
//! controllers. Each controlled axis gets a [`JoystickAxis`] view onto the
//! shared device.

use evdev::{
    uinput::{VirtualDevice, VirtualDeviceBuilder},
    AbsInfo, AbsoluteAxisType, AttributeSet, InputEvent, Key, UinputAbsSetup,
};
use hatstick_core::axis::resolve_write;
use hatstick_core::{AxisId, ControlError, VirtualAxis, WriteMode};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Joystick axis value range (standard for most games)
pub const AXIS_MIN: i32 = -32767;
pub const AXIS_MAX: i32 = 32767;

/// Errors from virtual joystick operations
#[derive(Debug, Error)]
pub enum JoystickError {
    #[error("Failed to create virtual device: {0}")]
    CreateDevice(#[source] std::io::Error),
    #[error("Failed to emit event: {0}")]
    EmitEvent(#[source] std::io::Error),
    #[error("Axis {0} is not enabled on this device")]
    UnknownAxis(AxisId),
}

/// Virtual joystick device
pub struct VirtualJoystick {
    device: VirtualDevice,
    /// Last raw value emitted per axis
    axis_values: HashMap<AxisId, i32>,
}

impl VirtualJoystick {
    /// Create a new virtual joystick device
    ///
    /// # Arguments
    /// * `name` - Device name (shown in `evtest` and game controller settings)
    /// * `axes` - Which axes to enable on the device
    pub fn new(name: &str, axes: &[AxisId]) -> Result<Self, JoystickError> {
        let mut builder = VirtualDeviceBuilder::new()
            .map_err(JoystickError::CreateDevice)?
            .name(name);

        // Games skip devices without a button, so expose one
        let mut keys = AttributeSet::<Key>::new();
        keys.insert(Key::BTN_SOUTH);
        builder = builder
            .with_keys(&keys)
            .map_err(JoystickError::CreateDevice)?;

        for &axis_id in axes {
            let abs_setup = UinputAbsSetup::new(
                axis_id_to_code(axis_id),
                AbsInfo::new(0, AXIS_MIN, AXIS_MAX, 0, 0, 1),
            );
            builder = builder
                .with_absolute_axis(&abs_setup)
                .map_err(JoystickError::CreateDevice)?;
        }

        let device = builder.build().map_err(JoystickError::CreateDevice)?;
        let axis_values = axes.iter().map(|&axis| (axis, 0)).collect();

        Ok(Self {
            device,
            axis_values,
        })
    }

    /// Set an axis to a raw value, emitting only on change
    pub fn set_axis(&mut self, axis: AxisId, value: i32) -> Result<(), JoystickError> {
        let clamped = value.clamp(AXIS_MIN, AXIS_MAX);
        let current = self
            .axis_values
            .get_mut(&axis)
            .ok_or(JoystickError::UnknownAxis(axis))?;
        if *current == clamped {
            return Ok(());
        }

        let event = InputEvent::new_now(
            evdev::EventType::ABSOLUTE,
            axis_id_to_code(axis).0,
            clamped,
        );
        self.device
            .emit(&[event])
            .map_err(JoystickError::EmitEvent)?;
        *current = clamped;
        Ok(())
    }

    /// Last raw value emitted for an axis
    pub fn get_axis(&self, axis: AxisId) -> i32 {
        self.axis_values.get(&axis).copied().unwrap_or(0)
    }

    /// Get the device path (e.g., /dev/input/eventX)
    pub fn device_path(&mut self) -> Option<std::path::PathBuf> {
        self.device
            .enumerate_dev_nodes_blocking()
            .ok()?
            .next()?
            .ok()
    }
}

/// Sink for raw axis values
pub trait AxisOutput: Send {
    fn set_raw(&mut self, axis: AxisId, raw: i32) -> Result<(), JoystickError>;
}

impl AxisOutput for VirtualJoystick {
    fn set_raw(&mut self, axis: AxisId, raw: i32) -> Result<(), JoystickError> {
        self.set_axis(axis, raw)
    }
}

/// One axis of a shared output device, in normalized units
///
/// Keeps the normalized value locally so deltas smaller than one raw step
/// still accumulate.
pub struct JoystickAxis<D = VirtualJoystick> {
    device: Arc<Mutex<D>>,
    axis: AxisId,
    value: f64,
}

impl<D: AxisOutput> JoystickAxis<D> {
    pub fn new(device: Arc<Mutex<D>>, axis: AxisId) -> Self {
        Self {
            device,
            axis,
            value: 0.0,
        }
    }
}

impl<D: AxisOutput> VirtualAxis for JoystickAxis<D> {
    fn read(&self) -> f64 {
        self.value
    }

    fn write(&mut self, value: f64, mode: WriteMode) -> Result<(), ControlError> {
        let next = resolve_write(self.value, value, mode)?;
        self.device
            .lock()
            .set_raw(self.axis, normalized_to_raw(next))
            .map_err(|e| ControlError::Axis(e.to_string()))?;
        self.value = next;
        Ok(())
    }
}

/// Map [-1.0, 1.0] onto the raw axis range
pub fn normalized_to_raw(value: f64) -> i32 {
    (value.clamp(-1.0, 1.0) * f64::from(AXIS_MAX)).round() as i32
}

/// Convert our AxisId to evdev AbsoluteAxisType
fn axis_id_to_code(axis: AxisId) -> AbsoluteAxisType {
    match axis {
        AxisId::X => AbsoluteAxisType::ABS_X,
        AxisId::Y => AbsoluteAxisType::ABS_Y,
        AxisId::RX => AbsoluteAxisType::ABS_RX,
        AxisId::RY => AbsoluteAxisType::ABS_RY,
        AxisId::Z => AbsoluteAxisType::ABS_Z,
        AxisId::RZ => AbsoluteAxisType::ABS_RZ,
    }
}
