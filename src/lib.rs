//! Hat Switch to Virtual Joystick Axes
//!
//! Reads a physical hat switch through evdev and moves two axes of a
//! virtual uinput joystick: holding a direction accelerates the axis,
//! releasing it glides back to center.

pub mod config;
pub mod hat_input;
pub mod joystick;
pub mod runtime;

pub use config::{AxisBinding, ConfigError, HatstickConfig};
pub use hat_input::{find_hat_device, list_hat_devices, HatDevice, HatTracker};
pub use joystick::{AxisOutput, JoystickAxis, JoystickError, VirtualJoystick, AXIS_MAX, AXIS_MIN};
pub use runtime::{run, Rig, RunStats};
