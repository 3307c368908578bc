//! Hat switch to virtual axis rate control
//!
//! Converts the nine discrete positions of a hat switch into continuous
//! motion of two virtual axes. Holding a direction accelerates the axis;
//! releasing it returns the axis smoothly to center and then goes idle.
//!
//! Device I/O stays outside this crate: the host supplies a
//! [`VirtualAxis`] per axis and drives the [`TickScheduler`].

pub mod axis;
pub mod controller;
pub mod decoder;
pub mod direction;
pub mod error;
pub mod scheduler;

pub use axis::{
    AxisId, AxisTarget, MemoryAxis, VirtualAxis, WriteMode, AXIS_NORM_MAX, AXIS_NORM_MIN,
    AXIS_REST,
};
pub use controller::{
    AxisRateController, ControllerState, RateParams, TickAction, RATE_LIMIT, RATE_SCALE,
};
pub use decoder::InputDecoder;
pub use direction::{Direction, HatState};
pub use error::ControlError;
pub use scheduler::{ControllerHandle, ControllerId, Scheduler, TickReport, TickScheduler};
