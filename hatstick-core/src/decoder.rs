//! Hat-to-axis input decoding
//!
//! Splits each hat change into a horizontal and a vertical direction and
//! hands them to the X and Y controllers.

use crate::direction::{Direction, HatState};
use crate::error::ControlError;
use crate::scheduler::ControllerHandle;
use tracing::debug;

/// Forwards hat changes to one controller per axis
pub struct InputDecoder {
    horizontal: ControllerHandle,
    vertical: ControllerHandle,
    last: HatState,
}

impl InputDecoder {
    pub fn new(horizontal: ControllerHandle, vertical: ControllerHandle) -> Self {
        Self {
            horizontal,
            vertical,
            last: HatState::Centered,
        }
    }

    /// Apply a direction change to both axes
    pub fn on_input_changed(&mut self, horizontal: Direction, vertical: Direction) {
        self.last = HatState::from_components(horizontal, vertical);
        debug!(hat = %self.last, "Hat changed");
        self.horizontal.lock().set_direction(horizontal);
        self.vertical.lock().set_direction(vertical);
    }

    pub fn on_hat(&mut self, hat: HatState) {
        let (horizontal, vertical) = hat.components();
        self.on_input_changed(horizontal, vertical);
    }

    /// Apply raw integer components. Nothing is touched if either is invalid.
    pub fn on_raw(&mut self, horizontal: i32, vertical: i32) -> Result<(), ControlError> {
        let hat = HatState::from_raw(horizontal, vertical)?;
        self.on_hat(hat);
        Ok(())
    }

    /// Last hat position forwarded
    pub fn last_hat(&self) -> HatState {
        self.last
    }

    pub fn horizontal(&self) -> &ControllerHandle {
        &self.horizontal
    }

    pub fn vertical(&self) -> &ControllerHandle {
        &self.vertical
    }
}
