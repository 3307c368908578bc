//! Axis rate controller
//!
//! Turns a held [`Direction`] into a growing per-tick step on one axis, and
//! walks the axis back to center once the direction is released.
//!
//! Rates are in device units: [`RATE_SCALE`] units span one normalized axis
//! unit, so a rate of 3 moves the axis by 0.003 per tick.
//!
//! ```text
//!   Idle ──set_direction(±1)──► Active ──centering reaches 0──► Idle
//!                                 │  direction ≠ 0: accelerate
//!                                 │  direction = 0: center
//! ```

use crate::axis::AxisTarget;
use crate::direction::Direction;
use crate::error::ControlError;
use crate::scheduler::{ControllerId, Scheduler};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Device units per normalized axis unit
pub const RATE_SCALE: f64 = 1000.0;

/// Inclusive upper bound for every rate parameter
pub const RATE_LIMIT: u32 = 1024;

/// What the caller should do to the axis after a tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickAction {
    NoAction,
    /// Add this normalized delta to the axis
    RelativeWrite(f64),
    /// Set the axis to this normalized value
    AbsoluteWrite(f64),
}

/// Coarse controller state, for display and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Accelerating,
    Centering,
}

/// Step-rate tuning, shared by both axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateParams {
    /// Step size right after a direction is pressed
    #[serde(default = "default_min_rate")]
    pub min_rate: u32,
    /// Cap on the step size while holding
    #[serde(default = "default_max_rate")]
    pub max_rate: u32,
    /// How much the step size grows per tick while holding
    #[serde(default = "default_rate_growth")]
    pub rate_growth: u32,
}

fn default_min_rate() -> u32 {
    3
}
fn default_max_rate() -> u32 {
    1
}
fn default_rate_growth() -> u32 {
    1
}

impl Default for RateParams {
    fn default() -> Self {
        Self {
            min_rate: default_min_rate(),
            max_rate: default_max_rate(),
            rate_growth: default_rate_growth(),
        }
    }
}

impl RateParams {
    pub fn new(min_rate: u32, max_rate: u32, rate_growth: u32) -> Result<Self, ControlError> {
        let params = Self {
            min_rate,
            max_rate,
            rate_growth,
        };
        params.validate()?;
        Ok(params)
    }

    /// Check every parameter is within `0..=RATE_LIMIT`
    pub fn validate(&self) -> Result<(), ControlError> {
        for (name, value) in [
            ("min_rate", self.min_rate),
            ("max_rate", self.max_rate),
            ("rate_growth", self.rate_growth),
        ] {
            if value > RATE_LIMIT {
                return Err(ControlError::InvalidParameter {
                    name,
                    value,
                    max: RATE_LIMIT,
                });
            }
        }
        Ok(())
    }

    /// Offset and stop threshold used while centering, in device units.
    /// Never below one unit, so a zero `min_rate` still converges.
    fn settle_units(&self) -> f64 {
        2.0 * f64::from(self.min_rate.max(1))
    }
}

/// Rate controller for a single axis
pub struct AxisRateController {
    id: ControllerId,
    target: AxisTarget,
    params: RateParams,
    scheduler: Arc<dyn Scheduler>,
    direction: Direction,
    current_rate: f64,
    running: bool,
    last_axis_value: Option<f64>,
}

impl AxisRateController {
    /// Create an idle controller
    ///
    /// # Arguments
    /// * `id` - Key used to register with `scheduler`
    /// * `target` - Which axis this controller moves
    /// * `params` - Validated rate tuning
    /// * `scheduler` - Receives register/deregister calls on start and stop
    pub fn new(
        id: ControllerId,
        target: AxisTarget,
        params: RateParams,
        scheduler: Arc<dyn Scheduler>,
    ) -> Result<Self, ControlError> {
        params.validate()?;
        Ok(Self {
            id,
            target,
            params,
            scheduler,
            direction: Direction::Center,
            current_rate: 0.0,
            running: false,
            last_axis_value: None,
        })
    }

    pub fn id(&self) -> ControllerId {
        self.id
    }

    pub fn target(&self) -> &AxisTarget {
        &self.target
    }

    pub fn params(&self) -> RateParams {
        self.params
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Step magnitude in device units
    pub fn current_rate(&self) -> f64 {
        self.current_rate
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Axis value seen by the last tick that emitted a relative write
    pub fn last_axis_value(&self) -> Option<f64> {
        self.last_axis_value
    }

    pub fn state(&self) -> ControllerState {
        match (self.running, self.direction) {
            (false, _) => ControllerState::Idle,
            (true, Direction::Center) => ControllerState::Centering,
            (true, _) => ControllerState::Accelerating,
        }
    }

    /// Update the intent. Starts the controller when moving away from center
    /// while idle; releasing to center lets the ticks bring the axis home.
    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
        if !direction.is_center() && !self.running {
            self.start();
        }
    }

    fn start(&mut self) {
        self.current_rate = f64::from(self.params.min_rate);
        self.last_axis_value = None;
        self.running = true;
        self.scheduler.register(self.id);
        info!(axis = %self.target, direction = %self.direction, "Axis started");
    }

    /// Return the axis to rest immediately and leave the scheduler
    pub fn stop(&mut self) -> TickAction {
        self.current_rate = 0.0;
        self.last_axis_value = None;
        self.running = false;
        self.scheduler.deregister(self.id);
        info!(axis = %self.target, "Axis stopped");
        TickAction::AbsoluteWrite(0.0)
    }

    /// Advance one scheduler tick given the axis's current value
    pub fn tick(&mut self, axis_value: f64) -> TickAction {
        if !self.running {
            return TickAction::NoAction;
        }
        trace!(axis = %self.target, value = axis_value, "Tick");

        let delta = if self.direction.is_center() {
            match self.centering_delta(axis_value) {
                Some(delta) => delta,
                None => return self.stop(),
            }
        } else {
            self.accelerating_delta()
        };

        debug!(
            axis = %self.target,
            value = axis_value,
            delta,
            rate = self.current_rate,
            "Step"
        );
        self.last_axis_value = Some(axis_value);
        TickAction::RelativeWrite(delta)
    }

    fn accelerating_delta(&mut self) -> f64 {
        self.current_rate += f64::from(self.params.rate_growth);
        let delta = self.direction.sign() * self.current_rate / RATE_SCALE;

        // The lower bound never binds here; kept to match the tuned curve.
        let max = f64::from(self.params.max_rate);
        self.current_rate = self.current_rate.clamp(-max, max);
        delta
    }

    /// Delta toward zero, or `None` when the axis should snap to rest
    fn centering_delta(&mut self, axis_value: f64) -> Option<f64> {
        if axis_value == 0.0 {
            return None;
        }

        let settle = self.params.settle_units();
        let units = -(axis_value * RATE_SCALE / 2.0) - settle.copysign(axis_value);
        self.current_rate = units.abs();
        let delta = units / RATE_SCALE;

        let crosses_zero = (axis_value + delta) / axis_value <= 0.0;
        let within_settle = axis_value.abs() < settle / RATE_SCALE;
        if crosses_zero || within_settle {
            debug!(axis = %self.target, value = axis_value, "Centered");
            return None;
        }
        Some(delta)
    }
}

impl std::fmt::Debug for AxisRateController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AxisRateController")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("params", &self.params)
            .field("direction", &self.direction)
            .field("current_rate", &self.current_rate)
            .field("running", &self.running)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::AxisId;
    use crate::scheduler::TickScheduler;

    fn controller(min: u32, max: u32, growth: u32) -> (AxisRateController, Arc<TickScheduler>) {
        let scheduler = Arc::new(TickScheduler::new());
        let ctrl = AxisRateController::new(
            ControllerId(0),
            AxisTarget::new("test", AxisId::X),
            RateParams::new(min, max, growth).unwrap(),
            scheduler.clone(),
        )
        .unwrap();
        (ctrl, scheduler)
    }

    fn relative(action: TickAction) -> f64 {
        match action {
            TickAction::RelativeWrite(delta) => delta,
            other => panic!("Expected RelativeWrite, got {other:?}"),
        }
    }

    #[test]
    fn test_start_resets_rate_and_registers() {
        let (mut ctrl, scheduler) = controller(5, 20, 2);
        assert_eq!(ctrl.state(), ControllerState::Idle);

        ctrl.set_direction(Direction::Positive);
        assert!(ctrl.is_running());
        assert_eq!(ctrl.current_rate(), 5.0);
        assert!(scheduler.is_registered(ControllerId(0)));
        assert_eq!(ctrl.state(), ControllerState::Accelerating);
    }

    #[test]
    fn test_center_while_idle_is_noop() {
        let (mut ctrl, scheduler) = controller(3, 10, 1);
        ctrl.set_direction(Direction::Center);
        assert!(!ctrl.is_running());
        assert!(scheduler.is_idle());
        assert_eq!(ctrl.tick(0.0), TickAction::NoAction);
    }

    #[test]
    fn test_acceleration_grows_then_caps() {
        let (mut ctrl, _) = controller(3, 6, 1);
        ctrl.set_direction(Direction::Positive);

        let deltas: Vec<f64> = (0..5).map(|_| relative(ctrl.tick(0.0))).collect();
        // Delta uses the rate before the cap is applied
        assert_eq!(deltas, vec![0.004, 0.005, 0.006, 0.007, 0.007]);
        assert_eq!(ctrl.current_rate(), 6.0);
    }

    #[test]
    fn test_negative_direction_negative_delta() {
        let (mut ctrl, _) = controller(3, 10, 1);
        ctrl.set_direction(Direction::Negative);
        let delta = relative(ctrl.tick(0.0));
        assert!((delta + 0.004).abs() < 1e-12);
        assert_eq!(ctrl.current_rate(), 4.0);
    }

    #[test]
    fn test_min_above_max_clamps_on_first_tick() {
        let (mut ctrl, _) = controller(3, 1, 1);
        ctrl.set_direction(Direction::Positive);
        assert_eq!(ctrl.current_rate(), 3.0);

        let first = relative(ctrl.tick(0.0));
        assert!((first - 0.004).abs() < 1e-12);
        assert_eq!(ctrl.current_rate(), 1.0);

        let second = relative(ctrl.tick(0.004));
        assert!((second - 0.002).abs() < 1e-12);
        assert_eq!(ctrl.current_rate(), 1.0);
    }

    #[test]
    fn test_centering_step() {
        let (mut ctrl, _) = controller(3, 10, 1);
        ctrl.set_direction(Direction::Positive);
        ctrl.set_direction(Direction::Center);

        let delta = relative(ctrl.tick(0.5));
        assert!((delta + 0.256).abs() < 1e-12);
        assert!((ctrl.current_rate() - 256.0).abs() < 1e-9);
        assert_eq!(ctrl.last_axis_value(), Some(0.5));
        assert_eq!(ctrl.state(), ControllerState::Centering);
    }

    #[test]
    fn test_centering_negative_side() {
        let (mut ctrl, _) = controller(3, 10, 1);
        ctrl.set_direction(Direction::Negative);
        ctrl.set_direction(Direction::Center);

        let delta = relative(ctrl.tick(-0.5));
        assert!((delta - 0.256).abs() < 1e-12);
    }

    #[test]
    fn test_centering_snaps_when_small() {
        let (mut ctrl, scheduler) = controller(3, 10, 1);
        ctrl.set_direction(Direction::Positive);
        ctrl.set_direction(Direction::Center);

        assert_eq!(ctrl.tick(0.001), TickAction::AbsoluteWrite(0.0));
        assert!(!ctrl.is_running());
        assert_eq!(ctrl.current_rate(), 0.0);
        assert!(scheduler.is_idle());
    }

    #[test]
    fn test_centering_snaps_when_crossing() {
        let (mut ctrl, _) = controller(3, 10, 1);
        ctrl.set_direction(Direction::Negative);
        ctrl.set_direction(Direction::Center);

        // 0.01 / 2 + 0.006 overshoots zero
        assert_eq!(ctrl.tick(-0.01), TickAction::AbsoluteWrite(0.0));
        assert!(!ctrl.is_running());
    }

    #[test]
    fn test_zero_axis_while_centering_stops() {
        let (mut ctrl, _) = controller(3, 10, 1);
        ctrl.set_direction(Direction::Positive);
        ctrl.set_direction(Direction::Center);

        assert_eq!(ctrl.tick(0.0), TickAction::AbsoluteWrite(0.0));
        assert!(!ctrl.is_running());
    }

    #[test]
    fn test_zero_min_rate_still_settles() {
        let (mut ctrl, _) = controller(0, 10, 1);
        ctrl.set_direction(Direction::Positive);
        ctrl.set_direction(Direction::Center);

        let mut value = 1.0;
        let mut ticks = 0;
        loop {
            match ctrl.tick(value) {
                TickAction::RelativeWrite(delta) => value += delta,
                TickAction::AbsoluteWrite(v) => {
                    value = v;
                    break;
                }
                TickAction::NoAction => panic!("Controller went idle without a stop write"),
            }
            ticks += 1;
            assert!(ticks < 20, "centering did not converge");
        }
        assert_eq!(value, 0.0);
    }

    #[test]
    fn test_restart_after_stop() {
        let (mut ctrl, scheduler) = controller(3, 10, 1);
        ctrl.set_direction(Direction::Positive);
        ctrl.tick(0.0);
        ctrl.tick(0.004);
        ctrl.stop();
        assert!(scheduler.is_idle());

        ctrl.set_direction(Direction::Negative);
        assert!(ctrl.is_running());
        assert_eq!(ctrl.current_rate(), 3.0);
        assert_eq!(ctrl.last_axis_value(), None);
    }

    #[test]
    fn test_direction_change_while_running_keeps_rate() {
        let (mut ctrl, _) = controller(3, 10, 2);
        ctrl.set_direction(Direction::Positive);
        ctrl.tick(0.0);
        assert_eq!(ctrl.current_rate(), 5.0);

        ctrl.set_direction(Direction::Negative);
        assert_eq!(ctrl.current_rate(), 5.0);
        let delta = relative(ctrl.tick(0.005));
        assert!((delta + 0.007).abs() < 1e-12);
    }

    #[test]
    fn test_repress_while_centering_grows_from_centering_rate() {
        let (mut ctrl, _) = controller(3, 10, 1);
        ctrl.set_direction(Direction::Positive);
        ctrl.set_direction(Direction::Center);
        let delta = relative(ctrl.tick(0.8));
        assert!((delta + 0.406).abs() < 1e-12);
        assert_eq!(ctrl.current_rate(), 406.0);

        // Still running, so this is not a fresh start at min_rate
        ctrl.set_direction(Direction::Positive);
        assert_eq!(ctrl.current_rate(), 406.0);
        let delta = relative(ctrl.tick(0.394));
        assert!((delta - 0.407).abs() < 1e-12);
        assert_eq!(ctrl.current_rate(), 10.0);

        let delta = relative(ctrl.tick(0.801));
        assert!((delta - 0.011).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_out_of_range_params() {
        assert_eq!(
            RateParams::new(3, 2000, 1),
            Err(ControlError::InvalidParameter {
                name: "max_rate",
                value: 2000,
                max: RATE_LIMIT,
            })
        );
        assert!(RateParams::new(RATE_LIMIT, RATE_LIMIT, RATE_LIMIT).is_ok());
    }
}
