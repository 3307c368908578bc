//! Tick scheduling
//!
//! Controllers register themselves when they start and deregister when they
//! stop. The host owns a [`TickScheduler`] and calls
//! [`TickScheduler::run_tick`] at its own cadence; only registered
//! controllers are ticked.

use crate::axis::{self, VirtualAxis, WriteMode, AXIS_REST};
use crate::controller::{AxisRateController, TickAction};
use crate::error::ControlError;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Identifies a controller to its scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ControllerId(pub u8);

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shared, lockable controller
pub type ControllerHandle = Arc<Mutex<AxisRateController>>;

/// Receives start/stop notifications from controllers
pub trait Scheduler: Send + Sync {
    /// Begin ticking `id`. Registering twice is harmless.
    fn register(&self, id: ControllerId);

    /// Stop ticking `id`, effective before this returns
    fn deregister(&self, id: ControllerId);
}

/// Outcome of one [`TickScheduler::run_tick`] pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Controllers that were ticked
    pub ticked: usize,
    /// Axis writes performed
    pub writes: usize,
    /// Controllers that stopped during this pass
    pub stopped: usize,
    /// Axis writes that failed
    pub errors: usize,
}

struct Binding {
    controller: ControllerHandle,
    axis: Box<dyn VirtualAxis>,
}

/// Host-side scheduler driving bound controllers against their axes
///
/// An id stays registered while its controller runs, and also while a
/// stopped controller's rest write has not reached the axis yet.
#[derive(Default)]
pub struct TickScheduler {
    registered: Mutex<BTreeSet<ControllerId>>,
    bindings: Mutex<BTreeMap<ControllerId, Binding>>,
    rest_pending: Mutex<BTreeSet<ControllerId>>,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a controller and the axis it moves
    pub fn bind(
        &self,
        controller: ControllerHandle,
        axis: Box<dyn VirtualAxis>,
    ) -> Result<(), ControlError> {
        let id = controller.lock().id();
        let mut bindings = self.bindings.lock();
        if bindings.contains_key(&id) {
            return Err(ControlError::DuplicateController(id));
        }
        bindings.insert(id, Binding { controller, axis });
        debug!(%id, "Controller bound");
        Ok(())
    }

    pub fn is_registered(&self, id: ControllerId) -> bool {
        self.registered.lock().contains(&id)
    }

    /// Currently registered ids, in order
    pub fn registered(&self) -> Vec<ControllerId> {
        self.registered.lock().iter().copied().collect()
    }

    /// True when no controller wants ticks
    pub fn is_idle(&self) -> bool {
        self.registered.lock().is_empty()
    }

    /// True while a stopped controller still owes its axis the rest write
    pub fn is_rest_pending(&self, id: ControllerId) -> bool {
        self.rest_pending.lock().contains(&id)
    }

    /// Current value of a bound controller's axis
    pub fn axis_value(&self, id: ControllerId) -> Option<f64> {
        self.bindings.lock().get(&id).map(|b| b.axis.read())
    }

    /// Tick every registered controller once and apply its action
    pub fn run_tick(&self) -> TickReport {
        let mut report = TickReport::default();
        let ids = self.registered();
        if ids.is_empty() {
            return report;
        }

        let mut bindings = self.bindings.lock();
        for id in ids {
            let Some(binding) = bindings.get_mut(&id) else {
                warn!(%id, "Registered controller has no binding, dropping it");
                self.rest_pending.lock().remove(&id);
                self.deregister(id);
                continue;
            };

            let mut controller = binding.controller.lock();
            // Checked under the controller lock so a stop that raced this
            // pass is honored.
            if !controller.is_running() {
                if self.is_rest_pending(id) {
                    self.retry_rest(id, binding.axis.as_mut(), &mut report);
                }
                continue;
            }
            // Restarted before the rest write landed; ticks take over the axis
            self.rest_pending.lock().remove(&id);

            let action = controller.tick(binding.axis.read());
            report.ticked += 1;
            let stopping =
                matches!(action, TickAction::AbsoluteWrite(_)) && !controller.is_running();
            if stopping {
                report.stopped += 1;
            }
            drop(controller);

            match axis::apply(binding.axis.as_mut(), action) {
                Ok(true) => report.writes += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(%id, "Failed to write axis: {}", e);
                    report.errors += 1;
                    if stopping {
                        self.hold_for_rest(id);
                    }
                }
            }
        }
        report
    }

    /// Stop every bound controller and write rest to its axis
    pub fn stop_all(&self) -> TickReport {
        let mut report = TickReport::default();
        let mut bindings = self.bindings.lock();
        for (id, binding) in bindings.iter_mut() {
            let action = binding.controller.lock().stop();
            report.stopped += 1;
            match axis::apply(binding.axis.as_mut(), action) {
                Ok(_) => report.writes += 1,
                Err(e) => {
                    warn!(%id, "Failed to reset axis: {}", e);
                    report.errors += 1;
                    self.hold_for_rest(*id);
                }
            }
        }
        report
    }

    /// Keep ticking a stopped controller until its rest write succeeds
    fn hold_for_rest(&self, id: ControllerId) {
        self.rest_pending.lock().insert(id);
        self.register(id);
    }

    fn retry_rest(&self, id: ControllerId, axis: &mut dyn VirtualAxis, report: &mut TickReport) {
        match axis.write(AXIS_REST, WriteMode::Absolute) {
            Ok(()) => {
                report.writes += 1;
                self.rest_pending.lock().remove(&id);
                self.deregister(id);
                debug!(%id, "Axis reached rest on retry");
            }
            Err(e) => {
                warn!(%id, "Failed to reset axis: {}", e);
                report.errors += 1;
            }
        }
    }
}

impl Scheduler for TickScheduler {
    fn register(&self, id: ControllerId) {
        if self.registered.lock().insert(id) {
            debug!(%id, "Registered for ticks");
        }
    }

    fn deregister(&self, id: ControllerId) {
        if self.registered.lock().remove(&id) {
            debug!(%id, "Deregistered from ticks");
        }
    }
}
