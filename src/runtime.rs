//! Host run loop
//!
//! Wires the decoder, both rate controllers and the tick scheduler
//! together, then multiplexes hat changes and scheduler ticks on one task.

use crate::config::HatstickConfig;
use hatstick_core::{
    AxisRateController, AxisTarget, ControlError, ControllerHandle, ControllerId, HatState,
    InputDecoder, TickReport, TickScheduler, VirtualAxis,
};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Scheduler id of the horizontal controller
pub const X_CONTROLLER: ControllerId = ControllerId(0);
/// Scheduler id of the vertical controller
pub const Y_CONTROLLER: ControllerId = ControllerId(1);

/// The decoder, two controllers and their scheduler
pub struct Rig {
    scheduler: Arc<TickScheduler>,
    decoder: InputDecoder,
}

impl Rig {
    /// Build controllers from `config` and bind them to the given axes
    pub fn new(
        config: &HatstickConfig,
        x_axis: Box<dyn VirtualAxis>,
        y_axis: Box<dyn VirtualAxis>,
    ) -> Result<Self, ControlError> {
        let scheduler = Arc::new(TickScheduler::new());
        let make = |id: ControllerId, target: AxisTarget| -> Result<ControllerHandle, ControlError> {
            let ctrl = AxisRateController::new(id, target, config.rates, scheduler.clone())?;
            Ok(Arc::new(Mutex::new(ctrl)))
        };

        let x = make(
            X_CONTROLLER,
            AxisTarget::new(&config.device_name, config.x_axis.axis),
        )?;
        let y = make(
            Y_CONTROLLER,
            AxisTarget::new(&config.device_name, config.y_axis.axis),
        )?;
        scheduler.bind(x.clone(), x_axis)?;
        scheduler.bind(y.clone(), y_axis)?;

        Ok(Self {
            scheduler,
            decoder: InputDecoder::new(x, y),
        })
    }

    pub fn on_hat(&mut self, hat: HatState) {
        self.decoder.on_hat(hat);
    }

    pub fn tick(&self) -> TickReport {
        self.scheduler.run_tick()
    }

    /// Stop both controllers and put the axes at rest
    pub fn shutdown(&self) -> TickReport {
        self.scheduler.stop_all()
    }

    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    /// Current (x, y) axis values
    pub fn axis_values(&self) -> (f64, f64) {
        (
            self.scheduler.axis_value(X_CONTROLLER).unwrap_or(0.0),
            self.scheduler.axis_value(Y_CONTROLLER).unwrap_or(0.0),
        )
    }

    pub fn horizontal(&self) -> &ControllerHandle {
        self.decoder.horizontal()
    }

    pub fn vertical(&self) -> &ControllerHandle {
        self.decoder.vertical()
    }
}

/// Totals over one [`run`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub hat_changes: usize,
    pub ticks: usize,
    pub writes: usize,
    pub errors: usize,
}

impl RunStats {
    fn absorb(&mut self, report: TickReport) {
        self.ticks += report.ticked;
        self.writes += report.writes;
        self.errors += report.errors;
    }
}

/// Drive `rig` until the hat channel closes or `shutdown` resolves
///
/// Axes are returned to rest before this returns.
pub async fn run(
    rig: &mut Rig,
    mut hat_rx: mpsc::Receiver<HatState>,
    tick_interval: Duration,
    shutdown: impl Future<Output = ()>,
) -> RunStats {
    let mut stats = RunStats::default();
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    info!("Entering main loop (tick every {:?})", tick_interval);

    loop {
        tokio::select! {
            hat = hat_rx.recv() => {
                match hat {
                    Some(hat) => {
                        stats.hat_changes += 1;
                        rig.on_hat(hat);
                    }
                    None => {
                        info!("Hat input closed");
                        break;
                    }
                }
            }

            _ = interval.tick() => {
                let report = rig.tick();
                if report.errors > 0 {
                    warn!("{} axis write(s) failed this tick", report.errors);
                }
                if report.writes > 0 {
                    let (x, y) = rig.axis_values();
                    debug!(x, y, "Axes");
                }
                stats.absorb(report);
            }

            _ = &mut shutdown => {
                info!("Shutting down");
                break;
            }
        }
    }

    let report = rig.shutdown();
    stats.absorb(report);
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use hatstick_core::{AxisId, MemoryAxis};

    fn rig() -> Rig {
        Rig::new(
            &HatstickConfig::default(),
            Box::new(MemoryAxis::new()),
            Box::new(MemoryAxis::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_rig_targets_follow_config() {
        let mut config = HatstickConfig::default();
        config.x_axis.axis = AxisId::RX;
        config.y_axis.axis = AxisId::RY;
        let rig = Rig::new(
            &config,
            Box::new(MemoryAxis::new()),
            Box::new(MemoryAxis::new()),
        )
        .unwrap();
        assert_eq!(rig.horizontal().lock().target().axis, AxisId::RX);
        assert_eq!(rig.vertical().lock().target().axis, AxisId::RY);
        assert_eq!(rig.horizontal().lock().id(), X_CONTROLLER);
    }

    #[test]
    fn test_rig_hat_to_axes() {
        let mut rig = rig();
        rig.on_hat(HatState::SouthWest);
        for _ in 0..5 {
            rig.tick();
        }
        let (x, y) = rig.axis_values();
        assert!(x < 0.0);
        assert!(y < 0.0);

        rig.on_hat(HatState::Centered);
        for _ in 0..100 {
            rig.tick();
        }
        assert!(rig.is_idle());
        assert_eq!(rig.axis_values(), (0.0, 0.0));
    }

    #[tokio::test]
    async fn test_run_ends_when_input_closes() {
        let mut rig = rig();
        let (tx, rx) = mpsc::channel(8);
        tx.send(HatState::East).await.unwrap();
        drop(tx);

        let stats = run(
            &mut rig,
            rx,
            Duration::from_millis(1),
            std::future::pending::<()>(),
        )
        .await;
        assert_eq!(stats.hat_changes, 1);
        assert!(rig.is_idle());
        assert_eq!(rig.axis_values(), (0.0, 0.0));
    }

    #[tokio::test]
    async fn test_run_ticks_until_shutdown() {
        let mut rig = rig();
        let (tx, rx) = mpsc::channel(8);
        tx.send(HatState::North).await.unwrap();

        let stats = run(
            &mut rig,
            rx,
            Duration::from_millis(1),
            tokio::time::sleep(Duration::from_millis(50)),
        )
        .await;
        assert_eq!(stats.hat_changes, 1);
        assert!(stats.ticks > 0);
        assert!(stats.writes > 0);
        assert_eq!(stats.errors, 0);
        // Shutdown always rests the axes
        assert_eq!(rig.axis_values(), (0.0, 0.0));
        drop(tx);
    }
}
