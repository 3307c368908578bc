//! Physical hat switch reader
//!
//! Finds an evdev device with a hat (`ABS_HAT0X`/`ABS_HAT0Y`), folds its
//! events into [`HatState`] changes and forwards them over a channel.

use evdev::{AbsoluteAxisType, Device, EventType, InputEvent};
use hatstick_core::{Direction, HatState};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Delay before reopening a device that failed
const REOPEN_DELAY: Duration = Duration::from_secs(2);

/// A device that exposes a hat switch
#[derive(Debug, Clone)]
pub struct HatDevice {
    pub path: PathBuf,
    pub name: String,
}

fn has_hat(device: &Device) -> bool {
    device.supported_absolute_axes().is_some_and(|axes| {
        axes.contains(AbsoluteAxisType::ABS_HAT0X) && axes.contains(AbsoluteAxisType::ABS_HAT0Y)
    })
}

/// All input devices with a hat switch
pub fn list_hat_devices() -> Vec<HatDevice> {
    evdev::enumerate()
        .filter(|(_, device)| has_hat(device))
        .map(|(path, device)| HatDevice {
            path,
            name: device.name().unwrap_or("Unknown").to_string(),
        })
        .collect()
}

/// First device with a hat switch
pub fn find_hat_device() -> Option<HatDevice> {
    list_hat_devices().into_iter().next()
}

/// Folds hat axis events into whole hat positions
///
/// A diagonal arrives as two axis events followed by a sync report, so
/// changes are only reported on sync.
#[derive(Debug, Clone)]
pub struct HatTracker {
    invert_y: bool,
    pending: (Direction, Direction),
    current: HatState,
}

impl HatTracker {
    pub fn new(invert_y: bool) -> Self {
        Self {
            invert_y,
            pending: (Direction::Center, Direction::Center),
            current: HatState::Centered,
        }
    }

    pub fn current(&self) -> HatState {
        self.current
    }

    /// Feed one evdev event; returns the new position when it changed
    pub fn handle_event(&mut self, event: &InputEvent) -> Option<HatState> {
        match event.event_type() {
            EventType::ABSOLUTE => {
                self.handle_abs(event.code(), event.value());
                None
            }
            EventType::SYNCHRONIZATION => self.handle_sync(),
            _ => None,
        }
    }

    /// Record a hat axis value; other axes are ignored
    pub fn handle_abs(&mut self, code: u16, value: i32) {
        let direction = signum_direction(value);
        if code == AbsoluteAxisType::ABS_HAT0X.0 {
            self.pending.0 = direction;
        } else if code == AbsoluteAxisType::ABS_HAT0Y.0 {
            self.pending.1 = if self.invert_y {
                direction.reversed()
            } else {
                direction
            };
        }
    }

    /// Commit pending values at a sync report
    pub fn handle_sync(&mut self) -> Option<HatState> {
        let next = HatState::from_components(self.pending.0, self.pending.1);
        if next == self.current {
            return None;
        }
        self.current = next;
        Some(next)
    }
}

fn signum_direction(value: i32) -> Direction {
    match value.signum() {
        -1 => Direction::Negative,
        1 => Direction::Positive,
        _ => Direction::Center,
    }
}

/// Read hat changes from `path` until the receiver goes away
///
/// Reopens the device after errors. When the device is lost the hat is
/// reported as centered so the axes return to rest.
pub async fn run_hat_reader(path: PathBuf, invert_y: bool, tx: mpsc::Sender<HatState>) {
    loop {
        let mut tracker = HatTracker::new(invert_y);
        match read_device(&path, &mut tracker, &tx).await {
            Ok(()) => {
                debug!("Hat receiver closed, stopping reader");
                return;
            }
            Err(e) => {
                warn!("Hat device {}: {}", path.display(), e);
            }
        }

        if tracker.current() != HatState::Centered
            && tx.send(HatState::Centered).await.is_err()
        {
            return;
        }
        tokio::time::sleep(REOPEN_DELAY).await;
    }
}

/// Returns `Ok` only when the channel closed
async fn read_device(
    path: &Path,
    tracker: &mut HatTracker,
    tx: &mpsc::Sender<HatState>,
) -> std::io::Result<()> {
    let device = Device::open(path)?;
    info!(
        "Reading hat from {} ({})",
        path.display(),
        device.name().unwrap_or("Unknown")
    );
    let mut events = device.into_event_stream()?;

    loop {
        let event = events.next_event().await?;
        if let Some(hat) = tracker.handle_event(&event) {
            debug!(%hat, "Hat position");
            if tx.send(hat).await.is_err() {
                return Ok(());
            }
        }
    }
}
