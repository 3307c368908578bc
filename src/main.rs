//! Hat Switch to Virtual Joystick Axes
//!
//! Main entry point.

use anyhow::{Context, Result};
use clap::Parser;
use hatstick_core::{MemoryAxis, VirtualAxis};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use hatstick::config::HatstickConfig;
use hatstick::hat_input::{self, run_hat_reader};
use hatstick::joystick::{JoystickAxis, VirtualJoystick};
use hatstick::runtime::{self, Rig};

#[derive(Parser)]
#[command(name = "hatstick")]
#[command(about = "Drive virtual joystick axes from a hat switch")]
struct Cli {
    /// Config file path (default: ~/.config/hatstick/hatstick.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input device with the hat switch (overrides the config)
    #[arg(short, long)]
    device: Option<PathBuf>,

    /// List input devices that have a hat switch and exit
    #[arg(long)]
    list_devices: bool,

    /// Move in-memory axes instead of creating a uinput device
    #[arg(long)]
    dry_run: bool,

    /// Write the effective config to the config path and exit
    #[arg(long)]
    write_config: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if cli.list_devices {
        return list_devices();
    }

    // Load config
    let config_path = cli.config.unwrap_or_else(HatstickConfig::default_path);
    info!("Loading config from {:?}", config_path);
    let mut config = HatstickConfig::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    if let Some(device) = cli.device {
        config.input_device = Some(device);
    }
    config.validate()?;

    if cli.write_config {
        config.save(&config_path)?;
        info!("Wrote config to {}", config_path.display());
        return Ok(());
    }

    let input_path = match config.input_device.clone() {
        Some(path) => path,
        None => {
            let device = hat_input::find_hat_device()
                .context("No input device with a hat switch found (use --device)")?;
            info!("Using {} ({})", device.path.display(), device.name);
            device.path
        }
    };

    let (x_axis, y_axis) = create_axes(&config, cli.dry_run)?;
    let mut rig = Rig::new(&config, x_axis, y_axis)?;
    info!(
        "Rates: min {} max {} growth {}",
        config.rates.min_rate, config.rates.max_rate, config.rates.rate_growth
    );

    let (hat_tx, hat_rx) = mpsc::channel(32);
    tokio::spawn(run_hat_reader(input_path, config.invert_y, hat_tx));

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    info!("Press Ctrl+C to exit.");
    let stats = runtime::run(&mut rig, hat_rx, config.tick_interval(), shutdown).await;
    info!(
        "Stopped after {} hat changes, {} ticks, {} writes ({} failed)",
        stats.hat_changes, stats.ticks, stats.writes, stats.errors
    );
    Ok(())
}

/// Print devices with a hat switch
fn list_devices() -> Result<()> {
    let devices = hat_input::list_hat_devices();
    if devices.is_empty() {
        println!("No input devices with a hat switch found");
    }
    for device in devices {
        println!("{}\t{}", device.path.display(), device.name);
    }
    Ok(())
}

/// Create the two output axes, either on a uinput device or in memory
fn create_axes(
    config: &HatstickConfig,
    dry_run: bool,
) -> Result<(Box<dyn VirtualAxis>, Box<dyn VirtualAxis>)> {
    if dry_run {
        info!("Dry run: axes are kept in memory");
        return Ok((Box::new(MemoryAxis::new()), Box::new(MemoryAxis::new())));
    }

    let axes = [config.x_axis.axis, config.y_axis.axis];
    let mut joystick = VirtualJoystick::new(&config.device_name, &axes)
        .context("Failed to create virtual joystick (is /dev/uinput writable?)")?;
    info!("Created virtual joystick: {}", config.device_name);
    if let Some(path) = joystick.device_path() {
        info!("Device path: {}", path.display());
    }

    let shared = Arc::new(Mutex::new(joystick));
    Ok((
        Box::new(JoystickAxis::new(shared.clone(), config.x_axis.axis)),
        Box::new(JoystickAxis::new(shared, config.y_axis.axis)),
    ))
}
