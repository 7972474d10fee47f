//! CLI Entry Point for elliptec
//!
//! Drives one device on a serial bus.
//!
//! # Usage
//!
//! ```bash
//! elliptec --port /dev/ttyUSB0 --address 0 info
//! elliptec goto 45
//! elliptec --kind shutter jog forward
//! elliptec move absolute 17920
//! RUST_LOG=elliptec=debug elliptec status
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use elliptec::config::Settings;
use elliptec::hardware::DeviceOptions;
use elliptec::protocol::Status;
use elliptec::{
    Address, Controller, DeviceKind, Direction, HomeDirection, Iris, LinearStage, Motor, Payload,
    Rotator, Shutter, Slider,
};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "elliptec")]
#[command(about = "Control Thorlabs Elliptec devices over a serial bus", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = elliptec::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Serial port (overrides configuration)
    #[arg(long, global = true)]
    port: Option<String>,

    /// Device address, one hex digit (overrides configuration)
    #[arg(long, global = true)]
    address: Option<Address>,

    /// Device kind (overrides configuration and the model default)
    #[arg(long, global = true)]
    kind: Option<DeviceKind>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the device information record
    Info,
    /// Print the device status register
    Status,
    /// Send a `get` command
    Get {
        /// Command name (e.g. position, velocity)
        name: String,
    },
    /// Send a `set` command
    Set {
        /// Command name (e.g. velocity, stepsize)
        name: String,
        /// Value; integers are sent as 8 hex digits unless --raw is given
        value: String,
        /// Send the value verbatim
        #[arg(long)]
        raw: bool,
    },
    /// Send a `move` command
    Move {
        /// Command name (e.g. absolute, forward)
        name: String,
        /// Raw position, if the command takes one
        #[arg(allow_negative_numbers = true)]
        value: Option<i32>,
    },
    /// Send a `do` command
    Do {
        /// Command name (e.g. stop, save_user_data)
        name: String,
    },
    /// Move to the home position
    Home {
        /// Home anticlockwise (rotary devices)
        #[arg(long)]
        anticlockwise: bool,
    },
    /// Print the position in device units
    Position,
    /// Move to a position in device units (degrees, millimeters or slot)
    Goto {
        /// Target
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },
    /// Move one jog step
    Jog {
        /// forward or backward
        direction: Direction,
    },
    /// Move the device to another bus address
    ChangeAddress {
        /// New address, one hex digit
        address: Address,
    },
    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load_from(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    if let Some(port) = cli.port {
        settings.serial.port = port;
    }
    if let Some(address) = cli.address {
        settings.device.address = address;
    }
    if let Some(kind) = cli.kind {
        settings.device.kind = Some(kind);
    }

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.logging.level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Config = cli.command {
        print!("{}", settings.to_toml()?);
        return Ok(());
    }

    let controller = Controller::open_serial(&settings.serial)?;
    debug!(port = controller.name(), "Controller ready");
    let motor = Motor::connect(controller.clone(), settings.device.address)?;
    let result = run(cli.command, motor, &settings);
    controller.close()?;
    result
}

fn run(command: Commands, mut motor: Motor, settings: &Settings) -> Result<()> {
    match command {
        Commands::Info => println!("{motor}"),
        Commands::Status => print_status(&motor.status()?),
        Commands::Get { name } => print_status(&motor.get(&name)?),
        Commands::Set { name, value, raw } => {
            let payload = if raw {
                Payload::Raw(value)
            } else {
                Payload::Int(
                    value
                        .parse()
                        .with_context(|| format!("'{value}' is not an integer (use --raw)"))?,
                )
            };
            print_status(&motor.set(&name, payload)?);
        }
        Commands::Move { name, value } => {
            print_status(&motor.movement(&name, value.map(Payload::Int))?);
        }
        Commands::Do { name } => print_status(&motor.action(&name)?),
        Commands::Home { anticlockwise } => {
            let direction = if anticlockwise {
                HomeDirection::Anticlockwise
            } else {
                HomeDirection::Clockwise
            };
            print_status(&motor.home(direction)?);
        }
        Commands::ChangeAddress { address } => {
            let status = motor.change_address(address)?;
            print_status(&status);
            println!("Address: {}", motor.address());
        }
        Commands::Position => {
            let device = TypedDevice::new(motor, settings)?;
            print_value(device.position()?);
        }
        Commands::Goto { value } => {
            let device = TypedDevice::new(motor, settings)?;
            print_value(device.goto(value)?);
        }
        Commands::Jog { direction } => {
            let device = TypedDevice::new(motor, settings)?;
            print_value(device.jog(direction)?);
        }
        Commands::Config => print!("{}", settings.to_toml()?),
    }
    Ok(())
}

fn print_status(status: &Status) {
    println!("{status}");
}

fn print_value(value: Option<String>) {
    match value {
        Some(value) => println!("{value}"),
        None => println!("(indeterminate)"),
    }
}

/// A connected device of the configured kind.
enum TypedDevice {
    Rotator(Rotator),
    Linear(LinearStage),
    Iris(Iris),
    Slider(Slider),
    Shutter(Shutter),
}

impl TypedDevice {
    fn new(motor: Motor, settings: &Settings) -> Result<Self> {
        let kind = settings
            .device
            .kind
            .or_else(|| motor.descriptor().map(|d| d.kind))
            .ok_or_else(|| {
                anyhow!(
                    "Unknown motor type {}; pass --kind",
                    motor.info().motor_type
                )
            })?;
        let options: DeviceOptions = settings.device.options();

        Ok(match kind {
            DeviceKind::Rotator => TypedDevice::Rotator(Rotator::from_motor(motor, &options)?),
            DeviceKind::Linear => TypedDevice::Linear(LinearStage::from_motor(motor, &options)?),
            DeviceKind::Iris => TypedDevice::Iris(Iris::from_motor(motor, &options)?),
            DeviceKind::Slider => TypedDevice::Slider(Slider::from_motor(motor, &options)?),
            DeviceKind::Shutter => TypedDevice::Shutter(Shutter::from_motor(motor, &options)?),
        })
    }

    fn position(&self) -> Result<Option<String>> {
        Ok(match self {
            TypedDevice::Rotator(d) => d.get_angle()?.map(|v| format!("{v} deg")),
            TypedDevice::Linear(d) => d.get_distance()?.map(|v| format!("{v} mm")),
            TypedDevice::Iris(d) => d.get_aperture()?.map(|v| format!("{v} mm")),
            TypedDevice::Slider(d) => d.get_slot()?.map(|v| format!("slot {v}")),
            TypedDevice::Shutter(d) => d.get_slot()?.map(|v| format!("slot {v}")),
        })
    }

    fn goto(&self, value: f64) -> Result<Option<String>> {
        Ok(match self {
            TypedDevice::Rotator(d) => d.set_angle(value)?.map(|v| format!("{v} deg")),
            TypedDevice::Linear(d) => d.set_distance(value)?.map(|v| format!("{v} mm")),
            TypedDevice::Iris(d) => d.set_aperture(value)?.map(|v| format!("{v} mm")),
            TypedDevice::Slider(d) => d.set_slot(slot(value)?)?.map(|v| format!("slot {v}")),
            TypedDevice::Shutter(d) => d.set_slot(slot(value)?)?.map(|v| format!("slot {v}")),
        })
    }

    fn jog(&self, direction: Direction) -> Result<Option<String>> {
        Ok(match self {
            TypedDevice::Rotator(d) => d.jog(direction)?.map(|v| format!("{v} deg")),
            TypedDevice::Linear(d) => d.jog(direction)?.map(|v| format!("{v} mm")),
            TypedDevice::Iris(d) => d.jog(direction)?.map(|v| format!("{v} mm")),
            TypedDevice::Slider(d) => d.jog(direction)?.map(|v| format!("slot {v}")),
            TypedDevice::Shutter(d) => d.jog(direction)?.map(|v| format!("slot {v}")),
        })
    }
}

fn slot(value: f64) -> Result<usize> {
    if value.fract() != 0.0 || value < 1.0 {
        return Err(anyhow!("'{value}' is not a slot number"));
    }
    Ok(value as usize)
}
