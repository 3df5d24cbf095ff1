use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use createbot_core::behavior::{run_session, BehaviorKind};
use createbot_core::config::RobotConfig;
use createbot_core::protocol::{list_ports, BaudRate, Mode, Robot, SensorPacket};
use createbot_core::sim::SimulatedCreate;

#[derive(ValueEnum, Copy, Clone, Debug)]
enum ModeArg {
    Safe,
    Full,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Safe => Mode::Safe,
            ModeArg::Full => Mode::Full,
        }
    }
}

#[derive(ValueEnum, Copy, Clone, Debug)]
enum WallSensorArg {
    /// Right light-bumper signal (packet 51)
    LightBumpRight,
    /// Wall signal (packet 27)
    Wall,
}

impl From<WallSensorArg> for SensorPacket {
    fn from(sensor: WallSensorArg) -> Self {
        match sensor {
            WallSensorArg::LightBumpRight => SensorPacket::LightBumpRightSignal,
            WallSensorArg::Wall => SensorPacket::WallSignal,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Serial device the robot is attached to
    #[arg(short = 'p', long, global = true)]
    port: Option<String>,

    /// Serial baud rate
    #[arg(short = 'b', long, global = true)]
    baud: Option<u32>,

    /// Open Interface mode entered after start
    #[arg(short = 'm', long, value_enum, global = true)]
    mode: Option<ModeArg>,

    /// JSON configuration file
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Run against the built-in simulated robot instead of a serial port
    #[arg(long, global = true)]
    simulate: bool,

    /// Log every byte sent and debug-level tick data
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List serial ports the robot may be attached to
    Ports,
    /// Light LEDs for pressed bumpers while the power LED fades
    BumpLights,
    /// Back away from obstacles, showing wall distance on the power LED
    BumpRetreat,
    /// Drive a square and play a song at the end
    Square,
    /// Find a wall and follow it with PI steering
    WallFollow {
        /// Sensor used to measure the distance to the wall
        #[arg(long, value_enum)]
        sensor: Option<WallSensorArg>,
    },
    /// Strafe across the floor looking for a bright card
    CardSearch {
        /// Number of strafe passes
        #[arg(long)]
        passes: Option<u32>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Config file (or defaults) with command line overrides applied
fn resolve_config(args: &Args) -> Result<RobotConfig> {
    let mut config = match &args.config {
        Some(path) => RobotConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RobotConfig::default(),
    };

    if let Some(port) = &args.port {
        config.connection.port_name = port.clone();
    }
    if let Some(bps) = args.baud {
        config.connection.baud = BaudRate::from_bits_per_second(bps)
            .ok_or_else(|| anyhow!("Unsupported baud rate {}", bps))?;
    }
    if let Some(mode) = args.mode {
        config.connection.mode = mode.into();
    }
    config.connection.verbose |= args.verbose;

    match &args.command {
        Command::WallFollow {
            sensor: Some(sensor),
        } => config.wall_follow.wall_sensor = (*sensor).into(),
        Command::CardSearch {
            passes: Some(passes),
        } => config.card_search.passes = *passes,
        _ => {}
    }
    Ok(config)
}

fn print_ports() {
    let ports = list_ports();
    if ports.is_empty() {
        println!("No serial ports found");
        return;
    }
    for port in ports {
        match port.product {
            Some(product) => println!("{}\t{}", port.name, product),
            None => println!("{}", port.name),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let kind = match args.command {
        Command::Ports => {
            print_ports();
            return Ok(());
        }
        Command::BumpLights => BehaviorKind::BumpLights,
        Command::BumpRetreat => BehaviorKind::BumpRetreat,
        Command::Square => BehaviorKind::SquareLap,
        Command::WallFollow { .. } => BehaviorKind::WallFollow,
        Command::CardSearch { .. } => BehaviorKind::CardSearch,
    };

    let config = resolve_config(&args)?;
    let mut robot = if args.simulate {
        info!("Using simulated robot");
        Robot::new(Box::new(SimulatedCreate::demo()), &config.connection)
    } else {
        Robot::open(&config.connection)
            .with_context(|| format!("Failed to open {}", config.connection.port_name))?
    };

    let mut behavior = kind.create(&config);
    let summary = run_session(&mut robot, behavior.as_mut(), config.connection.mode)
        .with_context(|| format!("{} failed", behavior.name()))?;
    robot.close();

    let counters = robot.counters();
    info!(
        "Done: {} ticks, {} commands, {} bytes out, {} bytes in",
        summary.ticks, counters.commands_sent, counters.bytes_sent, counters.bytes_received
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn test_overrides_apply() {
        let args = Args::parse_from([
            "createbot",
            "--port",
            "/dev/ttyACM1",
            "--baud",
            "57600",
            "--mode",
            "safe",
            "wall-follow",
            "--sensor",
            "wall",
        ]);
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.connection.port_name, "/dev/ttyACM1");
        assert_eq!(config.connection.baud, BaudRate::B57600);
        assert_eq!(config.connection.mode, Mode::Safe);
        assert_eq!(config.wall_follow.wall_sensor, SensorPacket::WallSignal);
    }

    #[test]
    fn test_rejects_unknown_baud() {
        let args = Args::parse_from(["createbot", "--baud", "12345", "square"]);
        assert!(resolve_config(&args).is_err());
    }
}
