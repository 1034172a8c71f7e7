//! # Field Telemetry
//!
//! GPS position telemetry over LoRa.
//!
//! `transmit` runs on a field node: it finds the GPS receiver and the radio
//! modem, then sends one position record per interval. `receive` runs on the
//! base station: it records every line the modem reports in SQLite and CSV.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use argh::FromArgs;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use field_telemetry::config::Config;
use field_telemetry::discovery::ByIdDirectory;
use field_telemetry::receiver::Receiver;
use field_telemetry::serial::{open_port, TokioSerialPort};
use field_telemetry::sink::PersistenceSink;
use field_telemetry::transmitter::Transmitter;

/// File name prefix for daily rolling log files
const LOG_FILE_PREFIX: &str = "field-telemetry.log";

#[derive(FromArgs, Debug, PartialEq)]
/// GPS telemetry over LoRa
struct Cli {
    /// configuration file (TOML); built-in defaults when omitted
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs, Debug, PartialEq)]
#[argh(subcommand)]
enum Command {
    Transmit(TransmitArgs),
    Receive(ReceiveArgs),
}

#[derive(FromArgs, Debug, PartialEq)]
/// Send GPS fixes over the radio link (field node)
#[argh(subcommand, name = "transmit")]
struct TransmitArgs {}

#[derive(FromArgs, Debug, PartialEq)]
/// Record received lines in the store and CSV log (base station)
#[argh(subcommand, name = "receive")]
struct ReceiveArgs {
    /// receiving antenna label; overrides the configured one
    #[argh(option)]
    antenna: Option<String>,
}

/// Main entry point
///
/// # Control Flow
///
/// 1. Parse arguments and load configuration
/// 2. Initialize logging (console, plus a daily file when `[logging] log_dir`
///    is set); a configuration error is logged to the console
/// 3. Run the selected role until Ctrl+C or a fatal error
///
/// # Errors
///
/// Returns error (non-zero exit) if:
/// - Configuration cannot be loaded
/// - A device is not found within the attempt limit
/// - A serial port or sink cannot be opened
/// - The send loop hits an unexpected fault
///
/// # Examples
///
/// ```bash
/// field-telemetry --config config/default.toml transmit
/// field-telemetry receive --antenna roof
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    let loaded = load_config(cli.config.as_deref());

    // Console logging comes up even when the configuration is unusable
    let log_dir = loaded.as_ref().ok().and_then(|config| config.logging.log_dir.clone());
    let _guard = init_logging(log_dir.as_deref());

    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!("Exiting: {:#}", e);
            return Err(e);
        }
    };

    info!("Field Telemetry v{} starting...", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Command::Transmit(_) => transmit(&config).await,
        Command::Receive(args) => {
            if let Some(antenna) = args.antenna {
                config.receiver.antenna = antenna;
            }
            receive(&config).await
        }
    };

    if let Err(e) = &result {
        error!("Exiting: {:#}", e);
    }
    result
}

/// Load the configuration file, or the built-in defaults without one
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(Config::default()),
    }
}

/// Set up the tracing subscriber
///
/// The returned guard flushes the file writer and must live until exit.
fn init_logging(log_dir: Option<&str>) -> Option<WorkerGuard> {
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}

/// Resolves on Ctrl+C; never resolves if the handler cannot be installed
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down..."),
        Err(e) => {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

/// Field node: discover devices, then send until interrupted
async fn transmit(config: &Config) -> Result<()> {
    let directory = ByIdDirectory::new(&config.discovery.by_id_dir);
    let mut transmitter = Transmitter::discover(
        &directory,
        &config.positioning.match_keyword,
        &config.radio.match_keyword,
        &config.discovery.retry_policy(),
        config.transmitter.settings(),
        |devices| {
            let gps = open_port(&devices.positioning, config.positioning.baud_rate)?;
            let radio = open_port(&devices.radio, config.radio.baud_rate)?;
            Ok((gps, TokioSerialPort::new(radio)))
        },
    )
    .await?;
    transmitter.run(shutdown_signal()).await?;

    info!("State: {}", transmitter.state());
    Ok(())
}

/// Base station: open both sinks and the modem, then record until interrupted
async fn receive(config: &Config) -> Result<()> {
    let receiver_config = &config.receiver;
    let sink = PersistenceSink::open(&receiver_config.store_path(), &receiver_config.log_path()).await?;
    info!("{} samples already stored", sink.store().count().await?);

    let radio = match open_port(Path::new(&receiver_config.serial_port), receiver_config.baud_rate) {
        Ok(radio) => radio,
        Err(e) => {
            sink.close().await?;
            return Err(e.into());
        }
    };

    let receiver = Receiver::new(
        radio,
        sink,
        receiver_config.antenna_label(),
        receiver_config.read_timeout(),
    );
    let received = receiver.run(shutdown_signal()).await?;
    info!("Recorded {} lines this session", received);
    Ok(())
}
