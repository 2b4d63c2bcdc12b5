use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use sayonara_autowipe::config::DEFAULT_CONFIG_PATH;
use sayonara_autowipe::drives::{DriveDetector, SystemCommands};
use sayonara_autowipe::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sayonara-autowipe")]
#[command(about = "Unattended destruction of every disk attached after startup")]
#[command(version = "1.0.0")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file
    #[arg(short, long, global = true, env = "SAYONARA_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Disable safety checks (DANGEROUS!)
    #[arg(long, global = true)]
    unsafe_mode: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Delay between device scans (e.g. 500ms, 2s)
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    poll_interval: Option<Duration>,

    /// Random overwrite passes before the final zero pass
    #[arg(long, global = true)]
    passes: Option<u32>,

    /// Devices never wiped, comma separated (replaces the configured list)
    #[arg(long, global = true, value_delimiter = ',')]
    exclude: Option<Vec<String>>,

    /// What to do when discard fails on a solid-state drive
    #[arg(long, global = true, value_enum)]
    ssd_fallback: Option<SsdFallbackArg>,

    /// Whether a removed and reattached disk is wiped again
    #[arg(long, global = true, value_enum)]
    rediscovery: Option<RediscoveryArg>,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch for new disks and wipe them (default)
    Watch,

    /// List disks that would be eligible for wiping
    List,

    /// Classify and wipe a single device now
    Wipe {
        /// Device path (e.g., /dev/sdb)
        device: String,

        /// Confirm destruction of all data on the device
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum SsdFallbackArg {
    None,
    Overwrite,
}

#[derive(Clone, Copy, ValueEnum)]
enum RediscoveryArg {
    Remember,
    Forget,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = init_logging(cli.debug, cli.log_format, cli.log_file.as_deref())?;

    setup_signal_handlers()?;

    let config = load_config(&cli)?;

    match cli.command.unwrap_or(Commands::Watch) {
        Commands::Watch => {
            require_root(cli.unsafe_mode)?;
            watch(config).await?;
        }
        Commands::List => {
            list_devices(&config);
        }
        Commands::Wipe { device, yes } => {
            require_root(cli.unsafe_mode)?;
            if !yes {
                bail!("Refusing to wipe {} without --yes", device);
            }
            wipe_one(&config, &device).await?;
        }
    }

    Ok(())
}

fn init_logging(
    debug: bool,
    format: LogFormat,
    log_file: Option<&Path>,
) -> Result<Option<WorkerGuard>> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let mut guard = None;
    let writer = match log_file {
        Some(path) => {
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Invalid log filename: {}", path.display()))?;
            let directory = match path.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir,
                _ => Path::new("."),
            };
            std::fs::create_dir_all(directory)
                .with_context(|| format!("Failed to create log directory {}", directory.display()))?;

            let file_appender = tracing_appender::rolling::never(directory, file_name);
            let (non_blocking, g) = tracing_appender::non_blocking(file_appender);
            guard = Some(g);
            BoxMakeWriter::new(std::io::stderr.and(non_blocking))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(log_file.is_none())
        .with_target(false);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }

    Ok(guard)
}

/// File and environment first, then command-line overrides
fn load_config(cli: &Cli) -> Result<AutoWipeConfig> {
    let mut config = AutoWipeConfig::load(cli.config.as_deref())?;

    let overrides = ConfigOverrides {
        poll_interval: cli.poll_interval,
        overwrite_passes: cli.passes,
        exclude: cli.exclude.clone(),
        ssd_fallback: cli.ssd_fallback.map(|fallback| match fallback {
            SsdFallbackArg::None => SsdFallback::None,
            SsdFallbackArg::Overwrite => SsdFallback::Overwrite,
        }),
        rediscovery: cli.rediscovery.map(|policy| match policy {
            RediscoveryArg::Remember => RediscoveryPolicy::Remember,
            RediscoveryArg::Forget => RediscoveryPolicy::Forget,
        }),
    };
    config.apply_overrides(&overrides)?;

    tracing::debug!(
        config_file = %cli
            .config
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH))
            .display(),
        ?config,
        "Configuration loaded"
    );

    Ok(config)
}

fn require_root(unsafe_mode: bool) -> Result<()> {
    if unsafe_mode {
        tracing::warn!("Safety checks disabled by --unsafe-mode");
        return Ok(());
    }
    if !is_root() {
        bail!("This program requires root privileges. Please run with sudo or as root user.");
    }
    Ok(())
}

fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

async fn watch(config: AutoWipeConfig) -> Result<()> {
    if config.exclude.is_empty() {
        tracing::warn!("No exclusions configured, every disk attached later will be wiped");
    }

    let commands = Arc::new(SystemCommands::from_config(&config));
    let mut orchestrator = WipeOrchestrator::new(config, commands);
    let stats = orchestrator.run().await;

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn list_devices(config: &AutoWipeConfig) {
    let detector = DriveDetector::from_config(config);
    let devices = detector.enumerate();

    if devices.is_empty() {
        println!("No eligible devices found.");
        return;
    }

    println!("{:<16} {}", "DEVICE", "MEDIA");
    for device in &devices {
        let media = match detector.media_type(device) {
            Ok(media) => media.to_string(),
            Err(e) => format!("unknown ({})", e),
        };
        println!("{:<16} {}", device, media);
    }
}

async fn wipe_one(config: &AutoWipeConfig, device: &str) -> Result<()> {
    let detector = DriveDetector::from_config(config);
    let target = detector.resolve_target(device)?;

    let commands = SystemCommands::from_config(config);
    let wipe = config.wipe.clone();
    let report =
        tokio::task::spawn_blocking(move || wipe_device(&commands, &detector, &target, &wipe))
            .await
            .context("Wipe task aborted")?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.outcome.is_success() {
        bail!("Wipe of {} did not complete: {}", report.device_path, report.outcome);
    }
    Ok(())
}

// Signal handler for graceful shutdown
fn setup_signal_handlers() -> Result<()> {
    use signal_hook::{
        consts::{SIGINT, SIGTERM},
        iterator::Signals,
    };

    let mut signals = Signals::new([SIGINT, SIGTERM])?;

    std::thread::spawn(move || {
        for sig in signals.forever() {
            if sig == SIGINT || sig == SIGTERM {
                tracing::warn!(
                    signal = sig,
                    "Interrupt received, stopping after the current wipe"
                );
                sayonara_autowipe::set_interrupted();
            }
        }
    });

    Ok(())
}
