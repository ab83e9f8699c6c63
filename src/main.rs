//! media-storage
//!
//! Command-line front end for removable media device ids: build and
//! inspect ids, check attachment, resolve paths and watch the mount table.

use clap::{Parser, Subcommand, ValueEnum};
use futures::future::join_all;
use serde_json::json;
use std::path::PathBuf;
#[cfg(target_os = "linux")]
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use media_storage_util::{
    make_device_id, platform_registry, DeviceId, DeviceRegistry, DeviceType, Error,
    MediaStorageConfig, MediaStorageUtil, Result,
};
#[cfg(target_os = "linux")]
use media_storage_util::{MountTableRegistry, MountWatcher};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Removable media device ids and attachment checks
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(long, env = "MEDIA_STORAGE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Mount table to read (overrides config)
    #[arg(long, env = "MOUNTS_PATH", global = true)]
    mounts_path: Option<PathBuf>,

    /// Mount table refresh interval in seconds (overrides config)
    #[arg(long, env = "POLL_INTERVAL_SECS", global = true)]
    poll_interval_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON", global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a device id from a type and unique id
    MakeId {
        #[arg(long = "type", value_enum)]
        device_type: DeviceTypeArg,
        unique_id: String,
    },
    /// Split a device id into type and unique id
    Crack { device_id: String },
    /// Report media/removable/mass-storage flags for a device id
    Classify { device_id: String },
    /// Check whether devices are attached
    Attached {
        #[arg(required = true)]
        device_ids: Vec<String>,
    },
    /// Resolve an absolute path to the device that holds it
    Info { path: PathBuf },
    /// Print the current location of a device
    Find { device_id: String },
    /// List attached removable devices
    List,
    /// Print attach/detach events until interrupted
    Watch,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DeviceTypeArg {
    Dcim,
    Nodcim,
    Path,
    Mtp,
}

impl From<DeviceTypeArg> for DeviceType {
    fn from(arg: DeviceTypeArg) -> Self {
        match arg {
            DeviceTypeArg::Dcim => DeviceType::RemovableMassStorageWithDcim,
            DeviceTypeArg::Nodcim => DeviceType::RemovableMassStorageNoDcim,
            DeviceTypeArg::Path => DeviceType::FixedMassStorage,
            DeviceTypeArg::Mtp => DeviceType::MtpOrPtp,
        }
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    let config = load_config(&args)?;

    match args.command {
        Command::MakeId {
            device_type,
            unique_id,
        } => {
            if unique_id.is_empty() {
                return Err(Error::InvalidArgument("unique id must not be empty".into()));
            }
            println!("{}", make_device_id(device_type.into(), &unique_id));
        }
        Command::Crack { device_id } => {
            let id = DeviceId::parse(&device_id)?;
            print_json(&json!({
                "type": id.device_type(),
                "uniqueId": id.unique_id(),
            }))?;
        }
        Command::Classify { device_id } => {
            let id = DeviceId::parse(&device_id)?;
            print_json(&json!({
                "deviceId": id,
                "media": id.is_media(),
                "removable": id.is_removable(),
                "massStorage": id.is_mass_storage(),
            }))?;
        }
        Command::Attached { device_ids } => {
            let ids = device_ids
                .iter()
                .map(|id| DeviceId::parse(id))
                .collect::<Result<Vec<_>>>()?;
            let util = build_util(&config)?;
            let checks = ids.iter().map(|id| util.is_device_attached(id.as_str()));
            let results = join_all(checks).await;
            for (id, attached) in ids.iter().zip(results) {
                println!("{}\t{}", id, attached);
            }
        }
        Command::Info { path } => {
            let util = build_util(&config)?;
            let info = util.device_info_from_path(&path).ok_or_else(|| {
                Error::InvalidArgument(format!("{} is not an absolute path", path.display()))
            })?;
            print_json(&info)?;
        }
        Command::Find { device_id } => {
            let id = DeviceId::parse(&device_id)?;
            let util = build_util(&config)?;
            match util.find_device_path_by_id(id.as_str()) {
                Some(path) => println!("{}", path.display()),
                None => {
                    return Err(Error::DeviceNotFound {
                        device_id: id.to_string(),
                    })
                }
            }
        }
        Command::List => {
            let registry = platform_registry(&config)?;
            print_json(&registry.attached_devices())?;
        }
        Command::Watch => run_watch(config).await?,
    }

    Ok(())
}

fn load_config(args: &Args) -> Result<MediaStorageConfig> {
    let mut config = match &args.config {
        Some(path) => MediaStorageConfig::load(path)?,
        None => MediaStorageConfig::default(),
    };
    if let Some(mounts_path) = &args.mounts_path {
        config.mounts_path = mounts_path.clone();
    }
    if let Some(secs) = args.poll_interval_secs {
        config.poll_interval_secs = secs;
    }
    config.validate()?;
    Ok(config)
}

fn build_util(config: &MediaStorageConfig) -> Result<MediaStorageUtil> {
    Ok(MediaStorageUtil::new(platform_registry(config)?))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(target_os = "linux")]
async fn run_watch(config: MediaStorageConfig) -> Result<()> {
    let registry = Arc::new(MountTableRegistry::new(config));
    // The first refresh reports already-mounted devices as attach events
    let mut events = registry.subscribe();

    let watcher = MountWatcher::new(registry.clone())?;
    let cancel = watcher.cancellation_token();
    let mut handle = watcher.spawn();

    tracing::info!("Watching for removable devices; press Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
                break;
            }
            result = &mut handle => {
                return result
                    .map_err(|e| Error::Internal(format!("Watcher task failed: {}", e)))?;
            }
            event = events.recv() => match event {
                Ok(event) => println!("{}", serde_json::to_string(&event)?),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Dropped {} events", skipped);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    handle
        .await
        .map_err(|e| Error::Internal(format!("Watcher task failed: {}", e)))?
}

/// Only Linux has a mount table to watch
#[cfg(not(target_os = "linux"))]
async fn run_watch(_config: MediaStorageConfig) -> Result<()> {
    Err(Error::Configuration(
        "watch needs the Linux mount table and is not supported on this platform".to_string(),
    ))
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
