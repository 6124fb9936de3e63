//! ONVIF Bridge
//!
//! Presents one RTSP stream as an ONVIF Profile S camera so NVRs can find it
//! with WS-Discovery and add it like any other camera.
//!
//! ## Usage
//!
//! ```bash
//! # Write a config with generated credentials
//! onvif-bridge init
//!
//! # Run from the config file
//! onvif-bridge
//!
//! # Or configure entirely from the environment
//! RTSP_URL=rtsp://10.0.0.5:8554/cam ONVIF_PORT=8000 onvif-bridge
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand};
use config_manager::{BridgeConfig, ConfigOverrides, DeviceConfig};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use ws_discovery::{DiscoverySettings, Endpoint, Responder};

/// How long in-flight requests and the discovery Bye get after a signal
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "onvif-bridge")]
#[command(about = "Expose an RTSP stream as an ONVIF Profile S camera")]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/onvif-bridge/bridge.toml)
    #[arg(short, long, env = "ONVIF_BRIDGE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `onvif_server=debug` (default: RUST_LOG, then info)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(flatten)]
    overrides: OverrideArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file with generated credentials
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Settings layered over the config file
#[derive(Args)]
struct OverrideArgs {
    /// RTSP URL returned from GetStreamUri
    #[arg(long, env = "RTSP_URL")]
    rtsp_url: Option<String>,

    /// HTTP port for the ONVIF services
    #[arg(long, env = "ONVIF_PORT")]
    onvif_port: Option<u16>,

    /// Address advertised in service URLs and XAddrs
    #[arg(long, env = "SERVER_IP")]
    server_ip: Option<IpAddr>,

    #[arg(long, env = "CAMERA_NAME")]
    camera_name: Option<String>,

    #[arg(long, env = "CAMERA_MANUFACTURER")]
    manufacturer: Option<String>,

    #[arg(long, env = "CAMERA_MODEL")]
    model: Option<String>,

    #[arg(long, env = "CAMERA_SERIAL")]
    serial: Option<String>,

    #[arg(long, env = "HARDWARE_ID")]
    hardware_id: Option<String>,

    #[arg(long, env = "ONVIF_USERNAME")]
    username: Option<String>,

    #[arg(long, env = "ONVIF_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[arg(long, env = "STREAM_WIDTH")]
    width: Option<u32>,

    #[arg(long, env = "STREAM_HEIGHT")]
    height: Option<u32>,

    #[arg(long, env = "STREAM_FPS")]
    fps: Option<u32>,

    /// Bitrate in kbit/s
    #[arg(long, env = "STREAM_BITRATE")]
    bitrate: Option<u32>,

    /// Answer WS-Discovery probes (true/false)
    #[arg(long, env = "ENABLE_DISCOVERY", value_parser = BoolishValueParser::new())]
    discovery: Option<bool>,
}

impl From<OverrideArgs> for ConfigOverrides {
    fn from(args: OverrideArgs) -> Self {
        Self {
            rtsp_url: args.rtsp_url,
            http_port: args.onvif_port,
            server_ip: args.server_ip,
            camera_name: args.camera_name,
            manufacturer: args.manufacturer,
            model: args.model,
            serial_number: args.serial,
            hardware_id: args.hardware_id,
            username: args.username,
            password: args.password,
            width: args.width,
            height: args.height,
            fps: args.fps,
            bitrate_kbps: args.bitrate,
            discovery: args.discovery,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref())?;

    match cli.command {
        Some(Command::Init { force }) => init_config(cli.config, force),
        None => tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?
            .block_on(run(cli.config, cli.overrides.into())),
    }
}

fn init_logging(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level).context("invalid --log-level")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn init_config(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => BridgeConfig::default_path()?,
    };
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to replace it)",
            path.display()
        );
    }

    let config = BridgeConfig::generate_default();
    config.save_to(&path)?;

    println!("Config written to {}", path.display());
    println!("ONVIF username: {}", config.auth.username);
    println!("ONVIF password: {}", config.auth.password);
    println!("Edit stream.url before starting the bridge.");
    Ok(())
}

async fn run(config_path: Option<PathBuf>, overrides: ConfigOverrides) -> Result<()> {
    let mut config = BridgeConfig::load_or_default(config_path.as_deref())
        .context("failed to load configuration")?;
    config.apply(overrides);

    let device = Arc::new(DeviceConfig::from_config(&config).context("invalid configuration")?);

    info!(
        "Camera: {} ({} {})",
        device.name, device.descriptor.manufacturer, device.descriptor.model
    );
    info!("Stream: {}", device.stream_uri_masked());
    info!("Device service: {}", device.device_service_url());
    let auth = onvif_server::authenticator(&config.auth);
    match &auth {
        Some(auth) if auth.is_required() => {
            info!("Authentication required for user {}", auth.username())
        }
        Some(auth) => info!("Authentication optional for user {}", auth.username()),
        None => warn!("No ONVIF credentials configured, authentication disabled"),
    }

    // Bind everything before serving so a busy port fails the start
    let listener =
        onvif_server::bind(SocketAddr::new(config.network.bind, config.network.http_port)).await?;
    let responder = if config.discovery.enabled {
        let settings = DiscoverySettings::from_config(&config.discovery);
        Some(Responder::bind(settings, Endpoint::from_device(&device))?)
    } else {
        info!("WS-Discovery disabled");
        None
    };

    let registry = Arc::new(onvif_server::default_registry(device, auth));
    let shutdown = CancellationToken::new();
    let tracker = TaskTracker::new();

    let server_shutdown = shutdown.clone();
    tracker.spawn(async move {
        let result =
            onvif_server::run_onvif_server(listener, registry, server_shutdown.clone()).await;
        if let Err(e) = result {
            error!("ONVIF server failed: {:#}", e);
            server_shutdown.cancel();
        }
    });

    if let Some(responder) = responder {
        let discovery_shutdown = shutdown.clone();
        tracker.spawn(async move {
            if let Err(e) = responder.run(discovery_shutdown).await {
                error!("WS-Discovery responder failed: {:#}", e);
            }
        });
    }
    tracker.close();

    tokio::select! {
        result = wait_for_signal() => {
            result?;
            shutdown.cancel();
        }
        _ = shutdown.cancelled() => {}
    }

    if tokio::time::timeout(SHUTDOWN_GRACE, tracker.wait()).await.is_err() {
        warn!("Shutdown timed out after {}s", SHUTDOWN_GRACE.as_secs());
    }
    info!("Bridge stopped");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_signal() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down...");
    Ok(())
}
