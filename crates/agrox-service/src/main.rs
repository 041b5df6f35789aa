//! AgroX device service - acquisition loop and HTTP API.
//!
//! Run with: `cargo run -p agrox-service -- --simulate`

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use agrox_core::{
    AcquisitionStatus, Camera, GpioIndicator, IioSensor, MockCamera, MockIndicator, MockSensor,
    NoIndicator, Sensor, SharedState, StatusIndicator, StillCamera,
};
use agrox_service::config::default_config_path;
use agrox_service::{
    AcquisitionLoop, AppState, Config, ControlSurface, HttpUploader, UploadSettings,
};
use agrox_store::Archive;
use agrox_types::IndicatorState;

/// AgroX device service - acquisition loop and HTTP REST API.
#[derive(Parser, Debug)]
#[command(name = "agrox-service")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config).
    #[arg(short, long)]
    bind: Option<String>,

    /// Data directory for images and logs (overrides config).
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Upload server URL (overrides config and SERVER_URL).
    #[arg(long)]
    server_url: Option<String>,

    /// Use simulated sensor, camera and LEDs.
    #[arg(long)]
    simulate: bool,

    /// Disable the acquisition loop (API only mode).
    #[arg(long)]
    no_acquisition: bool,

    /// Write the effective configuration to the config file and exit.
    #[arg(long)]
    write_config: bool,
}

/// Device handles opened at startup.
struct Hardware {
    sensor: Result<Arc<dyn Sensor>, agrox_core::Error>,
    camera: Option<Arc<dyn Camera>>,
    indicator: Arc<dyn StatusIndicator>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("agrox_service=info".parse()?)
                .add_directive("agrox_core=info".parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .init();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default().unwrap_or_else(|e| {
            warn!("{}; using defaults", e);
            Config::default()
        }),
    };
    config.apply_env_overrides();

    // Override config with CLI args
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(data_dir) = args.data_dir {
        config.storage.data_dir = data_dir;
    }
    if let Some(server_url) = args.server_url {
        config.upload.server_url = server_url;
    }
    config.validate()?;

    if args.write_config {
        let path = args.config.unwrap_or_else(default_config_path);
        config.save(&path)?;
        info!("Wrote configuration to {}", path.display());
        return Ok(());
    }

    let archive = Arc::new(Archive::open(&config.storage.data_dir)?);
    let shared = Arc::new(SharedState::new());

    let hardware = if args.simulate {
        info!("Running with simulated hardware");
        simulated_hardware()
    } else {
        open_hardware(&config).await
    };

    if let Err(e) = hardware.indicator.set_state(IndicatorState::Inactive).await {
        warn!("Failed to initialize indicator: {}", e);
    }

    let uploader = Arc::new(HttpUploader::new(config.upload.timeout())?);
    let control = ControlSurface::new(
        Arc::clone(&shared),
        Arc::clone(&archive),
        Arc::clone(&hardware.indicator),
        uploader,
        UploadSettings::from(&config.upload),
    );
    let state = AppState::new(control);

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    let acquisition = match hardware.sensor {
        _ if args.no_acquisition => {
            info!("Acquisition disabled");
            shared.set_status(AcquisitionStatus::Stopped);
            None
        }
        Ok(sensor) => {
            let acquisition = AcquisitionLoop::new(
                sensor,
                hardware.camera,
                Arc::clone(&hardware.indicator),
                Arc::clone(&shared),
                archive,
            )
            .with_periods(config.acquisition.periods())
            .with_capture_interval(config.acquisition.capture_interval());
            Some(acquisition.spawn(cancel.clone()))
        }
        Err(e) => {
            error!("No sensor, serving API without acquisition: {}", e);
            shared.mark_failed(e.to_string());
            None
        }
    };

    let app = agrox_service::app(state);

    // Parse bind address
    let addr: SocketAddr = config.server.bind.parse()?;

    info!("Starting server on {}", addr);

    // Run the server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.clone().cancelled_owned())
        .await?;

    // The server can also stop on its own; make sure acquisition follows.
    cancel.cancel();
    match acquisition {
        Some(handle) => {
            if let Err(e) = handle.await {
                error!("Acquisition task panicked: {}", e);
            }
        }
        None => {
            if let Err(e) = hardware.indicator.reset().await {
                warn!("Failed to reset indicator: {}", e);
            }
        }
    }

    info!("Shutdown complete");
    Ok(())
}

fn simulated_hardware() -> Hardware {
    Hardware {
        sensor: Ok(Arc::new(MockSensor::drifting())),
        camera: Some(Arc::new(MockCamera::new())),
        indicator: Arc::new(MockIndicator::new()),
    }
}

async fn open_hardware(config: &Config) -> Hardware {
    let sensor = match &config.sensor.device {
        Some(dir) => IioSensor::open(dir).await,
        None => IioSensor::discover().await,
    }
    .map(|sensor| {
        info!("Using sensor {}", sensor.device_dir().display());
        Arc::new(sensor) as Arc<dyn Sensor>
    });

    let camera = if config.camera.enabled {
        let camera = StillCamera::new(config.camera.program.clone())
            .with_args(config.camera.extra_args.clone())
            .with_timeout(config.camera.capture_timeout());
        match camera.probe().await {
            Ok(()) => Some(Arc::new(camera) as Arc<dyn Camera>),
            Err(e) => {
                warn!("Camera not available: {}", e);
                None
            }
        }
    } else {
        info!("Camera disabled in configuration");
        None
    };

    let indicator: Arc<dyn StatusIndicator> = if config.indicator.enabled {
        match GpioIndicator::open(config.indicator.pins(), config.indicator.blink()).await {
            Ok(indicator) => Arc::new(indicator),
            Err(e) => {
                warn!("Status LEDs not available: {}", e);
                Arc::new(NoIndicator)
            }
        }
    } else {
        Arc::new(NoIndicator)
    };

    Hardware {
        sensor,
        camera,
        indicator,
    }
}

/// Cancel `cancel` on SIGINT or SIGTERM.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
    cancel.cancel();
}
