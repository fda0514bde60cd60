//! QR Scanner CLI
//!
//! Drives the scan loop at the capture frame rate and prints every scan.
//! Runs against real hardware when built with the `camera` feature, or
//! against the mock camera with `--mock`.

use clap::Parser;
use qrscan::{
    capture::{CameraError, CameraSource, ConfigError, DeviceInfo, DisplayOrientation, Facing, FileConfig, MockCamera},
    decode::{decode_image_file, DecodeError, RqrrDecoder},
    scan::{ScanError, ScanLog, ScanLoop},
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

#[cfg(feature = "metrics")]
use qrscan::metrics::{MetricsRegistry, MetricsServer, MetricsServerConfig, MetricsSnapshot, MetricsState};

/// Ticks between metrics updates.
#[cfg(feature = "metrics")]
const METRICS_EVERY: u64 = 30;

#[derive(Debug, Parser)]
#[command(name = "qrscan", version, about = "Scan QR codes from a live camera feed")]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Cooldown after each scan, in seconds.
    #[arg(long)]
    cooldown: Option<f32>,

    /// Preferred camera facing (front or back).
    #[arg(long)]
    facing: Option<Facing>,

    /// Use the mock camera instead of hardware.
    #[arg(long)]
    mock: bool,

    /// Decode a still image and exit. With --mock, replay it as the camera feed.
    #[arg(long)]
    image: Option<PathBuf>,

    /// List camera devices and exit.
    #[arg(long)]
    list_devices: bool,

    /// Stop after this many ticks.
    #[arg(long)]
    max_ticks: Option<u64>,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    info!("QR Scanner v{}", qrscan::VERSION);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    if cli.list_devices {
        let devices = if cli.mock {
            MockCamera::new().devices()
        } else {
            hardware_devices()
        };
        match devices {
            Ok(devices) => print_devices(&devices),
            Err(e) => {
                eprintln!("Error listing cameras: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    if let (Some(path), false) = (&cli.image, cli.mock) {
        let mut decoder = RqrrDecoder::new();
        match decode_image_file(path, &mut decoder) {
            Ok(Some(text)) => println!("{}", text),
            Ok(None) => {
                eprintln!("No QR code found in {}", path.display());
                std::process::exit(1);
            }
            Err(e) => {
                eprintln!("Failed to decode {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
        return;
    }

    let result = if cli.mock {
        match mock_camera(cli.image.as_deref()) {
            Ok(camera) => run(camera, &config, cli.max_ticks),
            Err(e) => {
                eprintln!("Failed to prepare mock camera: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        run_hardware(&config, cli.max_ticks)
    };

    if let Err(e) = result {
        eprintln!("Scanning failed: {}", e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<FileConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    if let Some(cooldown) = cli.cooldown {
        config.scan.cooldown_secs = cooldown;
    }
    if let Some(facing) = cli.facing {
        config.capture.facing = facing;
    }
    config.validate()?;
    Ok(config)
}

fn print_devices(devices: &[DeviceInfo]) {
    if devices.is_empty() {
        println!("No cameras found");
        return;
    }
    println!("Available cameras:");
    for device in devices {
        println!("  [{}] {} ({})", device.index, device.name, device.facing);
    }
}

fn mock_camera(image: Option<&Path>) -> Result<MockCamera, DecodeError> {
    let Some(path) = image else {
        return Ok(MockCamera::new().continuous());
    };
    let image = image::open(path)?.to_rgba8();
    let (width, height) = image.dimensions();
    MockCamera::from_rgba(width, height, image.into_raw())
        .map(MockCamera::continuous)
        .ok_or_else(|| DecodeError::Internal("image size does not match pixel data".to_string()))
}

#[cfg(feature = "camera")]
fn hardware_devices() -> Result<Vec<DeviceInfo>, CameraError> {
    qrscan::capture::list_devices()
}

#[cfg(not(feature = "camera"))]
fn no_hardware_support() -> CameraError {
    CameraError::DeviceNotFound("built without the `camera` feature; use --mock".to_string())
}

#[cfg(not(feature = "camera"))]
fn hardware_devices() -> Result<Vec<DeviceInfo>, CameraError> {
    Err(no_hardware_support())
}

#[cfg(feature = "camera")]
fn run_hardware(config: &FileConfig, max_ticks: Option<u64>) -> Result<(), ScanError> {
    let camera = qrscan::capture::NokhwaCamera::new(config.capture.clone());
    run(camera, config, max_ticks)
}

#[cfg(not(feature = "camera"))]
fn run_hardware(_config: &FileConfig, _max_ticks: Option<u64>) -> Result<(), ScanError> {
    Err(no_hardware_support().into())
}

#[cfg(feature = "metrics")]
fn spawn_metrics_server(port: u16) -> Option<Arc<tokio::sync::RwLock<MetricsState>>> {
    if port == 0 {
        return None;
    }
    let registry = match MetricsRegistry::new() {
        Ok(registry) => registry,
        Err(e) => {
            warn!(error = %e, "Metrics disabled");
            return None;
        }
    };
    let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry);
    let state = server.state();

    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!(error = %e, "Failed to start metrics runtime");
                return;
            }
        };
        if let Err(e) = runtime.block_on(server.run()) {
            warn!(error = %e, "Metrics server exited");
        }
    });

    Some(state)
}

fn run<C: CameraSource>(camera: C, config: &FileConfig, max_ticks: Option<u64>) -> Result<(), ScanError> {
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        if let Err(e) = ctrlc::set_handler(move || running.store(false, Ordering::SeqCst)) {
            warn!(error = %e, "Ctrl+C handler not installed");
        }
    }

    let mut scanner = ScanLoop::new(
        camera,
        RqrrDecoder::new(),
        ScanLog::new(config.output.max_log_entries),
        config.scan.clone(),
    )?;
    scanner.on_success(|result| println!("{}", result.log_line()));
    scanner.start()?;

    let camera = scanner.camera();
    let orientation = DisplayOrientation::from_camera(
        camera.rotation_angle(),
        camera.is_front_facing(),
        camera.is_vertically_mirrored(),
    );
    let (display_width, display_height) = orientation.display_size(camera.width(), camera.height());
    info!(
        rotation = orientation.rotation,
        mirror_x = orientation.mirror_x,
        flip_y = orientation.flip_y,
        display_width,
        display_height,
        "Display orientation"
    );

    #[cfg(feature = "metrics")]
    let metrics = spawn_metrics_server(config.output.metrics_port);

    info!("Scanning for QR codes (Ctrl+C to stop)...");

    let interval = config.capture.tick_interval();
    let mut ticks: u64 = 0;
    while running.load(Ordering::SeqCst) && max_ticks.map_or(true, |max| ticks < max) {
        let started = Instant::now();
        scanner.tick();
        ticks += 1;

        #[cfg(feature = "metrics")]
        {
            if let Some(state) = &metrics {
                if ticks % METRICS_EVERY == 0 {
                    state.blocking_write().update(&MetricsSnapshot::from_loop(&scanner));
                }
            }
        }

        if let Some(remaining) = interval.checked_sub(started.elapsed()) {
            std::thread::sleep(remaining);
        }
    }

    scanner.stop();

    let stats = scanner.stats();
    info!(
        ticks,
        attempts = stats.decode_attempts,
        scans = stats.scans,
        decode_errors = stats.decode_errors,
        frame_errors = stats.frame_errors,
        "Scanning finished"
    );

    let log = scanner.log();
    if !log.is_empty() {
        println!("\n{} scan(s):\n{}", log.len(), log.render());
    }
    Ok(())
}
