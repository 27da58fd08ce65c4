//! Scan Camera CLI
//!
//! Runs the camera session against a mock device and logs the scan
//! region cropped from each preview frame.

use clap::Parser;
use scan_camera::{
    config::ScannerConfig,
    device::{MockDevice, MockProvider, PreviewFrame, PreviewSurface},
    geometry::{rotate_clockwise, Resolution},
    session::CameraSession,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;
use tracing::{info, warn};

/// Barcode scan-region demo on a mock camera
#[derive(Parser, Debug)]
#[command(name = "scan-camera")]
#[command(version, about = "Camera session and scan-region demo", long_about = None)]
struct Args {
    /// Config file path
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Screen resolution override, e.g. 1080x1920
    #[arg(long, value_parser = parse_resolution)]
    screen: Option<Resolution>,

    /// Camera id to open
    #[arg(long)]
    camera_id: Option<u32>,

    /// Manual scan rect size, e.g. 600x400
    #[arg(long, value_parser = parse_resolution)]
    scan_size: Option<Resolution>,

    /// Turn the torch on once preview runs
    #[arg(long)]
    torch: bool,

    /// Number of frames to scan
    #[arg(long, default_value = "10")]
    frames: u32,

    /// Scan until interrupted with Ctrl-C
    #[arg(long)]
    continuous: bool,
}

fn parse_resolution(text: &str) -> Result<Resolution, String> {
    Resolution::parse(text).ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{text}'"))
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match ScannerConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => ScannerConfig::default(),
    };
    if let Some(screen) = args.screen {
        config.display.width = screen.width;
        config.display.height = screen.height;
    }
    if args.camera_id.is_some() {
        config.camera.requested_id = args.camera_id;
    }
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    info!("Scan Camera v{}", scan_camera::VERSION);
    info!("This is a demonstration using a mock camera device");

    let device = MockDevice::new(config.camera.requested_id.unwrap_or(0));
    let probe = device.probe();
    let mut session = CameraSession::new(MockProvider::new(vec![device]), &config);
    if let Some(size) = args.scan_size {
        session.set_manual_framing_rect(size.width, size.height);
    }

    if let Err(e) = session.open(&PreviewSurface::new("demo")) {
        eprintln!("Failed to open camera: {}", e);
        std::process::exit(1);
    }
    info!(
        screen = ?session.screen_resolution(),
        camera = ?session.camera_resolution(),
        framing = ?session.framing_rect(),
        preview = ?session.framing_rect_in_preview(),
        "Camera ready"
    );

    if let Err(e) = session.start_preview() {
        eprintln!("Failed to start preview: {}", e);
        session.close_driver();
        std::process::exit(1);
    }
    if args.torch {
        session.set_torch(true);
    }

    let running = Arc::new(AtomicBool::new(true));
    if args.continuous {
        let flag = Arc::clone(&running);
        if let Err(e) = ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst)) {
            warn!("Could not install Ctrl-C handler: {}", e);
        }
    }

    let (tx, rx) = mpsc::channel::<PreviewFrame>();
    let mut scanned = 0u32;
    while running.load(Ordering::SeqCst) && (args.continuous || scanned < args.frames) {
        let tx = tx.clone();
        session.request_preview_frame(move |frame| {
            let _ = tx.send(frame);
        });
        if !probe.deliver_frame() {
            warn!("Camera delivered no frame");
            break;
        }
        let frame = match rx.recv_timeout(Duration::from_secs(1)) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Frame wait failed: {}", e);
                break;
            }
        };
        scan_frame(&mut session, &frame);
        scanned += 1;
        if args.continuous {
            std::thread::sleep(Duration::from_millis(100));
        }
    }

    session.stop_preview();
    session.close_driver();
    info!("Done. Scanned {} frames", scanned);
}

fn scan_frame(session: &mut CameraSession<MockProvider>, frame: &PreviewFrame) {
    let portrait = session
        .screen_resolution()
        .is_some_and(|screen| screen.is_portrait());

    // Portrait preview rects address the frame rotated upright.
    let rotated;
    let (data, width, height) = if portrait {
        rotated = match rotate_clockwise(frame.data(), frame.width(), frame.height()) {
            Ok(rotated) => rotated,
            Err(e) => {
                warn!(sequence = frame.sequence(), "Cannot rotate frame: {}", e);
                return;
            }
        };
        (rotated.as_slice(), frame.height(), frame.width())
    } else {
        (frame.data(), frame.width(), frame.height())
    };

    match session.build_luminance_region(data, width, height) {
        Some(region) => info!(
            sequence = frame.sequence(),
            region = ?region.descriptor(),
            mean_luma = region.mean_luminance(),
            "Scan region ready for decoding"
        ),
        None => warn!(sequence = frame.sequence(), "Scan region not ready"),
    }
}
