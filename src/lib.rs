//! Hand Recorder - webcam preview and recording with hand-landmark overlay.
//!
//! This is the main library crate. It provides the Tauri application setup
//! and all backend functionality.

pub mod annotate;
pub mod capture;
pub mod commands;
pub mod config;
pub mod display;
pub mod recorder;
pub mod utils;

use annotate::{LandmarkDetector, NoopDetector, ProcessDetector};
use capture::{FrameSource, NokhwaCamera};
use commands::recording::ControllerState;
use config::{AppConfig, CONFIG_FILE_NAME};
use display::PreviewWindow;
use recorder::{AppController, ControllerParts, ControllerSettings, FfmpegSinkFactory, SharedController};
use tauri::{AppHandle, Emitter, Manager};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utils::opener::SystemFolderOpener;
use utils::AppResult;

/// Event carrying recording state changes to the front end
pub const RECORDING_STATE_EVENT: &str = "recording-state";

/// Initialize the application
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hand_recorder_lib=debug,tauri=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Hand Recorder v{}", env!("CARGO_PKG_VERSION"));

    let result = tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .invoke_handler(tauri::generate_handler![
            // Recording commands
            commands::recording::start_recording,
            commands::recording::stop_recording,
            commands::recording::get_recording_state,
            commands::recording::get_status,
            commands::recording::open_output_folder,
            commands::recording::exit_app,
            // System commands
            commands::system::get_system_info,
            commands::system::get_cameras,
        ])
        .setup(|app| {
            let config = load_config(app.handle());
            let controller = build_controller(app.handle(), &config).map_err(|e| {
                tracing::error!("Cannot start recorder: {}", e);
                e
            })?;

            let state = ControllerState::new(controller);
            forward_events(app.handle(), &state.controller);
            recorder::spawn_tick_driver(state.controller.clone(), config.tick_interval());
            app.manage(state);
            Ok(())
        })
        .on_window_event(|window, event| {
            if let tauri::WindowEvent::CloseRequested { .. } = event {
                if let Some(state) = window.try_state::<ControllerState>() {
                    state.controller.lock().exit();
                }
            }
        })
        .run(tauri::generate_context!());

    if let Err(e) = result {
        tracing::error!("Application error: {}", e);
        std::process::exit(1);
    }
}

/// Read `config.json` from the app config dir; bad files fall back to defaults
fn load_config(app: &AppHandle) -> AppConfig {
    let path = match app.path().app_config_dir() {
        Ok(dir) => dir.join(CONFIG_FILE_NAME),
        Err(e) => {
            tracing::warn!("No app config directory ({}), using defaults", e);
            return AppConfig::default();
        }
    };

    AppConfig::load(&path).unwrap_or_else(|e| {
        tracing::error!("Ignoring invalid config {:?}: {}", path, e);
        AppConfig::default()
    })
}

fn build_controller(app: &AppHandle, config: &AppConfig) -> AppResult<AppController> {
    let mut camera = NokhwaCamera::open(config.device_index)?;
    let negotiated = camera.configure(config.requested_width, config.requested_height)?;
    tracing::info!(
        "Capturing {} from camera {} (requested {}x{})",
        negotiated,
        config.device_index,
        config.requested_width,
        config.requested_height
    );

    let detector: Box<dyn LandmarkDetector> = match &config.detector {
        Some(detector_config) => match ProcessDetector::spawn(detector_config) {
            Ok(detector) => Box::new(detector),
            Err(e) => {
                tracing::warn!("{}; continuing without hand overlay", e);
                Box::new(NoopDetector)
            }
        },
        None => {
            tracing::info!("No landmark model configured; hand overlay disabled");
            Box::new(NoopDetector)
        }
    };

    let output_dir = config.resolve_output_dir(app.path().video_dir().ok());
    let settings = ControllerSettings::from_config(config, output_dir)?;
    tracing::info!("Recordings go to {:?}", settings.output_path());

    let parts = ControllerParts {
        camera: Box::new(camera),
        detector,
        display: Box::new(PreviewWindow::new(app.clone())),
        sinks: Box::new(FfmpegSinkFactory::default()),
        opener: Box::new(SystemFolderOpener),
    };
    Ok(AppController::new(parts, settings))
}

/// Relay controller events to the front end
fn forward_events(app: &AppHandle, controller: &SharedController) {
    let mut events = controller.lock().subscribe();
    let app = app.clone();

    tauri::async_runtime::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Err(e) = app.emit(RECORDING_STATE_EVENT, &event) {
                        tracing::warn!("Failed to emit recording event: {}", e);
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("Dropped {} recording events", skipped);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
