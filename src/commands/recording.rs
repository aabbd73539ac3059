//! Recording-related Tauri commands
//!
//! Thin bindings from front-end buttons to the controller's handlers. The
//! controller lock is taken on the blocking pool because a tick may hold it
//! for a camera read.

use crate::recorder::{
    AppController, ControllerStatus, RecordingState, RecordingSummary, SharedController,
};
use crate::utils::{AppError, AppResult, ErrorResponse};
use parking_lot::Mutex;
use std::sync::Arc;
use tauri::{AppHandle, State};
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};

/// Application state for recording
pub struct ControllerState {
    pub controller: SharedController,
}

impl ControllerState {
    pub fn new(controller: AppController) -> Self {
        Self {
            controller: Arc::new(Mutex::new(controller)),
        }
    }
}

/// Run `f` against the controller off the async runtime
async fn with_controller<T, F>(controller: SharedController, f: F) -> Result<T, ErrorResponse>
where
    T: Send + 'static,
    F: FnOnce(&mut AppController) -> AppResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&mut controller.lock()))
        .await
        .map_err(|e| AppError::Platform(format!("controller task failed: {}", e)))?
        .map_err(ErrorResponse::from)
}

fn notify_user(app: &AppHandle, title: &str, error: &ErrorResponse) {
    app.dialog()
        .message(error.message.clone())
        .kind(MessageDialogKind::Error)
        .title(title)
        .show(|_| {});
}

/// Start recording
#[tauri::command]
pub async fn start_recording(
    app: AppHandle,
    state: State<'_, ControllerState>,
) -> Result<ControllerStatus, ErrorResponse> {
    let result = with_controller(state.controller.clone(), |controller| {
        controller.start()?;
        Ok(controller.status())
    })
    .await;

    if let Err(ref error) = result {
        notify_user(&app, "Could not start recording", error);
    }
    result
}

/// Stop recording
#[tauri::command]
pub async fn stop_recording(
    state: State<'_, ControllerState>,
) -> Result<Option<RecordingSummary>, ErrorResponse> {
    with_controller(state.controller.clone(), |controller| Ok(controller.stop()?)).await
}

/// Get current recording state
#[tauri::command]
pub async fn get_recording_state(
    state: State<'_, ControllerState>,
) -> Result<RecordingState, ErrorResponse> {
    with_controller(state.controller.clone(), |controller| Ok(controller.state())).await
}

/// Get controller status
#[tauri::command]
pub async fn get_status(
    state: State<'_, ControllerState>,
) -> Result<ControllerStatus, ErrorResponse> {
    with_controller(state.controller.clone(), |controller| Ok(controller.status())).await
}

/// Open the recordings folder in the system file browser
#[tauri::command]
pub async fn open_output_folder(
    state: State<'_, ControllerState>,
) -> Result<(), ErrorResponse> {
    with_controller(state.controller.clone(), |controller| {
        Ok(controller.open_output_folder()?)
    })
    .await
}

/// Finalize any recording, release the camera and quit
#[tauri::command]
pub async fn exit_app(
    app: AppHandle,
    state: State<'_, ControllerState>,
) -> Result<(), ErrorResponse> {
    with_controller(state.controller.clone(), |controller| {
        controller.exit();
        Ok(())
    })
    .await?;

    app.exit(0);
    Ok(())
}
