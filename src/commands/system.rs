//! System-related Tauri commands
//!
//! These commands provide system information and the camera list.

use crate::capture::{list_cameras, CameraInfo};
use serde::{Deserialize, Serialize};

/// System information
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub os: String,
    pub os_version: String,
    pub arch: String,
    pub app_version: String,
}

/// Get basic system information
#[tauri::command]
pub async fn get_system_info() -> Result<SystemInfo, String> {
    Ok(SystemInfo {
        os: std::env::consts::OS.to_string(),
        os_version: get_os_version(),
        arch: std::env::consts::ARCH.to_string(),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Get list of available cameras/webcams
#[tauri::command]
pub async fn get_cameras() -> Result<Vec<CameraInfo>, String> {
    tokio::task::spawn_blocking(list_cameras)
        .await
        .map_err(|e| format!("Camera enumeration failed: {}", e))
}

fn get_os_version() -> String {
    let command = if cfg!(target_os = "macos") {
        Some(("sw_vers", vec!["-productVersion"]))
    } else if cfg!(target_os = "windows") {
        Some(("cmd", vec!["/C", "ver"]))
    } else if cfg!(unix) {
        Some(("uname", vec!["-r"]))
    } else {
        None
    };

    command
        .and_then(|(program, args)| std::process::Command::new(program).args(args).output().ok())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Unknown".to_string())
}
