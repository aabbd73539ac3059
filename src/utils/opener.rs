//! Opening folders in the system file browser

use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::JoinHandle;

/// Shows a directory to the user
pub trait FolderOpener: Send {
    fn open(&self, path: &Path) -> std::io::Result<()>;
}

/// Launches the platform file browser
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemFolderOpener;

impl FolderOpener for SystemFolderOpener {
    fn open(&self, path: &Path) -> std::io::Result<()> {
        // The browser outlives the call; we only care that it launched
        spawn_reaped(file_browser_command(path)).map(|_| ())
    }
}

/// Spawn `command` and wait for it on a background thread so it is reaped
/// when it exits.
fn spawn_reaped(mut command: Command) -> std::io::Result<JoinHandle<std::io::Result<ExitStatus>>> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    std::thread::Builder::new()
        .name("folder-opener".to_string())
        .spawn(move || {
            let status = child.wait();
            match &status {
                Ok(status) if !status.success() => {
                    tracing::warn!("File browser exited with {}", status)
                }
                Err(e) => tracing::warn!("Failed to wait for file browser: {}", e),
                Ok(_) => {}
            }
            status
        })
}

fn file_browser_command(path: &Path) -> Command {
    #[cfg(target_os = "windows")]
    {
        let mut command = Command::new("explorer");
        command.arg(path);
        command
    }

    #[cfg(target_os = "macos")]
    {
        let mut command = Command::new("open");
        command.arg(path);
        command
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        let mut command = Command::new("xdg-open");
        command.arg(path);
        command
    }
}
