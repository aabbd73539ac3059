//! Periodic tick driver
//!
//! One task drives the controller. Each tick runs on the blocking pool and
//! is awaited before the next interval fires, so ticks never overlap.

use super::controller::AppController;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Controller shared between the tick driver and command handlers
pub type SharedController = Arc<Mutex<AppController>>;

/// Start ticking `controller` every `interval` until it exits
pub fn spawn_tick_driver(
    controller: SharedController,
    interval: Duration,
) -> tauri::async_runtime::JoinHandle<()> {
    tauri::async_runtime::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!("Tick driver started ({}ms)", interval.as_millis());

        loop {
            ticker.tick().await;

            let controller = controller.clone();
            let keep_running = tokio::task::spawn_blocking(move || {
                let mut controller = controller.lock();
                if controller.has_exited() {
                    return false;
                }
                if controller.is_ticking() {
                    controller.tick();
                }
                true
            })
            .await;

            match keep_running {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    tracing::error!("Tick panicked: {}", e);
                    break;
                }
            }
        }

        tracing::info!("Tick driver stopped");
    })
}
