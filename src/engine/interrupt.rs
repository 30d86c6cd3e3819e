// src/engine/interrupt.rs

//! Ctrl+C handling.
//!
//! The first Ctrl+C cancels the crawl token: workers finish their in-flight
//! fetch, the persistence queue is drained and the partial graph is written.
//! A second Ctrl+C exits immediately.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Exit code used when a second Ctrl+C forces the process down.
pub const FORCE_QUIT_EXIT_CODE: i32 = 130;

/// Listen for Ctrl+C and cancel `cancel` on the first press.
pub fn install(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Unable to listen for Ctrl+C: {e}");
            return;
        }
        log::warn!("Received Ctrl+C, finishing in-flight fetches. Press Ctrl+C again to force quit");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            log::error!("Force quit requested, exiting immediately");
            std::process::exit(FORCE_QUIT_EXIT_CODE);
        }
    })
}

/// Cancel `cancel` once `signal` completes.
///
/// Lets callers stop a crawl from any event source, such as a deadline
/// or a control channel.
pub fn cancel_on<F>(signal: F, cancel: CancellationToken) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        tokio::select! {
            _ = signal => {
                log::info!("Stop signal received, interrupting crawl");
                cancel.cancel();
            }
            _ = cancel.cancelled() => {}
        }
    })
}
