// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signal handling.

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Resolves on the first SIGINT or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut terminate =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!(signal = "SIGINT", "shutdown requested"),
            _ = terminate.recv() => info!(signal = "SIGTERM", "shutdown requested"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!(signal = "ctrl-c", "shutdown requested");
    }
}

/// Returns a token that is cancelled when the process is asked to stop.
///
/// Cancelling the token directly also ends the listener task.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let listener = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = shutdown_signal() => listener.cancel(),
            _ = listener.cancelled() => {}
        }
    });
    token
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn direct_cancel_is_observed() {
        let token = install_signal_handler();
        assert!(!token.is_cancelled());
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .unwrap();
    }
}
