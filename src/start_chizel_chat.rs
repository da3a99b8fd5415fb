//! Startup helpers for the chat server.

use std::process::ExitCode;

use crate::server::{self, AppState};

/// Run the server until Ctrl-C (used by the `chizel-chat-server` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Chizel chat v{}", env!("CARGO_PKG_VERSION"));

    let state = match AppState::from_env() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to create state: {e}");
            return ExitCode::from(1);
        }
    };

    let config = state.resolver.config();
    tracing::info!(
        primary = config.primary_key().is_some(),
        secondary = config.secondary_key().is_some(),
        timeout_ms = u64::try_from(config.request_timeout.as_millis()).unwrap_or(u64::MAX),
        "providers configured"
    );

    let port = get_port();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(server::serve(state, port, shutdown_signal())) {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    tracing::info!("Server stopped");
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

/// Get configured server port.
#[must_use]
pub fn get_port() -> u16 {
    std::env::var("CHIZEL_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(server::DEFAULT_PORT)
}
