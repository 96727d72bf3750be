use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::rest::{self, AppState};
use crate::config::Config;
use crate::domain::device_service::DeviceService;

pub async fn run(config: Config) -> Result<()> {
    crate::init_tracing(&config.log_level, true);

    info!(version = env!("CARGO_PKG_VERSION"), "asrctl daemon starting");

    let device = Arc::new(DeviceService::from_config(&config));

    // Log root state once so operators see it without querying.
    {
        let device = device.clone();
        tokio::spawn(async move {
            match crate::dispatch::offload(None, move || device.privilege()).await {
                Ok(state) => info!(root = %state, "initial privilege probe completed"),
                Err(e) => tracing::warn!(error = %e, "initial privilege probe failed"),
            }
        });
    }

    let app = rest::router(AppState {
        device,
        request_timeout: config.request_timeout(),
    })
    .layer(TraceLayer::new_for_http());

    let http_addr = &config.http_addr;
    let listener = TcpListener::bind(http_addr)
        .await
        .with_context(|| format!("binding to {}", http_addr))?;

    info!(addr = %http_addr, "HTTP server listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("asrctl daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("Received Ctrl+C, shutting down"); },
        _ = terminate => { info!("Received SIGTERM, shutting down"); },
    }
}
