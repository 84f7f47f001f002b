mod config;
mod message;
mod routes;
mod services;
mod state;

#[tokio::main]
async fn main() {
    // A missing .env file is the normal case in deployment.
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = config::RelayConfig::from_env();
    let bind_addr = config.bind_addr();
    tracing::info!(
        sweep_interval_secs = config.sweep_interval.as_secs(),
        stale_after_secs = config.stale_after.as_secs(),
        client_queue_capacity = config.client_queue_capacity,
        "relay config loaded"
    );

    let state = state::AppState::new(config);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind");

    tracing::info!(%bind_addr, "cursor relay listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");
    tracing::info!("cursor relay stopped");
}

/// Resolve on Ctrl+C or, on unix, SIGTERM.
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
            Ok(mut signal) => {
                signal.recv().await;
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
        () = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
