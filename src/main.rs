//! NovaCare integration router server.

use api_rest::{build_router, AppState};
use api_shared::HealthService;
use novacare_core::config::hop_timeout_from_env_value;
use novacare_core::constants::{
    DEFAULT_BILLING_BASE_URL, DEFAULT_CENTRAL_BASE_URL, DEFAULT_LOCAL_BASE_URL,
};
use novacare_core::{IntegrationRouter, RouterConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the NovaCare router
///
/// Resolves upstream locations once, then serves the REST API until SIGINT/SIGTERM.
///
/// # Environment Variables
/// - `NOVACARE_ADDR`: listen address (default: "0.0.0.0:8082")
/// - `NOVACARE_SERVICE_NAME`: name reported by the health endpoints (default: "novacare-router")
/// - `PATIENT_SERVICE_URL`: central patient registry
/// - `LOCAL_SITE_URL`: local site store
/// - `ESB_CENTRAL_URL`: peer (central-tier) router for check-in misses (optional)
/// - `BILLING_SERVICE_URL`: billing service
/// - `CONSULTATION_SERVICE_URL`: consultation service (default: the local site)
/// - `HOP_TIMEOUT_SECS`: per-hop timeout in seconds (default: 10)
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - any upstream URL or the timeout is invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("novacare=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = config_from_env()?;
    tracing::info!(
        central = %cfg.central_base_url(),
        local = %cfg.local_base_url(),
        peer = cfg.peer_router_base_url().map(|u| u.as_str()).unwrap_or("-"),
        billing = %cfg.billing_base_url(),
        consultation = %cfg.consultation_base_url(),
        hop_timeout_secs = cfg.hop_timeout().as_secs(),
        "upstreams resolved"
    );

    let router = IntegrationRouter::from_config(&cfg)?;
    let service_name =
        std::env::var("NOVACARE_SERVICE_NAME").unwrap_or_else(|_| "novacare-router".into());
    let app = build_router(AppState::new(router, HealthService::new(service_name)));

    let addr = std::env::var("NOVACARE_ADDR").unwrap_or_else(|_| "0.0.0.0:8082".into());
    tracing::info!("-- Starting NovaCare router on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("-- NovaCare router stopped");
    Ok(())
}

fn config_from_env() -> anyhow::Result<RouterConfig> {
    let var = |name: &str, default: &str| std::env::var(name).unwrap_or_else(|_| default.into());

    let mut cfg = RouterConfig::new(
        &var("PATIENT_SERVICE_URL", DEFAULT_CENTRAL_BASE_URL),
        &var("LOCAL_SITE_URL", DEFAULT_LOCAL_BASE_URL),
        &var("BILLING_SERVICE_URL", DEFAULT_BILLING_BASE_URL),
    )?
    .with_hop_timeout(hop_timeout_from_env_value(
        std::env::var("HOP_TIMEOUT_SECS").ok(),
    )?)?;

    if let Some(peer) = non_empty_var("ESB_CENTRAL_URL") {
        cfg = cfg.with_peer_router(&peer)?;
    }
    if let Some(consultation) = non_empty_var("CONSULTATION_SERVICE_URL") {
        cfg = cfg.with_consultation_service(&consultation)?;
    }
    Ok(cfg)
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e}");
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
                tracing::error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
