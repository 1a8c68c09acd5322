pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use thiserror::Error;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

use custdb::{
    gateway::{CustomerGateway, GatewayError},
    infrastructure, CustdbConfig,
};

use crate::middleware::require_api_key;
use crate::state::AppState;

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("storage unavailable: {0}")]
    Storage(#[from] GatewayError),
    #[error("invalid listen address: {0}")]
    Address(#[from] std::net::AddrParseError),
    #[error("server error: {0}")]
    Server(#[from] hyper::Error),
}

/// Customer routes, with unmatched paths served from `static_dir`.
pub fn app(state: AppState, static_dir: &str) -> Router {
    let customers = Router::new()
        .route(
            "/customers",
            get(routes::list_customers).post(routes::create_customer),
        )
        .route("/customers/find", get(routes::find_customers))
        .route(
            "/customers/:id",
            get(routes::get_customer)
                .put(routes::update_customer)
                .delete(routes::delete_customer),
        )
        .route_layer(from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .merge(customers)
        .route("/reset", get(routes::reset_customers))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Connects to storage, then serves until Ctrl-C or SIGTERM and releases the
/// storage session.
pub async fn serve(config: &CustdbConfig) -> Result<(), StartupError> {
    let gateway = Arc::new(CustomerGateway::new(infrastructure::connector(config)));
    gateway.connect().await?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = AppState::new(gateway.clone(), config.server.api_key.clone());
    if state.api_key.is_some() {
        info!("api key required for mutating customer routes");
    }

    let server = axum::Server::try_bind(&addr)?
        .serve(app(state, &config.server.static_dir).into_make_service());
    info!("Server listening on port {}", config.server.port);
    info!("staticDir: {}", config.server.static_dir);
    server.with_graceful_shutdown(shutdown_signal()).await?;

    gateway.close().await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", error);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to listen for SIGTERM: {}", error);
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
    info!("shutdown signal received");
}
