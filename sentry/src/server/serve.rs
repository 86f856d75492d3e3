//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::SentryError;
use crate::server::handlers::{
    acl_backups_handler, acl_get_handler, acl_put_handler, acl_restore_handler,
    api_device_delete_handler, api_devices_handler, devices_handler, down_handler,
    exit_node_get_handler, exit_node_post_handler, health_handler, key_delete_handler,
    keys_get_handler, keys_post_handler, metrics_history_handler, routes_get_handler,
    routes_post_handler, service_handler, status_handler, telemetry_handler, up_handler,
    version_handler,
};
use crate::server::state::ServerState;

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), SentryError>>, SentryError> {
    let app = Router::new()
        // Health and version
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        // Tailnet state
        .route("/status", get(status_handler))
        .route("/devices", get(devices_handler))
        .route("/routes", get(routes_get_handler))
        .route("/routes", post(routes_post_handler))
        .route("/exit-node", get(exit_node_get_handler))
        .route("/exit-node", post(exit_node_post_handler))
        // Mutations
        .route("/up", post(up_handler))
        .route("/down", post(down_handler))
        .route("/service", post(service_handler))
        // ACL policy
        .route("/acl", get(acl_get_handler))
        .route("/acl", put(acl_put_handler))
        .route("/acl/backups", get(acl_backups_handler))
        .route("/acl/restore", post(acl_restore_handler))
        // Control-plane pass-through
        .route("/api/devices", get(api_devices_handler))
        .route("/api/devices/{id}", delete(api_device_delete_handler))
        .route("/api/keys", get(keys_get_handler))
        .route("/api/keys", post(keys_post_handler))
        .route("/api/keys/{id}", delete(key_delete_handler))
        // Metrics
        .route("/metrics/history", get(metrics_history_handler))
        .route("/telemetry/metrics", get(telemetry_handler))
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| SentryError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| SentryError::ServerError(e.to_string()))
    });

    Ok(handle)
}
