//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::keys::CreateKeyRequest;
use crate::errors::SentryError;
use crate::server::state::ServerState;
use crate::tailscale::service::ServiceAction;
use crate::tailscale::status::{NodeInfo, PeerSummary};
use crate::telemetry::collect_metrics;
use crate::utils::version_info;

/// Structured error body returned to clients. Raw CLI text and stack traces
/// never leave the process boundary in any other shape.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: &'static str,
}

impl IntoResponse for SentryError {
    fn into_response(self) -> Response {
        let status = match &self {
            SentryError::ValidationError(_) => StatusCode::BAD_REQUEST,
            SentryError::TimeoutError(_) => StatusCode::GATEWAY_TIMEOUT,
            SentryError::CliError { .. }
            | SentryError::ParseError(_)
            | SentryError::ApiError(_) => StatusCode::BAD_GATEWAY,
            SentryError::BinaryNotFound(_) | SentryError::ConfigError(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorBody {
            error: self.to_string(),
            kind: self.kind(),
        };
        (status, Json(body)).into_response()
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "tailsentry".to_string(),
        version: version.version,
    })
}

/// Version response
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}

/// Status query parameters
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(default)]
    pub live: bool,
}

/// Status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub self_node: NodeInfo,
    pub peers: Vec<NodeInfo>,
    pub exit_node: Option<PeerSummary>,
}

/// Tailnet status handler
pub async fn status_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<StatusQuery>,
) -> Result<impl IntoResponse, SentryError> {
    let status = state.controller.get_status(query.live).await?;

    let mut peers: Vec<NodeInfo> = status.peers.values().cloned().collect();
    peers.sort_by(|a, b| a.host_name.cmp(&b.host_name));

    Ok(Json(StatusResponse {
        self_node: status.self_node.clone(),
        peers,
        exit_node: status.active_exit_node(),
    }))
}

/// Device list handler
pub async fn devices_handler(
    State(state): State<Arc<ServerState>>,
) -> Result<impl IntoResponse, SentryError> {
    let devices = state.controller.all_devices().await?;
    Ok(Json(devices))
}

/// Subnet routes response
#[derive(Debug, Serialize)]
pub struct RoutesResponse {
    pub routes: Vec<String>,
}

/// Current subnet routes handler
pub async fn routes_get_handler(
    State(state): State<Arc<ServerState>>,
) -> Result<impl IntoResponse, SentryError> {
    let routes = state.controller.subnet_routes().await?;
    Ok(Json(RoutesResponse { routes }))
}

/// Subnet routes update request
#[derive(Debug, Deserialize)]
pub struct RoutesRequest {
    pub routes: Vec<String>,
}

/// Replace subnet routes handler
pub async fn routes_post_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<RoutesRequest>,
) -> Result<impl IntoResponse, SentryError> {
    state.controller.set_subnet_routes(&request.routes).await?;
    Ok(Json(RoutesResponse {
        routes: request.routes,
    }))
}

/// Exit node response
#[derive(Debug, Serialize)]
pub struct ExitNodeResponse {
    pub exit_node: Option<PeerSummary>,
}

/// Active exit node handler
pub async fn exit_node_get_handler(
    State(state): State<Arc<ServerState>>,
) -> Result<impl IntoResponse, SentryError> {
    let exit_node = state.controller.active_exit_node().await?;
    Ok(Json(ExitNodeResponse { exit_node }))
}

/// Exit node update request
#[derive(Debug, Deserialize)]
pub struct ExitNodeRequest {
    pub enabled: bool,
}

/// Enable or disable exit-node advertisement
pub async fn exit_node_post_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<ExitNodeRequest>,
) -> Result<impl IntoResponse, SentryError> {
    state.controller.set_exit_node(request.enabled).await?;
    Ok(Json(AckResponse { success: true }))
}

/// Generic acknowledgement
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub success: bool,
}

/// `tailscale up` request
#[derive(Debug, Deserialize, Default)]
pub struct UpRequest {
    #[serde(default)]
    pub auth_key: Option<String>,

    #[serde(default)]
    pub extra_args: Vec<String>,
}

/// Join / re-apply handler
pub async fn up_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<UpRequest>,
) -> Result<impl IntoResponse, SentryError> {
    state
        .controller
        .up(request.auth_key.as_deref(), &request.extra_args)
        .await?;
    Ok(Json(AckResponse { success: true }))
}

/// Disconnect handler
pub async fn down_handler(
    State(state): State<Arc<ServerState>>,
) -> Result<impl IntoResponse, SentryError> {
    state.controller.down().await?;
    Ok(Json(AckResponse { success: true }))
}

/// Service-control request
#[derive(Debug, Deserialize)]
pub struct ServiceRequest {
    pub action: String,
}

/// Daemon service control handler
pub async fn service_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<ServiceRequest>,
) -> Result<impl IntoResponse, SentryError> {
    let action: ServiceAction = request.action.parse()?;
    let outcome = state.controller.service_control(action).await?;
    Ok(Json(outcome))
}

/// Metrics history query parameters
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub since: Option<u64>,
}

/// Metrics history handler
pub async fn metrics_history_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<HistoryQuery>,
) -> impl IntoResponse {
    let history = state.controller.history();
    let samples = match query.since {
        Some(since) => history.samples_since(since).await,
        None => history.all().await,
    };
    Json(samples)
}

/// Host telemetry handler
pub async fn telemetry_handler() -> impl IntoResponse {
    Json(collect_metrics())
}

/// ACL policy handler
pub async fn acl_get_handler(
    State(state): State<Arc<ServerState>>,
) -> Result<impl IntoResponse, SentryError> {
    let policy = state.acl.read().await?;
    Ok(Json(policy))
}

/// ACL update handler; the body is the full replacement policy
pub async fn acl_put_handler(
    State(state): State<Arc<ServerState>>,
    body: String,
) -> Result<impl IntoResponse, SentryError> {
    state.acl.write(&body).await?;
    Ok(Json(AckResponse { success: true }))
}

/// ACL backup list handler
pub async fn acl_backups_handler(
    State(state): State<Arc<ServerState>>,
) -> Result<impl IntoResponse, SentryError> {
    let backups = state.acl.list_backups().await?;
    Ok(Json(backups))
}

/// ACL restore request
#[derive(Debug, Deserialize)]
pub struct AclRestoreRequest {
    pub backup: String,
}

/// ACL restore handler
pub async fn acl_restore_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<AclRestoreRequest>,
) -> Result<impl IntoResponse, SentryError> {
    state.acl.restore(&request.backup).await?;
    Ok(Json(AckResponse { success: true }))
}

fn require_api(state: &ServerState) -> Result<&Arc<crate::api::client::ApiClient>, SentryError> {
    state
        .api
        .as_ref()
        .ok_or_else(|| SentryError::ConfigError("control-plane API is not configured".to_string()))
}

/// Control-plane device list handler
pub async fn api_devices_handler(
    State(state): State<Arc<ServerState>>,
) -> Result<impl IntoResponse, SentryError> {
    let api = require_api(&state)?;
    let devices = api.list_devices().await?;
    Ok(Json(devices))
}

/// Control-plane device delete handler
pub async fn api_device_delete_handler(
    State(state): State<Arc<ServerState>>,
    Path(device_id): Path<String>,
) -> Result<impl IntoResponse, SentryError> {
    let api = require_api(&state)?;
    api.delete_device(&device_id).await?;
    Ok(Json(AckResponse { success: true }))
}

/// Auth key list handler
pub async fn keys_get_handler(
    State(state): State<Arc<ServerState>>,
) -> Result<impl IntoResponse, SentryError> {
    let api = require_api(&state)?;
    let keys = api.list_keys().await?;
    Ok(Json(keys))
}

/// Auth key creation request
#[derive(Debug, Deserialize)]
pub struct CreateKeyBody {
    pub description: String,

    #[serde(default)]
    pub expiry_seconds: Option<u64>,

    #[serde(default)]
    pub reusable: bool,

    #[serde(default)]
    pub ephemeral: bool,
}

/// Auth key creation handler
pub async fn keys_post_handler(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<CreateKeyBody>,
) -> Result<impl IntoResponse, SentryError> {
    let api = require_api(&state)?;

    let mut request = CreateKeyRequest::new(body.description);
    request.expiry_seconds = body.expiry_seconds;
    request.capabilities.devices.create.reusable = body.reusable;
    request.capabilities.devices.create.ephemeral = body.ephemeral;

    let key = api.create_key(&request).await?;
    Ok(Json(key))
}

/// Auth key revocation handler
pub async fn key_delete_handler(
    State(state): State<Arc<ServerState>>,
    Path(key_id): Path<String>,
) -> Result<impl IntoResponse, SentryError> {
    let api = require_api(&state)?;
    api.revoke_key(&key_id).await?;
    Ok(Json(AckResponse { success: true }))
}
