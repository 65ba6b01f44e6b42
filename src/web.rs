//! Local HTTP config surface.
//!
//! JSON-only API consumed by an external configuration UI. Profile edits
//! flow through here into the store; a successful write triggers an
//! unconditional check-and-sync pass so the change takes effect without
//! waiting for the hardware state to change.

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::device;
use crate::engine::{self, AppContext};
use crate::error::KbError;
use crate::hwid::HwId;
use crate::profile::{MAX_CONFIG_BYTES, ProfileCollection};
use crate::resolver;

/// Structured error payload returned by every failing endpoint.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub status: &'static str,
    pub message: String,
}

impl ApiError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
        }
    }
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

fn internal(e: impl std::fmt::Display) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError::new(e.to_string())),
    )
}

/// Success acknowledgement for configuration writes.
#[derive(Debug, Serialize)]
struct SaveResponse {
    status: &'static str,
}

/// Response for GET /api/status.
#[derive(Debug, Serialize)]
struct StatusResponse {
    active_keyboard: Option<String>,
    current_layout: String,
}

/// One entry of GET /api/detected_keyboards: a configured profile with a
/// live `connected` flag, or a detected-but-unconfigured device.
#[derive(Debug, Serialize)]
struct DetectedKeyboard {
    vendor: String,
    product: String,
    vid_pid: Vec<String>,
    connected: bool,
}

/// GET /api/config - the stored collection with freshly derived flags.
async fn get_config(State(ctx): State<AppContext>) -> ApiResult<Json<ProfileCollection>> {
    let mut profiles = ctx.store.load().map_err(internal)?;
    let observations = device::enumerate(ctx.enumerator.as_ref());
    resolver::refresh_flags(&mut profiles, &observations);
    Ok(Json(profiles))
}

/// POST /api/config - validate and persist a full collection, then run
/// the unconditional sync pass.
///
/// Oversized bodies are cut off by the body limit layer before this
/// handler runs.
async fn update_config(
    State(ctx): State<AppContext>,
    body: axum::body::Bytes,
) -> ApiResult<Json<SaveResponse>> {
    let candidate: ProfileCollection = serde_json::from_slice(&body).map_err(|e| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiError::new(format!(
                "Config must be a JSON array of keyboard profiles: {e}"
            ))),
        )
    })?;

    debug!(profiles = candidate.len(), "Configuration update received");
    ctx.store.save(&candidate).map_err(|e| match e {
        KbError::Validation(v) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiError::new(v.to_string())),
        ),
        other => internal(other),
    })?;

    // A configuration change takes effect immediately, bypassing the
    // control loop's edge trigger.
    engine::check_and_sync(&ctx);

    Ok(Json(SaveResponse { status: "success" }))
}

/// GET /api/status - resolved active profile and the OS's current layout.
async fn get_status(State(ctx): State<AppContext>) -> ApiResult<Json<StatusResponse>> {
    let profiles = ctx.store.load().map_err(internal)?;
    let observations = device::enumerate(ctx.enumerator.as_ref());
    let active_keyboard = resolver::resolve(&observations, &profiles);
    let current_layout = ctx.layout.current_layout().map_err(internal)?;

    Ok(Json(StatusResponse {
        active_keyboard,
        current_layout,
    }))
}

/// GET /api/detected_keyboards - merged view of configured profiles and
/// live observations.
async fn get_detected_keyboards(
    State(ctx): State<AppContext>,
) -> ApiResult<Json<Vec<DetectedKeyboard>>> {
    let profiles = ctx.store.load().map_err(internal)?;
    let observations = device::enumerate(ctx.enumerator.as_ref());
    let observed = resolver::observed_ids(&observations);

    let mut result = Vec::new();
    let mut configured = HashSet::new();

    for profile in &profiles {
        let ids: Vec<HwId> = profile
            .vid_pid
            .iter()
            .filter_map(|entry| HwId::parse_entry(entry))
            .collect();
        let connected = ids.iter().any(|id| observed.contains(id));
        configured.extend(ids);

        result.push(DetectedKeyboard {
            vendor: profile.vendor.clone(),
            product: profile.product.clone(),
            vid_pid: profile.vid_pid.clone(),
            connected,
        });
    }

    // Anything observed that no profile claims yet.
    let mut listed = HashSet::new();
    for obs in &observations {
        let id = obs.hw_id();
        if configured.contains(&id) || !listed.insert(id.clone()) {
            continue;
        }
        result.push(DetectedKeyboard {
            vendor: obs.vendor_name.clone(),
            product: obs.product_name.clone(),
            vid_pid: vec![id.to_string()],
            connected: true,
        });
    }

    Ok(Json(result))
}

/// POST /exit - cooperative shutdown of the whole process.
async fn post_exit(State(ctx): State<AppContext>) -> StatusCode {
    info!("Shutdown requested via config surface");
    ctx.shutdown();
    StatusCode::NO_CONTENT
}

/// Creates the API router with all endpoints.
pub fn create_router(ctx: AppContext) -> Router {
    // Permissive CORS: the server binds to localhost and serves only the
    // local configuration UI.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/config", get(get_config).post(update_config))
        .route("/api/status", get(get_status))
        .route("/api/detected_keyboards", get(get_detected_keyboards))
        .route("/exit", post(post_exit))
        .layer(DefaultBodyLimit::max(MAX_CONFIG_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Runs the config surface until the shutdown signal fires.
pub async fn run_server(ctx: AppContext, addr: SocketAddr) -> crate::error::Result<()> {
    let mut shutdown = ctx.shutdown_signal();
    let app = create_router(ctx);

    info!(%addr, "Config surface listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| KbError::WebServerFailed {
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await
        .map_err(|e| KbError::WebServerFailed {
            addr: addr.to_string(),
            reason: e.to_string(),
        })
}
