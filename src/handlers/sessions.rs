use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::session::{NewSession, SessionStatus, SessionView},
    state::AppState,
    validation::sessions::*,
};

/// The request payload for starting a session.
#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub nickname: Option<String>,
    #[serde(rename = "macAddress")]
    pub mac_address: Option<String>,
}

/// A request payload carrying only a session identifier.
#[derive(Deserialize, Debug)]
pub struct SessionIdRequest {
    #[serde(rename = "sessionID")]
    pub session_id: Option<String>,
}

/// The request payload for an administrative status override.
#[derive(Deserialize, Debug)]
pub struct UpdateRequest {
    #[serde(rename = "sessionID")]
    pub session_id: Option<String>,
    pub status: Option<String>,
}

/// The query parameters for the status lookup.
#[derive(Deserialize)]
pub struct StatusQuery {
    #[serde(rename = "sessionID")]
    pub session_id: Option<String>,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub message: String,
    #[serde(rename = "sessionID")]
    pub session_id: Uuid,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub message: String,
    pub session: SessionView,
}

#[derive(Serialize)]
pub struct ListResponse {
    pub message: String,
    pub sessions: Vec<SessionView>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct PurgeResponse {
    pub message: String,
    pub deleted: u64,
}

/// Resolves the client address: first hop of `x-forwarded-for` when
/// present, the socket peer otherwise.
fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let ip = match forwarded {
        Some(hop) => hop.to_string(),
        None => peer.ip().to_string(),
    };

    // IPv4-mapped IPv6 peers report as ::ffff:a.b.c.d
    ip.strip_prefix("::ffff:").map(str::to_string).unwrap_or(ip)
}

/// Parses a session identifier out of a request field.
fn parse_session_id(raw: Option<&str>) -> Result<Uuid> {
    let raw = raw
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation("sessionID is required".to_string()))?;

    // A malformed id cannot match any session.
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound)
}

/// Static identification payload.
#[axum::debug_handler]
pub async fn welcome() -> Response {
    let body = MessageResponse {
        message: format!(
            "Welcome to the {} session control API (v{})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        ),
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// Starts a session for a client.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Response> {
    let email = payload.email.unwrap_or_default();
    let nickname = payload.nickname.unwrap_or_default();
    let mac_address = payload.mac_address.unwrap_or_default();

    validate_email(&email)?;
    validate_nickname(&nickname)?;
    validate_mac_address(&mac_address)?;

    let session = state
        .lifecycle
        .create(NewSession {
            email,
            nickname,
            mac_address,
            client_ip: client_ip(&headers, peer),
            server_ip: state.config.bind_addr.ip().to_string(),
        })
        .await?;

    let response = LoginResponse {
        message: "Session started".to_string(),
        session_id: session.id,
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Terminates a session at the holder's request.
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<SessionIdRequest>,
) -> Result<Response> {
    let id = parse_session_id(payload.session_id.as_deref())?;
    state.lifecycle.terminate(&id).await?;

    let response = MessageResponse {
        message: "Session terminated".to_string(),
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Administrative status override.
#[axum::debug_handler]
pub async fn update_status(
    State(state): State<AppState>,
    Json(payload): Json<UpdateRequest>,
) -> Result<Response> {
    let id = parse_session_id(payload.session_id.as_deref())?;
    let status: SessionStatus = payload
        .status
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation("status is required".to_string()))?
        .parse()?;

    let session = state.lifecycle.set_status(&id, status).await?;

    let response = SessionResponse {
        message: "Session updated".to_string(),
        session,
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Returns one session, decrypted, with idle/duration metrics. A read,
/// not an access: the last-access timestamp is left alone.
#[axum::debug_handler]
pub async fn status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Response> {
    let id = parse_session_id(query.session_id.as_deref())?;
    let session = state.lifecycle.get(&id).await?;

    let response = SessionResponse {
        message: "Session found".to_string(),
        session,
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Lists every session regardless of status, decrypted best-effort.
#[axum::debug_handler]
pub async fn all_sessions(State(state): State<AppState>) -> Result<Response> {
    let sessions = state.lifecycle.list_all().await?;

    let response = ListResponse {
        message: "All sessions".to_string(),
        sessions,
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Lists the currently `Active` sessions, decrypted best-effort.
#[axum::debug_handler]
pub async fn all_current_sessions(State(state): State<AppState>) -> Result<Response> {
    let sessions = state.lifecycle.list_active().await?;

    let response = ListResponse {
        message: "Active sessions".to_string(),
        sessions,
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Irreversibly deletes every session.
#[axum::debug_handler]
pub async fn delete_all_sessions(State(state): State<AppState>) -> Result<Response> {
    let deleted = state.lifecycle.purge_all().await?;

    let response = PurgeResponse {
        message: "All sessions deleted".to_string(),
        deleted,
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}
