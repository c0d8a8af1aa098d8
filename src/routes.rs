use axum::{
    routing::{delete, get, post},
    Router,
};
use http::Method;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::handlers::sessions;
use crate::state::AppState;

/// Assembles the application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/welcome", get(sessions::welcome))
        .route("/login", post(sessions::login))
        .route("/logout", post(sessions::logout))
        .route("/update", post(sessions::update_status))
        .route("/status", get(sessions::status))
        .route("/allSessions", get(sessions::all_sessions))
        .route("/allCurrentSessions", get(sessions::all_current_sessions))
        .route("/deleteAllSessions", delete(sessions::delete_all_sessions))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(cors)
        .with_state(state)
}
