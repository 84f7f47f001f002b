//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! The surrounding routing layer picks the party id; this router only binds
//! it from the path. A party is reachable two ways: a websocket at
//! `/parties/{party_id}/ws` for live relay, and a plain `GET` on
//! `/parties/{party_id}` for a one-shot snapshot.

pub mod parties;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the relay router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/parties/{party_id}",
            get(parties::snapshot)
                .head(parties::method_not_allowed)
                .fallback(parties::method_not_allowed),
        )
        .route("/parties/{party_id}/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "routes_test.rs"]
mod tests;
