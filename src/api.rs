//! HTTP event surface: the same dispatcher behind a small JSON API.
//!
//! `/api` routes require `Authorization: Bearer <token>`. The caller is
//! trusted to name the user, but platform roles are never taken from the
//! request body; admin access over HTTP comes from the admin id list only.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::bot::{Dispatcher, InboundEvent};
use crate::wizard::{FlowType, WizardPhase};

#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher>,
    token: Arc<SecretString>,
}

/// Progress of a user's active wizard.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WizardView {
    user_id: String,
    flow: FlowType,
    #[serde(flatten)]
    phase: WizardPhase,
    total_steps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_question: Option<&'static str>,
}

pub fn routes(dispatcher: Arc<Dispatcher>, token: SecretString) -> Router {
    let state = AppState {
        dispatcher,
        token: Arc::new(token),
    };
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/api/events", post(post_event))
        .route("/api/users/{id}/wizard", get(get_wizard))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .layer(cors)
        .with_state(state)
}

/// Byte comparison that does not stop at the first mismatch.
fn tokens_match(presented: &str, expected: &str) -> bool {
    let (a, b) = (presented.as_bytes(), expected.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

async fn require_token(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|t| tokens_match(t.trim(), state.token.expose_secret()));
    if authorized {
        return next.run(request).await;
    }
    tracing::warn!(path = %request.uri().path(), "Rejected API request without a valid token");
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({"error": "Unauthorized"})),
    )
        .into_response()
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "coach-assist"
    }))
}

async fn post_event(
    State(state): State<AppState>,
    Json(mut event): Json<InboundEvent>,
) -> impl IntoResponse {
    if event.user_id().trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "user_id is required"})),
        );
    }
    if let InboundEvent::CommandInvoked { user_id, roles, .. } = &mut event
        && !roles.is_empty()
    {
        tracing::warn!(user_id = %user_id, ?roles, "Ignoring roles supplied over HTTP");
        roles.clear();
    }
    let reply = state.dispatcher.handle(event).await;
    (StatusCode::OK, Json(serde_json::json!(reply)))
}

async fn get_wizard(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.dispatcher.wizard().active_flow(&id).await {
        Ok(Some(wizard)) => {
            let view = WizardView {
                user_id: id,
                flow: wizard.flow,
                phase: wizard.phase(),
                total_steps: wizard.total_steps(),
                next_question: wizard.current_question().map(|q| q.prompt),
            };
            (StatusCode::OK, Json(serde_json::json!(view)))
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "No active wizard"})),
        ),
        Err(e) => {
            tracing::error!(user_id = %id, error = %e, "Wizard lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Wizard lookup failed"})),
            )
        }
    }
}
