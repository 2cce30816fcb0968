//! HTTP routes.

use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, State},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use escaperoom_domain::DomainError;
use serde_json::json;

use super::session_cookie::{session_cookie, session_id_from_headers};
use crate::app::App;
use crate::infrastructure::ports::{SessionId, SessionStoreError};
use crate::use_cases::game::TurnError;

/// Shown whenever a turn cannot be completed.
pub const UNAVAILABLE_MESSAGE: &str =
    "⚠️ The escape room guide is not responding right now. Please try again in a moment.";

/// Demo room contents served to the front end's element panel.
pub const DEMO_ELEMENTS: [&str; 5] = [
    "Control Panel",
    "Cryo Chamber",
    "Supply Locker",
    "Observation Deck",
    "Engineering Bay",
];

/// Create all HTTP routes.
pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/", get(start_game))
        .route("/chatbot_response", post(chatbot_response))
        .route("/fetch_elements", get(fetch_elements))
        .route("/api/health", get(health))
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Serialize)]
struct StartResponse {
    initial_puzzle: String,
}

async fn start_game(
    State(app): State<Arc<App>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = session_id_from_headers(&headers).unwrap_or_default();
    let _turn = app.session_locks.acquire(session_id).await;

    let initial_puzzle = app.use_cases.game.start.execute(session_id).await?;

    Ok((
        [(SET_COOKIE, session_cookie(session_id))],
        Json(StartResponse { initial_puzzle }),
    ))
}

#[derive(Debug, Deserialize)]
struct TurnForm {
    #[serde(default)]
    user_input: String,
}

#[derive(Debug, Serialize)]
struct TurnResponse {
    response: String,
    score: u32,
    image: Option<String>,
}

async fn chatbot_response(
    State(app): State<Arc<App>>,
    headers: HeaderMap,
    form: Result<Form<TurnForm>, FormRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Form(form) = form?;
    let session_id: SessionId = session_id_from_headers(&headers).unwrap_or_default();
    let _turn = app.session_locks.acquire(session_id).await;

    let result = app
        .use_cases
        .game
        .play_turn
        .execute(session_id, &form.user_input)
        .await?;

    tracing::info!(
        session_id = %session_id,
        phase = result.phase.as_str(),
        score = result.score,
        with_image = result.image.is_some(),
        "Turn complete"
    );

    Ok((
        [(SET_COOKIE, session_cookie(session_id))],
        Json(TurnResponse {
            response: result.response,
            score: result.score,
            image: result.image,
        }),
    ))
}

#[derive(Debug, Serialize)]
struct ElementsResponse {
    elements: Vec<&'static str>,
}

async fn fetch_elements() -> Json<ElementsResponse> {
    Json(ElementsResponse {
        elements: DEMO_ELEMENTS.to_vec(),
    })
}

/// Turns a handler panic into the generic failure body.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(detail = %detail, "Handler panicked");
    ApiError::Internal(detail.to_string()).into_response()
}

// =============================================================================
// Error handling
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unavailable,
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::Unavailable => generic_failure(),
            ApiError::Internal(detail) => {
                tracing::error!(detail = %detail, "Internal error");
                generic_failure()
            }
        }
    }
}

fn generic_failure() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": true, "response": UNAVAILABLE_MESSAGE })),
    )
        .into_response()
}

impl From<TurnError> for ApiError {
    fn from(e: TurnError) -> Self {
        match e {
            TurnError::EmptyInput => ApiError::BadRequest("Empty input".to_string()),
            TurnError::UpstreamChatUnavailable(_) => ApiError::Unavailable,
            TurnError::Domain(DomainError::Validation(msg)) => ApiError::BadRequest(msg),
            TurnError::Domain(e) => ApiError::Internal(e.to_string()),
            TurnError::Store(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<SessionStoreError> for ApiError {
    fn from(e: SessionStoreError) -> Self {
        ApiError::Internal(e.to_string())
    }
}
