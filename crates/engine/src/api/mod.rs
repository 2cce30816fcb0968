//! API layer - HTTP entry points.

pub mod http;
pub mod session_cookie;

use std::sync::Arc;

use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::app::App;

/// Full router with state, request tracing and panic containment.
pub fn router(app: Arc<App>) -> Router {
    http::routes()
        .with_state(app)
        .layer(CatchPanicLayer::custom(http::panic_response))
        .layer(TraceLayer::new_for_http())
}
