//! Session cookie reading and writing.

use axum::http::header::COOKIE;
use axum::http::HeaderMap;

use crate::infrastructure::ports::SessionId;

pub const SESSION_COOKIE: &str = "escaperoom_session";

/// Session id from the request's cookies, if present and well formed.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| value.trim().parse().ok())
}

/// `Set-Cookie` value binding the browser to `id`.
pub fn session_cookie(id: SessionId) -> String {
    format!("{SESSION_COOKIE}={id}; HttpOnly; SameSite=Lax; Path=/")
}
