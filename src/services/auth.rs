use actix_web::{HttpRequest, HttpResponse};
use tracing::warn;

use crate::services::db_utils::AppState;

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(actix_web::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Admin gate for every mutating/staff endpoint. The token is actually
/// verified against the configured admin token, not merely checked for
/// presence — one policy across all admin paths.
pub fn authorize_admin(req: &HttpRequest, state: &AppState) -> Result<(), HttpResponse> {
    match bearer_token(req) {
        None => {
            warn!(path = %req.path(), "admin request without bearer token");
            Err(HttpResponse::Unauthorized().json("Missing bearer token"))
        }
        Some(token) if token == state.admin_token => Ok(()),
        Some(_) => {
            warn!(path = %req.path(), "admin request with invalid bearer token");
            Err(HttpResponse::Forbidden().json("Invalid admin token"))
        }
    }
}

/// Opaque client key for the order-intake rate limit: an explicit client
/// token when the UI sends one, else the peer address.
pub fn client_key(req: &HttpRequest) -> String {
    if let Some(token) = req
        .headers()
        .get("x-client-token")
        .and_then(|value| value.to_str().ok())
    {
        if !token.is_empty() {
            return token.to_owned();
        }
    }

    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}
