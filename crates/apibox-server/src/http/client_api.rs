//! `POST /`: the client-facing API. Dispatches `attachToTangle` through the
//! chained-PoW driver; everything else is forwarded unchanged.

use std::net::SocketAddr;
use std::sync::Arc;

use apibox_core::error::ApiError;
use apibox_engine::{attach_to_tangle, AttachRequest};
use tracing::warn;
use warp::http::StatusCode;

use super::auth::{bearer_token, json_response};
use super::{remote_ip, AppState};

fn error_response(err: &ApiError) -> warp::reply::Response {
    json_response(
        StatusCode::BAD_REQUEST,
        Some("*"),
        &err.to_body(),
    )
}

pub async fn handle(
    remote: Option<SocketAddr>,
    auth_header: Option<String>,
    body: bytes::Bytes,
    state: Arc<AppState>,
) -> warp::reply::Response {
    let ip = remote_ip(remote);

    if !state.config.allowed_request.permits(ip) {
        return error_response(&ApiError::NotAllowed);
    }

    // `warp::body::json()` would reject a malformed body before this handler
    // ever runs, bypassing the spec's `{"error", "duration"}` envelope; parse
    // it by hand here instead so every failure reaches `MalformedRequest`.
    let parsed: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => return error_response(&ApiError::MalformedRequest),
    };

    let command = match parsed.get("command").and_then(|v| v.as_str()) {
        Some(c) => c.to_string(),
        None => return error_response(&ApiError::MalformedRequest),
    };

    if command == "attachToTangle" {
        let token = bearer_token(auth_header.as_deref());
        if !state.limiter.check(ip, &command, token) {
            return error_response(&ApiError::RateLimited);
        }

        let request: AttachRequest = match serde_json::from_value(parsed) {
            Ok(r) => r,
            Err(_) => return error_response(&ApiError::MalformedRequest),
        };
        return match attach_to_tangle(&state.dispatcher, request).await {
            Ok(response) => json_response(StatusCode::OK, Some("*"), &response),
            Err(err) => error_response(&err),
        };
    }

    match apibox_engine::upstream::forward(&state.http_client, &state.config.iri_server_url, body.to_vec())
        .await
    {
        Some(resp) => {
            let status = StatusCode::from_u16(resp.status).unwrap_or(StatusCode::BAD_GATEWAY);
            // Pass-through responses only carry a CORS header if the
            // backing node sent one; `*` is injected on direct PoW
            // responses only, never here.
            super::auth::raw_http_response(
                status,
                Some("application/json"),
                resp.cors_header.as_deref(),
                resp.body,
            )
        }
        None => {
            warn!(%command, "pass-through request failed after retries");
            error_response(&ApiError::UpstreamFailure)
        }
    }
}
