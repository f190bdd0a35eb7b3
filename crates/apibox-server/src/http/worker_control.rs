//! `GET /control?cmd=...`: served to external workers. Allow-listed
//! separately from the client API; disabled entirely in standalone mode
//! (see `routes`).

use std::net::SocketAddr;
use std::sync::Arc;

use apibox_core::trytes::Trytes;
use serde::Deserialize;
use warp::http::StatusCode;

use super::auth::{bare_400, json_response};
use super::{remote_ip, AppState};

#[derive(Debug, Deserialize)]
struct ControlQuery {
    cmd: String,
    #[serde(rename = "ID")]
    id: Option<i64>,
    trytes: Option<String>,
}

pub async fn handle(
    remote: Option<SocketAddr>,
    raw_query: String,
    state: Arc<AppState>,
) -> warp::reply::Response {
    let ip = remote_ip(remote);
    if !state.config.allowed_worker.permits(ip) {
        return bare_400();
    }

    let query: ControlQuery = match serde_urlencoded::from_str(&raw_query) {
        Ok(q) => q,
        Err(_) => return bare_400(),
    };

    match query.cmd.as_str() {
        "getwork" => {
            let task = state.dispatcher.claim().await;
            json_response(StatusCode::OK, None, &task)
        }
        "finished" => {
            let (Some(id), Some(trytes)) = (query.id, query.trytes) else {
                return bare_400();
            };
            let nonce = match Trytes::parse(&trytes) {
                Ok(t) => t,
                Err(_) => return bare_400(),
            };
            match state.dispatcher.complete(id, &nonce) {
                Ok(()) => warp::reply::Response::new(hyper::Body::empty()),
                Err(_) => bare_400(),
            }
        }
        "getstatus" => {
            let snapshot = state.dispatcher.snapshot().await;
            json_response(StatusCode::OK, None, &snapshot)
        }
        _ => bare_400(),
    }
}
