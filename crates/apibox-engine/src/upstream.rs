//! Pass-through adapter (C8): forwards any non-attach-to-tangle command
//! unchanged to the backing ledger node.

use reqwest::Client;
use tracing::warn;

const MAX_ATTEMPTS: u32 = 5;

/// Outcome of a forwarded request: enough to let the HTTP layer mirror the
/// backing node's status, body, and CORS header byte-for-byte.
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub cors_header: Option<String>,
}

/// Forwards `body` as an `application/json` POST to `url`, retrying up to
/// `MAX_ATTEMPTS` times with no backoff on network errors. Returns `None`
/// after exhausting retries, which the caller maps to `UpstreamFailure`.
pub async fn forward(client: &Client, url: &str, body: Vec<u8>) -> Option<UpstreamResponse> {
    for attempt in 1..=MAX_ATTEMPTS {
        let result = client
            .post(url)
            .header("Content-Type", "application/json")
            .body(body.clone())
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status().as_u16();
                let cors_header = response
                    .headers()
                    .get("access-control-allow-origin")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let body = response.bytes().await.ok()?.to_vec();
                return Some(UpstreamResponse {
                    status,
                    body,
                    cors_header,
                });
            }
            Err(err) => {
                warn!(attempt, %err, "pass-through request to backing node failed");
            }
        }
    }
    None
}
