use serde::Serialize;

/// Errors surfaced to client-API callers. Every variant maps to HTTP 400
/// with a `{"error", "duration"}` body.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("not allowed")]
    NotAllowed,
    #[error("malformed request")]
    MalformedRequest,
    #[error("{0}")]
    BadRequest(String),
    #[error("rate limited")]
    RateLimited,
    #[error("upstream failure")]
    UpstreamFailure,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
    pub duration: i64,
}

impl ApiError {
    pub fn to_body(&self) -> ApiErrorBody {
        ApiErrorBody {
            error: self.to_string(),
            duration: 0,
        }
    }
}

/// Errors the dispatcher returns to workers at `/control`. Both surface as
/// a bare HTTP 400 with no body.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    #[error("stale")]
    Stale,
    #[error("invalid nonce")]
    InvalidNonce,
}
