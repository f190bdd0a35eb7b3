//! `Authorization: token <T>` header parsing.

pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header?.strip_prefix("token ").map(str::trim)
}

pub fn raw_http_response(
    status: warp::http::StatusCode,
    content_type: Option<&str>,
    cors: Option<&str>,
    body: Vec<u8>,
) -> warp::reply::Response {
    let mut builder = warp::http::Response::builder().status(status);
    if let Some(ct) = content_type {
        builder = builder.header("Content-Type", ct);
    }
    if let Some(origin) = cors {
        builder = builder.header("Access-Control-Allow-Origin", origin);
    }
    builder
        .body(hyper::Body::from(body))
        .expect("building a response from a fixed header set cannot fail")
}

pub fn json_response<T: serde::Serialize>(
    status: warp::http::StatusCode,
    cors: Option<&str>,
    value: &T,
) -> warp::reply::Response {
    let body = serde_json::to_vec(value).unwrap_or_default();
    raw_http_response(status, Some("application/json"), cors, body)
}

pub fn bare_400() -> warp::reply::Response {
    raw_http_response(warp::http::StatusCode::BAD_REQUEST, None, None, Vec::new())
}
