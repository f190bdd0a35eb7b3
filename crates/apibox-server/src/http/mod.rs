mod auth;
mod client_api;
mod worker_control;

use std::sync::Arc;

use apibox_core::config::Config;
use apibox_engine::{Dispatcher, RateLimiter};
use warp::filters::BoxedFilter;
use warp::Filter;

/// Shared state handed to every route.
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub limiter: Arc<RateLimiter>,
    pub config: Arc<Config>,
    pub http_client: reqwest::Client,
}

fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Builds the full route tree: the client API at `/` and, unless
/// `standalone` is set, the worker-control endpoint at `/control`.
pub fn routes(state: Arc<AppState>) -> BoxedFilter<(warp::reply::Response,)> {
    let client_api = warp::post()
        .and(warp::path::end())
        .and(warp::addr::remote())
        .and(warp::header::optional::<String>("authorization"))
        .and(warp::body::bytes())
        .and(with_state(state.clone()))
        .then(client_api::handle)
        .boxed();

    if state.config.standalone {
        return client_api;
    }

    let raw_query = warp::query::raw().or(warp::any().map(String::new)).unify();
    let worker_control = warp::get()
        .and(warp::path("control"))
        .and(warp::addr::remote())
        .and(raw_query)
        .and(with_state(state.clone()))
        .then(worker_control::handle)
        .boxed();

    client_api.or(worker_control).unify().boxed()
}

pub(crate) fn remote_ip(remote: Option<std::net::SocketAddr>) -> std::net::IpAddr {
    remote
        .map(|s| s.ip())
        .unwrap_or(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED))
}
