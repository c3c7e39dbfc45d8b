//! Fetch interception: the gateway surface.
//!
//! Every request not under `/-/` is interception. Policy is cache-first:
//! look the request up in the current generation, fall back to the network
//! on a miss, and populate the cache best-effort when the response
//! qualifies. Served responses carry an `x-larder-cache: hit|miss|fallback`
//! header.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Request, State},
    http::{HeaderName, HeaderValue, Method, StatusCode},
    response::Response,
    routing::get,
};
use tracing::{debug, warn};
use url::Url;

use larder_client::{FetchedResponse, Fetcher};
use larder_core::cache::hash::compute_request_key;
use larder_core::manifest::resolve_target;
use larder_core::policy::{same_origin, should_cache};
use larder_core::{GenerationStore, Snapshot};

use crate::error::GatewayError;
use crate::manager::{Manager, snapshot_from_response};
use crate::status;

pub const CACHE_VERDICT_HEADER: &str = "x-larder-cache";

/// Shared state behind the gateway routes.
#[derive(Clone)]
pub struct GatewayState {
    pub manager: Arc<Manager>,
    pub store: GenerationStore,
    pub fetcher: Arc<dyn Fetcher>,
    pub upstream: Url,
    /// Origins the gateway may fetch from besides the upstream: manifest
    /// entry origins plus the configured extra allowances.
    pub allowed_origins: Arc<Vec<Url>>,
    /// Resolved offline fallback target, if configured.
    pub fallback: Option<Url>,
}

/// Build the gateway router: the admin surface under `/-/`, interception
/// for everything else.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/-/status", get(status::status))
        .fallback(intercept)
        .with_state(state)
}

fn origin_allowed(url: &Url, state: &GatewayState) -> bool {
    same_origin(url, &state.upstream) || state.allowed_origins.iter().any(|allowed| same_origin(url, allowed))
}

/// Handle one intercepted request.
///
/// Guarantees exactly one response per request; cache writes are
/// best-effort and never block delivery.
pub async fn intercept(State(state): State<GatewayState>, request: Request) -> Result<Response, GatewayError> {
    let head_only = request.method() == Method::HEAD;
    if request.method() != Method::GET && !head_only {
        return Err(GatewayError::MethodNotAllowed);
    }

    if !state.manager.state().await.is_active() {
        return Err(GatewayError::NotActive);
    }

    // Origin-form targets resolve against the upstream; absolute-form
    // (proxy-style) targets are taken as-is.
    let target = if request.uri().scheme().is_some() {
        request.uri().to_string()
    } else {
        request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string())
    };

    let url = resolve_target(&target, &state.upstream).map_err(|e| GatewayError::BadTarget(e.to_string()))?;

    if !origin_allowed(&url, &state) {
        warn!(url = %url, "refusing request outside the allowed origins");
        return Err(GatewayError::OriginDenied(url.to_string()));
    }

    let generation = state
        .manager
        .current_generation()
        .await
        .ok_or(GatewayError::NotActive)?;
    let key = compute_request_key("GET", url.as_str());

    if let Some(snapshot) = state.store.get_entry(&generation, &key).await? {
        debug!(url = %url, generation, verdict = "hit", "serving cached response");
        return snapshot_response(&snapshot, "hit", head_only);
    }

    debug!(url = %url, generation, verdict = "miss", "cache miss, fetching upstream");

    match state.fetcher.fetch(&url).await {
        Ok(response) => {
            if should_cache("GET", response.status, &url, &response.final_url, &state.upstream) {
                let snapshot = snapshot_from_response(&url, &response);
                if let Err(e) = state.store.put_entry(&generation, &snapshot).await {
                    warn!(url = %url, error = %e, "cache write failed; serving network response anyway");
                }
            }
            network_response(&response, "miss", head_only)
        }

        Err(e) => {
            warn!(url = %url, error = %e, "upstream fetch failed");

            if let Some(fallback_url) = &state.fallback {
                let fallback_key = compute_request_key("GET", fallback_url.as_str());
                if let Ok(Some(snapshot)) = state.store.get_entry(&generation, &fallback_key).await {
                    debug!(url = %url, fallback = %fallback_url, "serving offline fallback");
                    return snapshot_response(&snapshot, "fallback", head_only);
                }
            }

            Err(GatewayError::UpstreamUnavailable(e.to_string()))
        }
    }
}

fn build_response(
    status: u16, headers: &[(String, String)], body: &bytes::Bytes, verdict: &str, head_only: bool,
) -> Result<Response, GatewayError> {
    let status = StatusCode::from_u16(status).map_err(|e| GatewayError::Internal(e.to_string()))?;
    let mut builder = Response::builder().status(status);

    for (name, value) in headers {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name.as_str()), HeaderValue::from_str(value)) {
            builder = builder.header(name, value);
        }
    }
    builder = builder.header(CACHE_VERDICT_HEADER, verdict);

    let body = if head_only { Body::empty() } else { Body::from(body.clone()) };

    builder.body(body).map_err(|e| GatewayError::Internal(e.to_string()))
}

fn snapshot_response(snapshot: &Snapshot, verdict: &str, head_only: bool) -> Result<Response, GatewayError> {
    build_response(snapshot.status, &snapshot.headers, &snapshot.body, verdict, head_only)
}

fn network_response(response: &FetchedResponse, verdict: &str, head_only: bool) -> Result<Response, GatewayError> {
    build_response(response.status, &response.headers, &response.bytes, verdict, head_only)
}
