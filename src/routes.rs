use crate::{handlers, AppState};
use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Request},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

const MAX_BODY_BYTES: usize = 64 * 1024;

/// Tags every request with a random `x-request-id` unless the caller sent one.
#[derive(Clone, Copy, Default)]
struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string()).ok().map(RequestId::new)
    }
}

fn cors_layer(allowed_origins: &[HeaderValue]) -> CorsLayer {
    let origin = if allowed_origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(allowed_origins.iter().cloned())
    };
    CorsLayer::new().allow_origin(origin).allow_methods(Any).allow_headers(Any)
}

/// Creates the Axum router and associates routes with handlers.
pub fn create_router(state: Arc<AppState>, allowed_origins: &[HeaderValue]) -> Router {
    Router::new()
        .route(
            "/communities",
            post(handlers::create_community).get(handlers::list_communities),
        )
        .route("/communities/{name}", get(handlers::get_community))
        .route(
            "/communities/{name}/favourite",
            get(handlers::favourite_status)
                .put(handlers::favourite_community)
                .delete(handlers::unfavourite_community),
        )
        .route("/communities/{name}/memes", get(handlers::community_memes))
        .route("/communities/{name}/templates", get(handlers::community_templates))
        .route("/communities/{name}/exists", get(handlers::community_exists))
        .route("/memes", post(handlers::create_meme).get(handlers::list_memes))
        .route("/memes/{id}", get(handlers::get_meme))
        .route("/memes/{id}/vote", get(handlers::my_vote).put(handlers::vote_meme))
        .route("/memes/{id}/score", get(handlers::meme_score))
        .route("/templates", get(handlers::list_templates))
        // Middleware Layers (last added runs first)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer(allowed_origins))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        }))
        .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
        .with_state(state)
}
