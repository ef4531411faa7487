//! Router assembly and small endpoint handlers.

use std::path::Path;

use axum::Router;
use axum::extract::{Path as UrlPath, State};
use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

use super::compression::Compression;
use super::state::AppState;
use crate::config::Settings;
use crate::ws::ws_handler;

const CROSS_ORIGIN_OPENER_POLICY: HeaderName =
    HeaderName::from_static("cross-origin-opener-policy");
const CROSS_ORIGIN_EMBEDDER_POLICY: HeaderName =
    HeaderName::from_static("cross-origin-embedder-policy");

/// Build the application router.
///
/// - `/health` is always routed.
/// - `/_/events` and `/_/changed/{*file}` only when a watch pattern is set.
/// - Everything else falls through to static files when a root is set.
pub fn create_router(state: AppState, settings: &Settings) -> Router {
    let mut router = Router::new().route("/health", get(health_check));

    if settings.watch_config().is_some() {
        router = router
            .route("/_/events", get(ws_handler))
            .route("/_/changed/{*file}", get(trigger_change));
    }

    if let Some(root) = &settings.root {
        router = serve_static_files(router, root, settings.server.compression);
    }

    router.with_state(state)
}

/// Fall back to files under `root`, served with cross-origin isolation and
/// no-cache headers.
fn serve_static_files(
    router: Router<AppState>,
    root: &Path,
    compression: Compression,
) -> Router<AppState> {
    let service = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            CROSS_ORIGIN_OPENER_POLICY,
            HeaderValue::from_static("same-origin"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            CROSS_ORIGIN_EMBEDDER_POLICY,
            HeaderValue::from_static("require-corp"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("max-age=0"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(compression.layer())
        .service(ServeDir::new(root));

    router.fallback_service(service)
}

async fn health_check() -> &'static str {
    "OK"
}

/// Publish `file` as if the watcher had seen it change.
async fn trigger_change(
    State(state): State<AppState>,
    UrlPath(file): UrlPath<String>,
) -> StatusCode {
    let delivered = state.broadcaster.publish(&file);
    crate::log_event!("http", "manual change", "{file} ({delivered} delivered)");
    StatusCode::NO_CONTENT
}
