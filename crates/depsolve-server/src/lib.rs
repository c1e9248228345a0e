//! HTTP front end: one route per package lookup, answering with the
//! pretty-printed dependency tree.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use depsolve_resolver::service::ResolutionService;
use depsolve_util::errors::DepsolveError;
use tower_http::trace::TraceLayer;

/// Build the router over a shared resolution service.
pub fn app(service: Arc<ResolutionService>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/package/:package/:version", get(package))
        .route("/package/:scope/:package/:version", get(scoped_package))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, service: Arc<ResolutionService>) -> miette::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| DepsolveError::Server {
            message: format!("Failed to bind {addr}: {e}"),
        })?;
    tracing::info!("listening on http://{addr}");
    axum::serve(listener, app(service))
        .await
        .map_err(|e| DepsolveError::Server {
            message: e.to_string(),
        })?;
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn package(
    State(service): State<Arc<ResolutionService>>,
    Path((package, version)): Path<(String, String)>,
) -> Response {
    respond(&service, &package, &version).await
}

async fn scoped_package(
    State(service): State<Arc<ResolutionService>>,
    Path((scope, package, version)): Path<(String, String, String)>,
) -> Response {
    if scope.len() < 2 || !scope.starts_with('@') {
        return StatusCode::BAD_REQUEST.into_response();
    }
    respond(&service, &format!("{scope}/{package}"), &version).await
}

async fn respond(service: &ResolutionService, name: &str, version: &str) -> Response {
    if name.trim().is_empty() {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let served = match service.resolve(name, version).await {
        Ok(served) => served,
        Err(e) => {
            tracing::error!("resolving {name}@{version} failed: {e}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    if served.from_cache() {
        tracing::debug!("served {name}@{version} from cache");
    }

    match served.tree.to_json_pretty() {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            tracing::error!("serializing {name}@{version} failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
