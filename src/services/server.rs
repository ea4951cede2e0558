//! HTTP face of the `ListingService`.
//!
//! `GET /scanned` lists files ready for pickup; `POST /scanned` with
//! `{"remove": [...]}` archives them. A removal answers 200 only when no name
//! failed, otherwise 400 with one message per failed name; names that did
//! succeed in that batch stay archived.

use crate::domain::constants::LISTING_ROUTE;
use crate::domain::models::{ListingResponse, RemoveRequest, RemoveResponse};
use crate::services::listing::ListingService;
use crate::services::settings::ListingConfig;
use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

pub fn router(service: Arc<ListingService>) -> Router {
    Router::new()
        .route(LISTING_ROUTE, get(list_files).post(remove_files))
        .with_state(service)
}

async fn list_files(
    State(service): State<Arc<ListingService>>,
) -> Result<Json<ListingResponse>, (StatusCode, Json<RemoveResponse>)> {
    match service.list_files() {
        Ok(files) => Ok(Json(ListingResponse {
            scanned_files: files.iter().map(|f| f.name.clone()).collect(),
            files,
        })),
        Err(e) => {
            tracing::error!(error = %e, "failed to list sync directory");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(error_body(vec![e.to_string()])),
            ))
        }
    }
}

async fn remove_files(
    State(service): State<Arc<ListingService>>,
    Json(request): Json<RemoveRequest>,
) -> (StatusCode, Json<RemoveResponse>) {
    let report = service.acknowledge(&request.remove);
    if report.failed.is_empty() {
        (
            StatusCode::OK,
            Json(RemoveResponse {
                status: "success".to_string(),
                errors: vec![],
                archived: report.archived,
                missing: report.missing,
            }),
        )
    } else {
        tracing::warn!(
            failed = report.failed.len(),
            archived = report.archived.len(),
            "removal batch had failures"
        );
        let errors = report.failed.iter().map(ToString::to_string).collect();
        (StatusCode::BAD_REQUEST, Json(error_body(errors)))
    }
}

fn error_body(errors: Vec<String>) -> RemoveResponse {
    RemoveResponse {
        status: "error".to_string(),
        errors,
        archived: vec![],
        missing: vec![],
    }
}

/// Serves the listing protocol on a single-threaded runtime until Ctrl-C.
pub fn serve(cfg: &ListingConfig) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")?;
    let service = Arc::new(ListingService::from_config(cfg));
    let addr = cfg.bind;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        tracing::info!(addr = %addr, sync = %cfg.sync.display(), "listing server listening");
        axum::serve(listener, router(service))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("listing server error")?;
        tracing::info!("listing server stopped");
        Ok::<_, anyhow::Error>(())
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
