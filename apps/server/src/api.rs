//! HTTP API Server
//!
//! Exposes the image search, pagination, proxy and bulk download
//! endpoints consumed by the browser front end.
//!
//! - JSON endpoints answer errors with `{"error": "..."}`
//! - The proxy endpoint streams the upstream body and answers errors in
//!   plain text
//! - CORS is open so the front end can be served from anywhere

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Query, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use imgdl_core::{ImgdlCore, ImgdlError};
use imgdl_types::{
    DownloadRequest, DownloadResponse, ErrorResponse, MoreParams, MoreResponse, ProxyParams,
    SearchParams, SearchResponse,
};
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

// ============================================================================
// Errors
// ============================================================================

/// Error answered by the JSON endpoints
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<ImgdlError> for ApiError {
    fn from(error: ImgdlError) -> Self {
        let status = status_for(&error);
        if status.is_server_error() {
            tracing::error!(error = %error, "request failed");
        }
        Self {
            status,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

fn status_for(error: &ImgdlError) -> StatusCode {
    if error.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

// ============================================================================
// Server
// ============================================================================

/// Build the application router around `core`
pub fn router(core: ImgdlCore) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        // Health check
        .route("/ping", get(|| async { "pong" }))
        // Search sessions
        .route("/api/search", get(handle_search))
        .route("/api/more", get(handle_more))
        // Downloads
        .route("/api/proxy_download", get(handle_proxy_download))
        .route("/api/download", post(handle_download))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(core)
}

/// Serve the API on `addr` until `shutdown` resolves
pub async fn serve<F>(core: ImgdlCore, addr: SocketAddr, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(core);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("imgdl server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("imgdl server stopped");
    Ok(())
}

// ============================================================================
// HTTP Handlers
// ============================================================================

/// GET /api/search?q=..&size=..: open a session and return its first page
async fn handle_search(
    State(core): State<ImgdlCore>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let (session_id, results) = core.search(&params.q, &params.size).await?;
    Ok(Json(SearchResponse {
        results,
        session_id,
    }))
}

/// GET /api/more?session_id=..: next page of an existing session
async fn handle_more(
    State(core): State<ImgdlCore>,
    Query(params): Query<MoreParams>,
) -> Result<Json<MoreResponse>, ApiError> {
    let session_id = params
        .session_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("Invalid or expired session"))?;

    let results = core.more(&session_id).await?;
    Ok(Json(MoreResponse { results }))
}

/// POST /api/download: save every URL under the download directory
async fn handle_download(
    State(core): State<ImgdlCore>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> Result<Json<DownloadResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    let results = core.download_all(&request.urls).await?;
    Ok(Json(DownloadResponse { results }))
}

/// GET /api/proxy_download?url=..: stream one image back as an attachment
async fn handle_proxy_download(
    State(core): State<ImgdlCore>,
    Query(params): Query<ProxyParams>,
) -> Response {
    let Some(url) = params.url.filter(|u| !u.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "No URL provided").into_response();
    };

    let resource = match core.proxy(&url).await {
        Ok(resource) => resource,
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                tracing::error!(url = %url, error = %e, "proxy download failed");
            }
            return (status, e.to_string()).into_response();
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&resource.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("image/jpeg")),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_bytes(format!("attachment; filename=\"{}\"", resource.filename).as_bytes())
            .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );
    if let Some(length) = resource.content_length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }

    (headers, Body::from_stream(resource.body)).into_response()
}
