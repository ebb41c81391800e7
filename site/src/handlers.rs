use archportal::{ArtifactRequest, MirrorError, MirrorStatus};
use axum::{
    extract::{rejection::PathRejection, ConnectInfo, FromRequestParts, Path, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use tracing::debug;

use crate::app::AppState;
use crate::error::SiteError;

/// Address of the requesting client.
///
/// Taken from the first `X-Forwarded-For` entry when the server is configured
/// to trust it, otherwise from the peer socket address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddress(pub String);

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("x-forwarded-for")?.to_str().ok()?;
    let first = value.split(',').next()?.trim();
    if first.is_empty() {
        None
    } else {
        Some(first.to_string())
    }
}

impl FromRequestParts<AppState> for ClientAddress {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if state.config.server.trust_forwarded_for {
            if let Some(address) = forwarded_for(&parts.headers) {
                return Ok(ClientAddress(address));
            }
        }

        let address = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_default();
        Ok(ClientAddress(address))
    }
}

fn disallow_caching(headers: &mut HeaderMap) {
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    headers.insert("x-accel-expires", HeaderValue::from_static("0"));
}

async fn resolve_download(
    state: &AppState,
    file: Result<Path<String>, PathRejection>,
    client: &str,
) -> Result<Response, SiteError> {
    let Path(file) = file.map_err(|e| MirrorError::InvalidPath(e.body_text()))?;
    debug!("Download of {} requested by {}", file, client);

    let request = ArtifactRequest::new(&file, client)?;
    let target = state.redirector.redirect(&request).await?;

    Ok((
        StatusCode::FOUND,
        [(header::LOCATION, target.url)],
    )
        .into_response())
}

/// Redirect a download to a suitable mirror.
pub async fn download(
    State(state): State<AppState>,
    ClientAddress(client): ClientAddress,
    file: Result<Path<String>, PathRejection>,
) -> Response {
    let mut response = match resolve_download(&state, file, &client).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    };
    disallow_caching(response.headers_mut());
    response
}

#[derive(Serialize)]
pub struct MirrorStatusResponse {
    pub data: Vec<MirrorStatus>,
}

/// List all mirrors with their sync status.
pub async fn mirror_status(State(state): State<AppState>) -> Result<Response, SiteError> {
    let data = state.catalog.mirror_status().await?;

    Ok((
        [(header::CACHE_CONTROL, "public, s-maxage=600")],
        Json(MirrorStatusResponse { data }),
    )
        .into_response())
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Report that the service is up.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        timestamp: chrono::Utc::now(),
    })
}
