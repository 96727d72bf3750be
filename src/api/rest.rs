use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::dispatch::{self, DispatchError};
use crate::domain::device_service::DeviceService;
use crate::domain::types::*;
use crate::download::Acquired;
use crate::logs::LogSource;
use crate::probe::PrivilegeState;
use crate::properties::PropertyMap;

/// Shared application state for all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub device: Arc<DeviceService>,
    pub request_timeout: Option<Duration>,
}

type ApiError = (StatusCode, Json<ErrorBody>);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/device", get(device))
        .route("/api/v1/root", get(root))
        .route("/api/v1/properties", get(properties))
        .route("/api/v1/properties/{key}", get(property))
        .route("/api/v1/logs/{source}", get(logs))
        .route("/api/v1/updates", get(updates))
        .route("/api/v1/downloads", post(download))
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct RootStatus {
    pub root: PrivilegeState,
    pub busybox: bool,
}

#[derive(Debug, Serialize)]
pub struct Property {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatesQuery {
    #[serde(default)]
    pub skip_root_check: bool,
}

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    pub title: String,
}

async fn health(State(state): State<AppState>) -> Json<DaemonHealth> {
    Json(state.device.health())
}

async fn device(State(state): State<AppState>) -> Result<Json<DeviceSummary>, ApiError> {
    blocking(&state, |d| d.summary()).await.map(Json)
}

async fn root(State(state): State<AppState>) -> Result<Json<RootStatus>, ApiError> {
    blocking(&state, |d| RootStatus {
        root: d.privilege(),
        busybox: d.has_busybox(),
    })
    .await
    .map(Json)
}

async fn properties(State(state): State<AppState>) -> Result<Json<PropertyMap>, ApiError> {
    blocking(&state, |d| d.properties()).await.map(Json)
}

async fn property(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Property>, ApiError> {
    let props = blocking(&state, |d| d.properties()).await?;
    match props.get(&key) {
        Some(value) => Ok(Json(Property {
            value: value.to_string(),
            key,
        })),
        None => Err(error(
            StatusCode::NOT_FOUND,
            ErrorKind::NotFound,
            format!("property '{}' is not set", key),
        )),
    }
}

/// Shell failures are reported as 502 with their failure kind.
async fn logs(
    State(state): State<AppState>,
    Path(source): Path<String>,
) -> Result<Json<LogCapture>, ApiError> {
    let source: LogSource = source.parse().map_err(|e: anyhow::Error| {
        error(StatusCode::NOT_FOUND, ErrorKind::NotFound, e.to_string())
    })?;

    blocking(&state, move |d| d.log_capture(source))
        .await?
        .map(Json)
        .map_err(|e| error(StatusCode::BAD_GATEWAY, e.kind().into(), e.to_string()))
}

async fn updates(
    State(state): State<AppState>,
    Query(query): Query<UpdatesQuery>,
) -> Result<Json<UpdatesReport>, ApiError> {
    blocking(&state, move |d| d.updates(query.skip_root_check))
        .await
        .map(Json)
}

async fn download(
    State(state): State<AppState>,
    Json(req): Json<DownloadRequest>,
) -> Result<Json<Acquired>, ApiError> {
    blocking(&state, move |d| d.acquire(&req.url, &req.title))
        .await?
        .map(Json)
        .map_err(|e| error(StatusCode::BAD_GATEWAY, ErrorKind::Internal, format!("{:#}", e)))
}

// ── Internal helpers ───────────────────────────────────

async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&DeviceService) -> T + Send + 'static,
    T: Send + 'static,
{
    let device = state.device.clone();
    dispatch::offload(state.request_timeout, move || f(&device))
        .await
        .map_err(|e| match e {
            DispatchError::Timeout(_) => error(
                StatusCode::GATEWAY_TIMEOUT,
                ErrorKind::DispatchTimeout,
                e.to_string(),
            ),
            DispatchError::Panicked(_) => error(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorKind::Internal,
                e.to_string(),
            ),
        })
}

fn error(status: StatusCode, kind: ErrorKind, message: String) -> ApiError {
    (status, Json(ErrorBody { kind, message }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::device_service::tests::fake_service;

    fn state(fail_on: Option<&'static str>) -> AppState {
        AppState {
            device: Arc::new(fake_service(None, false, fail_on)),
            request_timeout: Some(Duration::from_secs(10)),
        }
    }

    #[tokio::test]
    async fn kernel_log_failure_is_bad_gateway_with_kind() {
        let st = state(Some("dmesg"));

        let (status, Json(body)) = logs(State(st.clone()), Path("kernel".into()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.kind, ErrorKind::Io);

        let Json(capture) = logs(State(st), Path("system".into())).await.unwrap();
        assert_eq!(capture.source, LogSource::System);
        assert!(capture.text.starts_with("out of logcat"));
    }

    #[tokio::test]
    async fn unknown_log_source_is_not_found() {
        let (status, _) = logs(State(state(None)), Path("radio".into()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_property_is_not_found() {
        let (status, Json(body)) = property(State(state(None)), Path("ro.build.id".into()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn updates_report_gating() {
        let Json(report) = updates(State(state(None)), Query(UpdatesQuery::default()))
            .await
            .unwrap();
        assert!(report.gated);
        assert_eq!(report.root, PrivilegeState::Denied);
    }

    #[tokio::test]
    async fn download_is_delegated() {
        let req = DownloadRequest {
            url: "https://x/app.apk".into(),
            title: "Magisk Stable".into(),
        };
        let Json(acquired) = download(State(state(None)), Json(req)).await.unwrap();
        assert_eq!(acquired.title, "Magisk Stable");
    }
}
