//! HTTP routes exposing the home model and command gateway

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use home_core::{CommandSource, Home, HomeError};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub home: Home,
}

/// API response wrapper using serde_json::Value for flexibility
#[derive(Serialize)]
struct ApiResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ApiResponse {
    fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: Some(serde_json::to_value(data).unwrap_or(serde_json::Value::Null)),
            error: None,
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// Gesture report body
#[derive(Deserialize)]
struct GestureRequest {
    gesture: String,
}

/// HTTP status for a gateway error
fn error_status(err: &HomeError) -> StatusCode {
    match err {
        HomeError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        HomeError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        HomeError::Device(_) => StatusCode::BAD_GATEWAY,
        HomeError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn command_response(
    result: Result<home_core::CommandOutcome, HomeError>,
) -> (StatusCode, Json<ApiResponse>) {
    match result {
        Ok(outcome) => (StatusCode::OK, Json(ApiResponse::success(outcome))),
        Err(e) => (error_status(&e), Json(ApiResponse::error(e.to_string()))),
    }
}

/// Health check
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Current state snapshot
async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(state.home.state.snapshot().await))
}

/// Event log, newest first
async fn get_logs(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(state.home.log.snapshot().await))
}

/// Learned behavior and the minute it averages to
async fn get_behavior(State(state): State<AppState>) -> impl IntoResponse {
    let data = state.home.behavior.snapshot().await;
    Json(ApiResponse::success(serde_json::json!({
        "learned_minute": data.learned_minute(),
        "light_on_minutes": data.light_on_minutes,
        "last_auto_light_date": data.last_auto_light_date,
    })))
}

/// Switch a device on or off
async fn control_device(
    State(state): State<AppState>,
    Path((device, switch)): Path<(String, String)>,
) -> impl IntoResponse {
    command_response(
        state
            .home
            .gateway
            .execute(&device, &switch, CommandSource::Manual)
            .await,
    )
}

/// Record a gesture for display only
async fn report_gesture(
    State(state): State<AppState>,
    body: Result<Json<GestureRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Ok(Json(req)) = body else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("No gesture provided")),
        );
    };

    state.home.gateway.record_gesture(&req.gesture).await;
    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({ "gesture": req.gesture }))),
    )
}

/// Act on a gesture-derived command
async fn process_gesture(
    State(state): State<AppState>,
    body: Result<Json<GestureRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Ok(Json(req)) = body else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("No gesture provided")),
        );
    };

    command_response(state.home.gateway.execute_gesture(&req.gesture).await)
}

/// Build the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/status", get(get_status))
        .route("/api/logs", get(get_logs))
        .route("/api/behavior", get(get_behavior))
        .route(
            "/api/control/:device/:state",
            get(control_device).post(control_device),
        )
        .route("/api/gesture", post(report_gesture))
        .route("/api/process_gesture", post(process_gesture))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use device_link::mock::MockDeviceClient;
    use home_core::{Device, HomeConfig, ParsedStatus, SwitchState};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct TestApp {
        _dir: tempfile::TempDir,
        client: Arc<MockDeviceClient>,
        state: AppState,
    }

    async fn app(connected: bool) -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let config = HomeConfig {
            data_dir: dir.path().to_path_buf(),
            ..HomeConfig::default()
        };
        let client = Arc::new(MockDeviceClient::new());
        let home = Home::open(&config, client.clone()).await;
        if connected {
            home.state
                .apply_status(
                    &ParsedStatus::parse("Gas:50|Motion:Clear|Light:OFF|Fan:OFF"),
                    chrono::Local::now(),
                )
                .await;
        }
        TestApp {
            _dir: dir,
            client,
            state: AppState { home },
        }
    }

    async fn call(state: &AppState, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_status_snapshot() {
        let t = app(true).await;
        let (status, body) = call(&t.state, get_req("/api/status")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["gas_value"], 50);
        assert_eq!(body["data"]["light"], "OFF");
        assert_eq!(body["data"]["connected"], true);
    }

    #[tokio::test]
    async fn test_control_invalid_device() {
        let t = app(true).await;
        let (status, body) = call(&t.state, get_req("/api/control/heater/on")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_control_while_disconnected() {
        let t = app(false).await;
        let (status, _) = call(&t.state, get_req("/api/control/light/on")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(t.client.commands().is_empty());
    }

    #[tokio::test]
    async fn test_control_success_updates_state_and_log() {
        let t = app(true).await;
        let (status, body) = call(&t.state, get_req("/api/control/fan/on")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["device"], "fan");
        assert_eq!(body["data"]["state"], "ON");
        assert_eq!(t.client.commands(), vec![(Device::Fan, SwitchState::On)]);

        let (_, logs) = call(&t.state, get_req("/api/logs")).await;
        assert_eq!(logs["data"][0]["message"], "Fan turned ON");
    }

    #[tokio::test]
    async fn test_process_gesture_unknown_name() {
        let t = app(true).await;
        let (status, _) = call(
            &t.state,
            post_json("/api/process_gesture", r#"{"gesture":"wave"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            t.state.home.state.snapshot().await.last_gesture.as_deref(),
            Some("wave")
        );
    }

    #[tokio::test]
    async fn test_gesture_report_requires_body() {
        let t = app(true).await;
        let (status, _) = call(&t.state, post_json("/api/gesture", "{}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &t.state,
            post_json("/api/gesture", r#"{"gesture":"light_on"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(t.client.commands().is_empty());
    }

    #[tokio::test]
    async fn test_behavior_reports_learned_minute() {
        let t = app(true).await;
        t.state.home.behavior.record_light_on(400).await.unwrap();
        t.state.home.behavior.record_light_on(410).await.unwrap();

        let (status, body) = call(&t.state, get_req("/api/behavior")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["learned_minute"], 405);
        assert_eq!(body["data"]["light_on_minutes"], serde_json::json!([400, 410]));
    }
}
