//! HTTP control API with JSON endpoints

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::controller::Controller;
use crate::error::ForumWatchError;
use crate::records::{MonitoringConfig, NotificationRecord, RunStatus, UpdateConfig};

const DEFAULT_NOTIFICATION_LIMIT: usize = 50;

/// Error response: `{"error": "..."}` with 400 for caller mistakes, 500 otherwise
#[derive(Debug)]
pub struct ApiError(ForumWatchError);

impl From<ForumWatchError> for ApiError {
    fn from(err: ForumWatchError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        tracing::debug!("API request failed with {}: {}", status, self.0);
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

#[derive(Debug, Serialize)]
struct MessageResponse {
    success: bool,
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ManualCheckResponse {
    success: bool,
    new_post: bool,
    message: String,
}

#[derive(Debug, Serialize)]
struct LifecycleResponse {
    success: bool,
    status: RunStatus,
}

#[derive(Debug, Deserialize)]
struct NotificationsQuery {
    limit: Option<usize>,
}

/// Build the control API router
pub fn build_router(controller: Controller) -> Router {
    Router::new()
        .route("/api/status", get(status_handler))
        .route("/api/config", get(get_config_handler).post(update_config_handler))
        .route("/api/notifications", get(notifications_handler))
        .route("/api/test-telegram", post(test_telegram_handler))
        .route("/api/manual-check", post(manual_check_handler))
        .route("/api/service/start", post(start_handler))
        .route("/api/service/stop", post(stop_handler))
        .route("/api/service/restart", post(restart_handler))
        .route("/api/health-check", post(health_check_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(controller)
}

async fn status_handler(State(controller): State<Controller>) -> ApiResult<RunStatus> {
    Ok(Json(controller.status().await?))
}

async fn get_config_handler(
    State(controller): State<Controller>,
) -> ApiResult<Option<MonitoringConfig>> {
    Ok(Json(controller.config().await?))
}

async fn update_config_handler(
    State(controller): State<Controller>,
    body: std::result::Result<Json<UpdateConfig>, JsonRejection>,
) -> ApiResult<MonitoringConfig> {
    let Json(update) = body.map_err(|e| ForumWatchError::Validation(e.body_text()))?;
    Ok(Json(controller.update_config(&update).await?))
}

async fn notifications_handler(
    State(controller): State<Controller>,
    Query(query): Query<NotificationsQuery>,
) -> ApiResult<Vec<NotificationRecord>> {
    let limit = query.limit.unwrap_or(DEFAULT_NOTIFICATION_LIMIT);
    Ok(Json(controller.notifications(limit).await?))
}

async fn test_telegram_handler(State(controller): State<Controller>) -> ApiResult<MessageResponse> {
    controller.test_notify().await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Test message sent successfully".to_string(),
    }))
}

async fn manual_check_handler(
    State(controller): State<Controller>,
) -> ApiResult<ManualCheckResponse> {
    let outcome = controller.manual_check().await?;
    Ok(Json(ManualCheckResponse {
        success: outcome.success,
        new_post: outcome.new_post,
        message: outcome.summary().to_string(),
    }))
}

async fn start_handler(State(controller): State<Controller>) -> ApiResult<LifecycleResponse> {
    let status = controller.start().await?;
    Ok(Json(LifecycleResponse {
        success: true,
        status,
    }))
}

async fn stop_handler(State(controller): State<Controller>) -> ApiResult<LifecycleResponse> {
    let status = controller.stop().await?;
    Ok(Json(LifecycleResponse {
        success: true,
        status,
    }))
}

async fn restart_handler(State(controller): State<Controller>) -> ApiResult<LifecycleResponse> {
    let status = controller.restart().await?;
    Ok(Json(LifecycleResponse {
        success: true,
        status,
    }))
}

async fn health_check_handler(
    State(controller): State<Controller>,
) -> ApiResult<MessageResponse> {
    controller.health_check().await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Health check sent to Telegram".to_string(),
    }))
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}
