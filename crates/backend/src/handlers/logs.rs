use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use contracts::shared::logger::{CreateLogRequest, LogCategory, LogsResponse, WriteAck};

use super::error::ApiError;
use super::AppState;
use crate::shared::logger::ClearTarget;

const ROUTE: &str = "logs";

/// GET /api/logs
///
/// Всегда 200: отсутствующие файлы отдаются пустыми строками,
/// нечитаемый маркер сессии отдаётся как `null`.
pub async fn list_all(State(state): State<AppState>) -> Json<LogsResponse> {
    let logs = state.store.aggregate();
    let session = state.store.read_session().unwrap_or_else(|e| {
        tracing::warn!("Failed to read session marker: {}", e);
        None
    });
    Json(LogsResponse { logs, session })
}

/// POST /api/logs
///
/// Тело разбирается как JSON независимо от Content-Type.
pub async fn create(State(state): State<AppState>, payload: Bytes) -> Result<Json<WriteAck>, ApiError> {
    let body: serde_json::Value = serde_json::from_slice(&payload).map_err(|e| {
        tracing::debug!("Rejected log body: {}", e);
        ApiError::InvalidBody
    })?;
    if !body.is_object() {
        return Err(ApiError::InvalidBody);
    }

    let category: LogCategory = body
        .get("type")
        .and_then(|t| t.as_str())
        .and_then(|t| t.parse().ok())
        .ok_or(ApiError::InvalidLogType)?;

    let req: CreateLogRequest = serde_json::from_value(body).map_err(|_| ApiError::InvalidBody)?;

    state
        .store
        .append_entry(category, &req.message, req.error)
        .map_err(|e| {
            tracing::error!("Failed to append {} log: {}", category, e);
            ApiError::WriteFailed
        })?;

    Ok(Json(WriteAck::ok()))
}

/// DELETE /api/logs
///
/// Очищает все категории; маркер сессии не трогает.
pub async fn clear_all(State(state): State<AppState>) -> Result<Json<WriteAck>, ApiError> {
    if let Err(e) = state.store.clear(ClearTarget::All) {
        tracing::error!("Failed to clear logs: {}", e);
        let detail = serde_json::Value::String(e.to_string());
        if let Err(e) = state
            .store
            .append_api_error(ROUTE, "Failed to clear terminal logs", Some(&detail))
        {
            tracing::warn!("Failed to record clear failure: {}", e);
        }
        return Err(ApiError::ClearFailed);
    }

    if let Err(e) = state.store.append_api(ROUTE, "Cleared terminal logs", None) {
        tracing::warn!("Failed to record clear: {}", e);
    }
    Ok(Json(WriteAck::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::configure_routes;
    use crate::shared::logger::{LogStore, SessionTracker};
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use axum::Router;
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn setup() -> (TempDir, Arc<LogStore>, Router) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(LogStore::open(dir.path().join("console_logs")).unwrap());
        let app = configure_routes(AppState::new(Arc::clone(&store)));
        (dir, store, app)
    }

    async fn send(app: &Router, method: Method, body: Option<&str>) -> (StatusCode, serde_json::Value) {
        send_with_type(app, method, body, Some("application/json")).await
    }

    async fn send_with_type(
        app: &Router,
        method: Method,
        body: Option<&str>,
        content_type: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri("/api/logs");
        let body = match body {
            Some(json) => {
                if let Some(content_type) = content_type {
                    builder = builder.header("content-type", content_type);
                }
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes)
            .unwrap_or_else(|e| panic!("Expected valid JSON body: {e}"));
        (status, json)
    }

    #[tokio::test]
    async fn cold_start_returns_empty_logs_and_null_session() {
        let (_dir, _store, app) = setup();
        let (status, json) = send(&app, Method::GET, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json,
            serde_json::json!({"logs": {"error": "", "build": "", "runtime": ""}, "session": null})
        );
    }

    #[tokio::test]
    async fn post_then_get_returns_single_line() {
        let (_dir, _store, app) = setup();
        let (status, json) = send(&app, Method::POST, Some(r#"{"type":"build","message":"compiled"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!({"success": true}));

        let (_, json) = send(&app, Method::GET, None).await;
        let build = json["logs"]["build"].as_str().unwrap();
        let (timestamp, rest) = build.split_once(" | ").unwrap();
        assert!(!timestamp.is_empty());
        assert!(!timestamp.contains(char::is_whitespace));
        assert_eq!(rest, "compiled\n");
        assert_eq!(json["logs"]["error"], "");
        assert_eq!(json["logs"]["runtime"], "");
    }

    #[tokio::test]
    async fn post_with_error_detail_pretty_prints() {
        let (_dir, store, app) = setup();
        let (status, _) = send(
            &app,
            Method::POST,
            Some(r#"{"type":"error","message":"crash","error":{"stack":"at main"}}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let content = store.read_all(LogCategory::Error).unwrap();
        assert!(content.ends_with(" | crash\n{\n  \"stack\": \"at main\"\n}\n"));
    }

    #[tokio::test]
    async fn post_unknown_type_is_rejected_without_writes() {
        let (_dir, store, app) = setup();
        for body in [
            r#"{"type":"warn","message":"x"}"#,
            r#"{"type":"ERROR","message":"x"}"#,
            r#"{"type":7,"message":"x"}"#,
            r#"{"message":"x"}"#,
        ] {
            let (status, json) = send(&app, Method::POST, Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
            assert_eq!(json, serde_json::json!({"error": "Invalid log type"}));
        }
        for category in LogCategory::ALL {
            assert!(!store.category_path(category).exists());
        }
    }

    #[tokio::test]
    async fn post_without_json_content_type_is_accepted() {
        let (_dir, store, app) = setup();
        let body = r#"{"type":"build","message":"compiled"}"#;
        let (status, _) = send_with_type(&app, Method::POST, Some(body), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send_with_type(&app, Method::POST, Some(body), Some("text/plain")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(store.read_all(LogCategory::Build).unwrap().lines().count(), 2);

        let (status, json) = send_with_type(
            &app,
            Method::POST,
            Some(r#"{"type":"warn","message":"x"}"#),
            Some("text/plain"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, serde_json::json!({"error": "Invalid log type"}));
    }

    #[tokio::test]
    async fn post_malformed_body_is_bad_request() {
        let (_dir, _store, app) = setup();
        for body in ["not json", "[1,2]", r#"{"type":"build","message":5}"#] {
            let (status, json) = send(&app, Method::POST, Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
            assert_eq!(json["error"], "Invalid request body");
        }
    }

    #[tokio::test]
    async fn post_write_failure_is_server_error() {
        let (_dir, store, app) = setup();
        std::fs::remove_dir_all(store.root().join("terminal")).unwrap();
        let (status, json) = send(&app, Method::POST, Some(r#"{"type":"runtime","message":"x"}"#)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, serde_json::json!({"error": "Failed to write log"}));
    }

    #[tokio::test]
    async fn get_reports_current_session() {
        let (_dir, store, app) = setup();
        let session = SessionTracker::start(&store).unwrap();
        let (_, json) = send(&app, Method::GET, None).await;
        assert_eq!(json["session"]["sessionId"], session.session_id);
        assert_eq!(json["session"]["timestamp"], session.timestamp);
        assert_eq!(json["session"]["startedAt"], session.started_at);
    }

    #[tokio::test]
    async fn get_survives_corrupt_session_marker() {
        let (_dir, store, app) = setup();
        std::fs::write(store.session_path(), "garbage").unwrap();
        let (status, json) = send(&app, Method::GET, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["session"].is_null());
    }

    #[tokio::test]
    async fn delete_clears_categories_but_keeps_session() {
        let (_dir, store, app) = setup();
        let session = SessionTracker::start(&store).unwrap();
        send(&app, Method::POST, Some(r#"{"type":"runtime","message":"a"}"#)).await;
        send(&app, Method::POST, Some(r#"{"type":"error","message":"b"}"#)).await;

        let (status, json) = send(&app, Method::DELETE, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!({"success": true}));

        for category in LogCategory::ALL {
            assert_eq!(store.read_all(category).unwrap(), "");
        }
        assert_eq!(store.read_session().unwrap(), Some(session));
        assert!(store.read_api("logs").unwrap().ends_with(" | Cleared terminal logs\n"));
    }
}
