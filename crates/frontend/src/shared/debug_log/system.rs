use contracts::shared::logger::{CreateLogRequest, LogCategory};
use leptos::task::spawn_local;

use super::api;

/// Системный лог приложения: только консоль
pub fn log(message: &str) {
    log::info!("[System] {}", message);
}

/// Системная ошибка: консоль и error.log на сервере.
/// Если сервер недоступен, ошибка остаётся только в консоли.
pub fn error(message: &str, detail: Option<serde_json::Value>) {
    log::error!("[System Error] {}", message);

    let mut request = CreateLogRequest::new(LogCategory::Error, message);
    if let Some(detail) = detail {
        request = request.with_error(detail);
    }
    spawn_local(async move {
        if let Err(e) = api::post_log(&request).await {
            log::warn!("[System] failed to relay error: {}", e);
        }
    });
}
