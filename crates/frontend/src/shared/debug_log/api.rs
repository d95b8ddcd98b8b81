use contracts::shared::logger::{CreateLogRequest, LogsResponse};
use gloo_net::http::Request;

use crate::shared::api_utils::api_url;

const LOGS_PATH: &str = "/api/logs";

/// Получить терминальные логи и текущую сессию сервера
pub async fn fetch_logs() -> Result<LogsResponse, String> {
    let response = Request::get(&api_url(LOGS_PATH))
        .send()
        .await
        .map_err(|e| format!("Request failed: {}", e))?;

    if !response.ok() {
        return Err(format!("HTTP error: {}", response.status()));
    }

    response
        .json::<LogsResponse>()
        .await
        .map_err(|e| format!("Failed to parse response: {}", e))
}

/// Записать строку в терминальный лог на сервере
pub async fn post_log(request: &CreateLogRequest) -> Result<(), String> {
    let response = Request::post(&api_url(LOGS_PATH))
        .json(request)
        .map_err(|e| format!("Failed to encode request: {}", e))?
        .send()
        .await
        .map_err(|e| format!("Request failed: {}", e))?;

    if !response.ok() {
        return Err(format!("HTTP error: {}", response.status()));
    }
    Ok(())
}

/// Очистить все терминальные логи
pub async fn clear_logs() -> Result<(), String> {
    let response = Request::delete(&api_url(LOGS_PATH))
        .send()
        .await
        .map_err(|e| format!("Request failed: {}", e))?;

    if !response.ok() {
        return Err(format!("HTTP error: {}", response.status()));
    }
    Ok(())
}
