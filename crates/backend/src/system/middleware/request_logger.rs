use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Middleware для логирования HTTP запросов
///
/// Пишет через tracing:
/// - Метод и путь
/// - Статус код
/// - Длительность (ms)
/// - Размер ответа, если он известен заранее
///
/// Опрос GET /api/logs идёт каждые 5 секунд, поэтому успешные
/// запросы пишутся на уровне debug, остальные на info/warn.
pub async fn request_logger(req: Request<Body>, next: Next) -> Response {
    let start = std::time::Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    let duration = start.elapsed().as_millis();
    let status = response.status();
    let size = response
        .headers()
        .get(axum::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    if status.is_server_error() {
        tracing::warn!("{:>5}ms | {:>8} | {} {:>6} {}", duration, size, status.as_u16(), method, path);
    } else if status.is_success() && method == axum::http::Method::GET {
        tracing::debug!("{:>5}ms | {:>8} | {} {:>6} {}", duration, size, status.as_u16(), method, path);
    } else {
        tracing::info!("{:>5}ms | {:>8} | {} {:>6} {}", duration, size, status.as_u16(), method, path);
    }

    response
}
