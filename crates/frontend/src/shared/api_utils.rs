//! API utilities for frontend-backend communication

/// Порт backend-сервера (см. `[server] port` в config.toml)
pub const BACKEND_PORT: u16 = 3000;

/// Get the base URL for API requests
///
/// Uses the host of the current page and the backend port, so the app
/// works both on localhost and when opened from another machine.
/// Returns an empty string (relative URLs) if window is not available.
pub fn api_base() -> String {
    let Some(window) = web_sys::window() else {
        return String::new();
    };
    let location = window.location();
    let protocol = location.protocol().unwrap_or_else(|_| "http:".to_string());
    let hostname = location
        .hostname()
        .unwrap_or_else(|_| "127.0.0.1".to_string());
    base_url(&protocol, &hostname, BACKEND_PORT)
}

fn base_url(protocol: &str, hostname: &str, port: u16) -> String {
    format!("{}//{}:{}", protocol, hostname, port)
}

/// Build a full API URL from a path (should start with "/api/")
pub fn api_url(path: &str) -> String {
    format!("{}{}", api_base(), path)
}
