use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Инициализация системы трассировки (tracing)
///
/// Логи пишутся в:
/// - stdout (с цветами)
/// - `<log_root>/backend.log` (без цветов)
///
/// Собственный лог сервера не смешивается с терминальными логами
/// в `<log_root>/terminal`, которые отдаёт /api/logs.
pub fn initialize(log_root: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(log_root).map_err(|e| {
        anyhow::anyhow!(
            "Cannot create log directory {}: {} ({:?})",
            log_root.display(),
            e,
            e.kind()
        )
    })?;

    let log_file_path = log_root.join("backend.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)
        .map_err(|e| anyhow::anyhow!("Cannot open log file {}: {}", log_file_path.display(), e))?;

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=warn".into());

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&log_level))
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Arc::new(log_file))
                .with_ansi(false),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Tracing subscriber already set: {}", e))?;

    tracing::info!("Log level: {}", log_level);
    tracing::info!("Server log file: {}", log_file_path.display());
    Ok(())
}
