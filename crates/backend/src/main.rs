pub mod handlers;
pub mod routes;
pub mod shared;
pub mod system;

use std::sync::Arc;
use tokio::net::TcpListener;

use handlers::AppState;
use shared::logger::dev_runner::{self, DevCommand};
use shared::logger::{LogStore, SessionTracker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, config_source) = shared::config::load_config()?;
    let log_root = config.log_root()?;
    system::tracing::initialize(&log_root)?;
    tracing::info!("{}", config_source);

    // Хранилище логов и новая сессия: логи прошлого запуска очищаются
    let store = Arc::new(LogStore::open(&log_root)?);
    let session = SessionTracker::start(&store)?;
    tracing::info!(
        "Terminal logs in {} (session {})",
        log_root.join("terminal").display(),
        session.session_id
    );

    // backend --wrap trunk serve: вывод сборки фронтенда попадает в build.log
    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Some(command) = DevCommand::from_args(&args) {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            match dev_runner::run(store, command).await {
                Ok(code) => tracing::info!("Wrapped command finished: {:?}", code),
                Err(e) => tracing::error!("Wrapped command failed: {:#}", e),
            }
        });
    }

    let app = routes::configure_routes(AppState::new(store));

    let addr = config.bind_addr()?;
    tracing::info!("Attempting to bind server to http://{}", addr);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => {
            tracing::info!("Server successfully bound to {}", addr);
            listener
        }
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            return Err(e.into());
        }
    };

    axum::serve(listener, app).await?;
    Ok(())
}
