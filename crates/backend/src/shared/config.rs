use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logs: LogsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogsConfig {
    /// Корень каталога логов (`terminal/`, `api/`, `backend.log`)
    pub root: String,
}

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
[server]
host = "127.0.0.1"
port = 3000

[logs]
root = "console_logs"
"#;

const PORT_ENV: &str = "LOG_RELAY_PORT";

/// Откуда взята конфигурация. Сообщается в лог после инициализации tracing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// Встроенная конфигурация; `missing` - где искали config.toml
    Embedded { missing: Option<PathBuf> },
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "config loaded from {}", path.display()),
            ConfigSource::Embedded { missing: Some(path) } => write!(
                f,
                "config.toml not found at {}, using default embedded configuration",
                path.display()
            ),
            ConfigSource::Embedded { missing: None } => write!(f, "using default embedded configuration"),
        }
    }
}

/// Load configuration from config.toml file
///
/// Search order:
/// 1. Next to the executable (for production)
/// 2. Falls back to embedded default config
///
/// `LOG_RELAY_PORT` overrides `server.port` in both cases.
pub fn load_config() -> anyhow::Result<(Config, ConfigSource)> {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    load_config_from(exe_dir.as_deref())
}

pub fn load_config_from(dir: Option<&Path>) -> anyhow::Result<(Config, ConfigSource)> {
    let candidate = dir.map(|d| d.join("config.toml"));
    let (mut config, source) = match candidate {
        Some(path) if path.exists() => {
            let contents = std::fs::read_to_string(&path)?;
            (parse_config(&contents)?, ConfigSource::File(path))
        }
        missing => (parse_config(DEFAULT_CONFIG)?, ConfigSource::Embedded { missing }),
    };

    if let Ok(port) = std::env::var(PORT_ENV) {
        config.server.port = port
            .parse()
            .map_err(|e| anyhow::anyhow!("{} must be a port number: {}", PORT_ENV, e))?;
    }

    Ok((config, source))
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    Ok(toml::from_str(contents)?)
}

impl Config {
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .map_err(|e| anyhow::anyhow!("invalid server address '{}': {}", addr, e))
    }

    /// Get the log root directory from configuration.
    /// Relative paths are resolved against the current directory,
    /// so `cargo run` from the workspace keeps logs next to the sources.
    pub fn log_root(&self) -> anyhow::Result<PathBuf> {
        let root = Path::new(&self.logs.root);
        if root.is_absolute() {
            return Ok(root.to_path_buf());
        }
        Ok(std::env::current_dir()?.join(root))
    }
}
