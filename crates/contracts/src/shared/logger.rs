use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Канал терминального лога. Каждой категории соответствует свой файл.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogCategory {
    Error,
    Build,
    Runtime,
}

impl LogCategory {
    pub const ALL: [LogCategory; 3] = [LogCategory::Error, LogCategory::Build, LogCategory::Runtime];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Error => "error",
            LogCategory::Build => "build",
            LogCategory::Runtime => "runtime",
        }
    }

    /// Имя файла внутри каталога `terminal`
    pub fn file_name(&self) -> &'static str {
        match self {
            LogCategory::Error => "error.log",
            LogCategory::Build => "build.log",
            LogCategory::Runtime => "runtime.log",
        }
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown log category '{}'", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for LogCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "error" => Ok(LogCategory::Error),
            "build" => Ok(LogCategory::Build),
            "runtime" => Ok(LogCategory::Runtime),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

/// ISO-8601 с миллисекундами и суффиксом `Z`: `2024-05-01T10:20:30.123Z`
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Одна запись терминального лога.
///
/// На диске: `"<timestamp> | <message>\n"`, затем JSON деталей
/// (pretty-printed) и перевод строки, если детали есть.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    pub timestamp: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl LogLine {
    pub fn new(message: impl Into<String>, detail: Option<serde_json::Value>) -> Self {
        Self::at(Utc::now(), message, detail)
    }

    pub fn at(at: DateTime<Utc>, message: impl Into<String>, detail: Option<serde_json::Value>) -> Self {
        Self {
            timestamp: iso_timestamp(at),
            message: message.into(),
            detail: detail.filter(|d| !is_empty_detail(d)),
        }
    }

    pub fn render(&self) -> String {
        let mut out = format!("{} | {}\n", self.timestamp, self.message);
        if let Some(detail) = &self.detail {
            out.push_str(&pretty_json(detail));
            out.push('\n');
        }
        out
    }
}

/// null, false, 0 и "" приравниваются к отсутствию деталей
fn is_empty_detail(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Bool(b) => !b,
        serde_json::Value::Number(n) => n.as_f64() == Some(0.0),
        serde_json::Value::String(s) => s.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => false,
    }
}

/// Pretty-print JSON с отступом в 2 пробела
pub fn pretty_json(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Маркер сессии сервера. Перезаписывается при каждом старте процесса.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub timestamp: String,
    pub session_id: String,
    pub started_at: i64,
}

/// Содержимое всех трёх категорий на момент чтения
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedLogs {
    pub error: String,
    pub build: String,
    pub runtime: String,
}

impl AggregatedLogs {
    pub fn get(&self, category: LogCategory) -> &str {
        match category {
            LogCategory::Error => &self.error,
            LogCategory::Build => &self.build,
            LogCategory::Runtime => &self.runtime,
        }
    }

    pub fn set(&mut self, category: LogCategory, content: String) {
        match category {
            LogCategory::Error => self.error = content,
            LogCategory::Build => self.build = content,
            LogCategory::Runtime => self.runtime = content,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.error.is_empty() && self.build.is_empty() && self.runtime.is_empty()
    }
}

/// Ответ GET /api/logs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogsResponse {
    pub logs: AggregatedLogs,
    pub session: Option<Session>,
}

/// Тело POST /api/logs
///
/// `type` остаётся строкой: проверка категории выполняется на сервере,
/// чтобы неизвестный тип давал 400 "Invalid log type", а не ошибку парсинга.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateLogRequest {
    #[serde(rename = "type", default)]
    pub log_type: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
}

impl CreateLogRequest {
    pub fn new(category: LogCategory, message: impl Into<String>) -> Self {
        Self {
            log_type: category.as_str().to_string(),
            message: message.into(),
            error: None,
        }
    }

    pub fn with_error(mut self, error: serde_json::Value) -> Self {
        self.error = Some(error);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteAck {
    pub success: bool,
}

impl WriteAck {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
}
