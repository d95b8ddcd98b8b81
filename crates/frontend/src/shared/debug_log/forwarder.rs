use chrono::{DateTime, Utc};
use contracts::shared::logger::{iso_timestamp, pretty_json};
use serde::Serialize;
use std::collections::BTreeMap;

use super::storage::{BrowserStorage, KeyValueStore};

const STORAGE_PREFIX: &str = "debug_logs_";

/// Аргумент записи лога: текст выводится как есть, значения (объекты,
/// массивы, null) печатаются как форматированный JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum LogArg {
    Text(String),
    Value(serde_json::Value),
}

impl LogArg {
    /// Сериализует произвольное значение. Если сериализация невозможна,
    /// в лог попадает текст ошибки вместо значения.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => LogArg::Value(v),
            Err(e) => LogArg::Text(format!("<unserializable: {}>", e)),
        }
    }

    fn render(&self) -> String {
        match self {
            LogArg::Text(text) => text.clone(),
            LogArg::Value(serde_json::Value::String(s)) => s.clone(),
            LogArg::Value(v @ (serde_json::Value::Number(_) | serde_json::Value::Bool(_))) => v.to_string(),
            LogArg::Value(v) => pretty_json(v),
        }
    }
}

impl From<&str> for LogArg {
    fn from(s: &str) -> Self {
        LogArg::Text(s.to_string())
    }
}

impl From<String> for LogArg {
    fn from(s: String) -> Self {
        LogArg::Text(s)
    }
}

impl From<serde_json::Value> for LogArg {
    fn from(v: serde_json::Value) -> Self {
        LogArg::Value(v)
    }
}

/// Логгер отдельного компонента: пишет в консоль и копит строки в
/// хранилище под ключом `debug_logs_<component>`.
///
/// С сервером не общается. Два логгера с одним именем делят один буфер.
#[derive(Clone)]
pub struct DebugLogger<S: KeyValueStore> {
    component: String,
    storage_key: String,
    storage: S,
    clock: fn() -> DateTime<Utc>,
}

/// Логгер компонента поверх localStorage
pub fn for_component(component: &str) -> DebugLogger<BrowserStorage> {
    DebugLogger::for_component(BrowserStorage, component)
}

/// Логгер фичи поверх localStorage
pub fn for_feature(feature: &str) -> DebugLogger<BrowserStorage> {
    DebugLogger::for_feature(BrowserStorage, feature)
}

impl<S: KeyValueStore> DebugLogger<S> {
    pub fn for_component(storage: S, component: &str) -> Self {
        Self {
            component: component.to_string(),
            storage_key: format!("{}{}", STORAGE_PREFIX, component),
            storage,
            clock: Utc::now,
        }
    }

    /// То же, что `for_component("feature_<name>")`
    pub fn for_feature(storage: S, feature: &str) -> Self {
        Self::for_component(storage, &format!("feature_{}", feature))
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    fn archive_prefix(&self) -> String {
        format!("{}_archive_", self.storage_key)
    }

    pub fn log(&self, args: &[LogArg]) {
        let text = args
            .iter()
            .map(LogArg::render)
            .collect::<Vec<_>>()
            .join(" ");

        log::info!("[{}] {}", self.component, text);

        let entry = format!("{} | {}\n", iso_timestamp((self.clock)()), text);
        let current = self.get_logs();
        self.storage.set(&self.storage_key, &(current + &entry));
    }

    pub fn log_message(&self, message: &str) {
        self.log(&[LogArg::from(message)]);
    }

    /// Сообщение плюс значение, например состояние до и после изменения
    pub fn log_value<T: Serialize + ?Sized>(&self, message: &str, value: &T) {
        self.log(&[LogArg::from(message), LogArg::json(value)]);
    }

    /// Текущий буфер (пустая строка, если записей ещё не было)
    pub fn get_logs(&self) -> String {
        self.storage.get(&self.storage_key).unwrap_or_default()
    }

    /// Очищает буфер. Непустое содержимое сначала сохраняется в архив
    /// под ключом с отметкой времени.
    pub fn clear(&self) {
        let current = self.get_logs();
        if !current.is_empty() {
            let stamp = iso_timestamp((self.clock)()).replace(&[':', '.'][..], "-");
            let archive_key = format!("{}{}", self.archive_prefix(), stamp);
            self.storage.set(&archive_key, &current);
        }
        self.storage.set(&self.storage_key, "");
    }

    /// Все архивы этого компонента: ключ -> содержимое
    pub fn get_archived(&self) -> BTreeMap<String, String> {
        self.storage
            .keys_with_prefix(&self.archive_prefix())
            .into_iter()
            .map(|key| {
                let content = self.storage.get(&key).unwrap_or_default();
                (key, content)
            })
            .collect()
    }

    pub fn export_file_name(&self) -> String {
        format!("{}_debug.log", self.component)
    }

    /// Скачивание текущего буфера файлом `<component>_debug.log`
    pub fn export(&self) -> Result<(), String> {
        crate::shared::export::download_text(&self.export_file_name(), &self.get_logs())
    }
}
