use chrono::Utc;
use contracts::shared::logger::{iso_timestamp, pretty_json, AggregatedLogs, LogCategory, LogLine, Session};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

const TERMINAL_DIR: &str = "terminal";
const API_DIR: &str = "api";
const SESSION_MARKER: &str = "session.marker";

#[derive(Debug, Error)]
pub enum LogStoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize session marker: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Log store lock poisoned")]
    Poisoned,
}

impl LogStoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        LogStoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, LogStoreError>;

/// Что очищать
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearTarget {
    Category(LogCategory),
    All,
}

/// Файловое хранилище логов разработки.
///
/// Структура каталога:
/// ```text
/// <root>/terminal/error.log
/// <root>/terminal/build.log
/// <root>/terminal/runtime.log
/// <root>/terminal/session.marker
/// <root>/api/<route>.log
/// <root>/api/<route>-error.log
/// ```
///
/// Все записи идут через один мьютекс: файлы только дописываются,
/// и строки разных запросов не должны перемешиваться.
pub struct LogStore {
    root: PathBuf,
    terminal_dir: PathBuf,
    api_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl LogStore {
    /// Открывает хранилище, создавая каталоги при необходимости.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let terminal_dir = root.join(TERMINAL_DIR);
        let api_dir = root.join(API_DIR);

        for dir in [&root, &terminal_dir, &api_dir] {
            fs::create_dir_all(dir).map_err(|e| LogStoreError::io(dir, e))?;
        }

        Ok(Self {
            root,
            terminal_dir,
            api_dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn category_path(&self, category: LogCategory) -> PathBuf {
        self.terminal_dir.join(category.file_name())
    }

    pub fn session_path(&self) -> PathBuf {
        self.terminal_dir.join(SESSION_MARKER)
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock.lock().map_err(|_| LogStoreError::Poisoned)
    }

    /// Дописывает `line` в конец файла категории как есть.
    pub fn append(&self, category: LogCategory, line: &str) -> Result<()> {
        let _guard = self.lock()?;
        append_to(&self.category_path(category), line)
    }

    /// Формирует запись с текущим временем и дописывает её. Возвращает
    /// записанный текст.
    pub fn append_entry(
        &self,
        category: LogCategory,
        message: &str,
        detail: Option<serde_json::Value>,
    ) -> Result<String> {
        let rendered = LogLine::new(message, detail).render();
        self.append(category, &rendered)?;
        Ok(rendered)
    }

    /// Полное содержимое категории; пустая строка, если файла ещё нет.
    pub fn read_all(&self, category: LogCategory) -> Result<String> {
        read_or_empty(&self.category_path(category))
    }

    /// Чтение всех категорий для GET /api/logs. Ошибка чтения одной
    /// категории не мешает остальным.
    pub fn aggregate(&self) -> AggregatedLogs {
        let mut logs = AggregatedLogs::default();
        for category in LogCategory::ALL {
            match self.read_all(category) {
                Ok(content) => logs.set(category, content),
                Err(e) => tracing::warn!("Failed to read {} log: {}", category, e),
            }
        }
        logs
    }

    pub fn clear(&self, target: ClearTarget) -> Result<()> {
        let _guard = self.lock()?;
        let categories: &[LogCategory] = match &target {
            ClearTarget::Category(c) => std::slice::from_ref(c),
            ClearTarget::All => &LogCategory::ALL,
        };
        for category in categories {
            let path = self.category_path(*category);
            File::create(&path).map_err(|e| LogStoreError::io(&path, e))?;
        }
        Ok(())
    }

    /// Перезаписывает маркер сессии целиком: запись во временный файл
    /// и переименование поверх старого.
    pub fn write_session(&self, session: &Session) -> Result<()> {
        let json = serde_json::to_string_pretty(session)?;
        let path = self.session_path();
        let tmp = self.terminal_dir.join(format!("{}.tmp", SESSION_MARKER));

        let _guard = self.lock()?;
        fs::write(&tmp, json).map_err(|e| LogStoreError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| LogStoreError::io(&path, e))?;
        Ok(())
    }

    pub fn read_session(&self) -> Result<Option<Session>> {
        let path = self.session_path();
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(LogStoreError::io(&path, e)),
        }
    }

    /// Лог конкретного API-роута: `api/<route>.log`
    pub fn append_api(&self, route: &str, message: &str, data: Option<&serde_json::Value>) -> Result<()> {
        let entry = api_entry(message, data);
        let _guard = self.lock()?;
        append_to(&self.api_dir.join(format!("{}.log", route)), &entry)
    }

    /// Ошибки API-роута: `api/<route>-error.log`
    pub fn append_api_error(
        &self,
        route: &str,
        message: &str,
        error: Option<&serde_json::Value>,
    ) -> Result<()> {
        let entry = api_entry(&format!("ERROR: {}", message), error);
        let _guard = self.lock()?;
        append_to(&self.api_dir.join(format!("{}-error.log", route)), &entry)
    }

    pub fn read_api(&self, file_stem: &str) -> Result<String> {
        read_or_empty(&self.api_dir.join(format!("{}.log", file_stem)))
    }
}

// В отличие от терминальных логов, JSON здесь идёт перед завершающим
// переводом строки: `"<ts> | <msg>\n<json>\n"` или `"<ts> | <msg>\n"`.
fn api_entry(message: &str, data: Option<&serde_json::Value>) -> String {
    let mut entry = format!("{} | {}", iso_timestamp(Utc::now()), message);
    if let Some(data) = data.filter(|d| !d.is_null()) {
        entry.push('\n');
        entry.push_str(&pretty_json(data));
    }
    entry.push('\n');
    entry
}

fn append_to(path: &Path, content: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| LogStoreError::io(path, e))?;
    file.write_all(content.as_bytes())
        .and_then(|_| file.flush())
        .map_err(|e| LogStoreError::io(path, e))
}

fn read_or_empty(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(LogStoreError::io(path, e)),
    }
}
