//! Отладочное логирование на стороне браузера:
//! - `forwarder`: логи компонентов в localStorage с архивом и экспортом
//! - `poller` + `panel`: опрос терминальных логов dev-сервера
//! - `system`: системные сообщения, ошибки уходят в error.log сервера

pub mod api;
pub mod forwarder;
pub mod panel;
pub mod poller;
pub mod storage;
pub mod system;

pub use forwarder::{for_component, for_feature, DebugLogger, LogArg};
pub use panel::TerminalLogsPanel;
pub use storage::{BrowserStorage, KeyValueStore, MemoryStorage};
