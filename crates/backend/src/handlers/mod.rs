pub mod error;
pub mod logs;

use std::sync::Arc;

use crate::shared::logger::LogStore;

/// Состояние, общее для всех обработчиков
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<LogStore>,
}

impl AppState {
    pub fn new(store: Arc<LogStore>) -> Self {
        Self { store }
    }
}
