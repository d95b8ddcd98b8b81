use chrono::{DateTime, Utc};
use contracts::shared::logger::{iso_timestamp, Session};

use super::store::{ClearTarget, LogStore, Result};

/// Сессия сервера: создаётся один раз при старте процесса.
pub struct SessionTracker;

impl SessionTracker {
    /// Новая сессия: логи прошлого запуска очищаются, затем
    /// перезаписывается маркер.
    pub fn start(store: &LogStore) -> Result<Session> {
        let session = new_session(Utc::now());
        store.clear(ClearTarget::All)?;
        store.write_session(&session)?;
        tracing::info!(
            "Log session {} started at {}",
            session.session_id,
            session.timestamp
        );
        Ok(session)
    }
}

pub fn new_session(now: DateTime<Utc>) -> Session {
    Session {
        timestamp: iso_timestamp(now),
        session_id: format!("{:08x}", rand::random::<u32>()),
        started_at: now.timestamp_millis(),
    }
}
