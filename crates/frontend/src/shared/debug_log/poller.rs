//! Опрос GET /api/logs с экспоненциальной задержкой после ошибок.
//!
//! `LogPoller` не знает ни про таймеры, ни про сеть: он решает, когда
//! запросить логи в следующий раз, и отдаёт это `Scheduler`. Каждое
//! запланированное пробуждение несёт `PollTicket`; при остановке опроса
//! все выданные билеты становятся недействительными, поэтому таймер или
//! запрос, завершившийся после размонтирования, ничего не меняет.

use contracts::shared::logger::LogsResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Пауза между успешными запросами
    pub interval_ms: u32,
    /// Задержка после первой ошибки
    pub backoff_base_ms: u32,
    /// Потолок задержки
    pub backoff_cap_ms: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5_000,
            backoff_base_ms: 1_000,
            backoff_cap_ms: 30_000,
        }
    }
}

impl PollConfig {
    /// Задержка после `failures` ошибок подряд: 1000, 2000, 4000, ... до потолка
    pub fn backoff_delay_ms(&self, failures: u32) -> u32 {
        let exp = failures.saturating_sub(1);
        let delay = if exp >= 32 {
            u64::MAX
        } else {
            (self.backoff_base_ms as u64) << exp
        };
        delay.min(self.backoff_cap_ms as u64) as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Опрос остановлен (вкладка скрыта или компонент размонтирован)
    Idle,
    /// Запрос запланирован или выполняется
    Polling,
    /// Последний запрос завершился ошибкой, повтор отложен
    BackingOff { failures: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PollTicket(u64);

/// Отложенный запуск запроса. Отмена делается через билеты, поэтому
/// реализации достаточно просто разбудить опрос через `delay_ms`.
pub trait Scheduler {
    fn schedule(&mut self, ticket: PollTicket, delay_ms: u32);
}

/// Результат принятого ответа
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Committed {
    /// Сервер перезапускался с прошлого успешного ответа
    pub session_changed: bool,
}

#[derive(Debug, Clone)]
pub struct LogPoller {
    config: PollConfig,
    state: PollState,
    failures: u32,
    generation: u64,
    latest: Option<LogsResponse>,
    last_session: Option<String>,
    session_changed: bool,
}

impl LogPoller {
    pub fn new(config: PollConfig) -> Self {
        Self {
            config,
            state: PollState::Idle,
            failures: 0,
            generation: 0,
            latest: None,
            last_session: None,
            session_changed: false,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Последние показанные логи
    pub fn latest(&self) -> Option<&LogsResponse> {
        self.latest.as_ref()
    }

    /// Был ли замечен перезапуск сервера за время жизни опроса
    pub fn session_changed(&self) -> bool {
        self.session_changed
    }

    fn next_ticket(&mut self) -> PollTicket {
        self.generation += 1;
        PollTicket(self.generation)
    }

    /// Билет ещё действует: опрос активен и новее билета ничего не выдано
    pub fn is_current(&self, ticket: PollTicket) -> bool {
        self.state != PollState::Idle && ticket.0 == self.generation
    }

    /// Idle -> Polling: счётчик ошибок сбрасывается, запрос сразу.
    /// Возвращает false, если опрос уже идёт.
    pub fn activate<S: Scheduler>(&mut self, scheduler: &mut S) -> bool {
        if self.state != PollState::Idle {
            return false;
        }
        self.state = PollState::Polling;
        self.failures = 0;
        let ticket = self.next_ticket();
        scheduler.schedule(ticket, 0);
        true
    }

    /// Любое состояние -> Idle. Все выданные билеты отменяются.
    pub fn deactivate(&mut self) {
        self.state = PollState::Idle;
        self.generation += 1;
    }

    /// Ручное обновление: отложенный запрос отменяется, новый сразу.
    pub fn refresh<S: Scheduler>(&mut self, scheduler: &mut S) -> bool {
        if self.state == PollState::Idle {
            return false;
        }
        let ticket = self.next_ticket();
        scheduler.schedule(ticket, 0);
        true
    }

    /// Успешный ответ. `None`, если билет устарел; тогда ответ отброшен.
    pub fn on_success<S: Scheduler>(
        &mut self,
        ticket: PollTicket,
        response: LogsResponse,
        scheduler: &mut S,
    ) -> Option<Committed> {
        if !self.is_current(ticket) {
            return None;
        }

        let session = response.session.as_ref().map(|s| s.timestamp.clone());
        let changed = match (&self.last_session, &session) {
            (Some(prev), Some(now)) => prev != now,
            _ => false,
        };
        if session.is_some() {
            self.last_session = session;
        }
        self.session_changed |= changed;

        self.latest = Some(response);
        self.failures = 0;
        self.state = PollState::Polling;

        let next = self.next_ticket();
        scheduler.schedule(next, self.config.interval_ms);
        Some(Committed {
            session_changed: changed,
        })
    }

    /// Ошибка запроса. Возвращает задержку до повтора или `None` для
    /// устаревшего билета. Число повторов не ограничено.
    pub fn on_failure<S: Scheduler>(&mut self, ticket: PollTicket, scheduler: &mut S) -> Option<u32> {
        if !self.is_current(ticket) {
            return None;
        }

        self.failures = self.failures.saturating_add(1);
        self.state = PollState::BackingOff {
            failures: self.failures,
        };

        let delay = self.config.backoff_delay_ms(self.failures);
        let next = self.next_ticket();
        scheduler.schedule(next, delay);
        Some(delay)
    }
}

impl Default for LogPoller {
    fn default() -> Self {
        Self::new(PollConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::shared::logger::{AggregatedLogs, Session};

    /// Виртуальное время: пробуждения срабатывают только при `advance`
    #[derive(Default)]
    struct VirtualClock {
        now: u64,
        pending: Vec<(u64, PollTicket)>,
        delays: Vec<u32>,
    }

    impl Scheduler for VirtualClock {
        fn schedule(&mut self, ticket: PollTicket, delay_ms: u32) {
            self.pending.push((self.now + delay_ms as u64, ticket));
            self.delays.push(delay_ms);
        }
    }

    impl VirtualClock {
        /// Сдвигает время и возвращает билеты, срок которых наступил
        fn advance(&mut self, ms: u64) -> Vec<PollTicket> {
            self.now += ms;
            let now = self.now;
            let (due, rest): (Vec<_>, Vec<_>) = self.pending.drain(..).partition(|(at, _)| *at <= now);
            self.pending = rest;
            let mut due = due;
            due.sort();
            due.into_iter().map(|(_, t)| t).collect()
        }

        fn next_due(&mut self) -> PollTicket {
            let (at, _) = *self.pending.iter().min().expect("nothing scheduled");
            let wait = at - self.now;
            let mut fired = self.advance(wait);
            assert_eq!(fired.len(), 1);
            fired.remove(0)
        }
    }

    fn response(build: &str, session_ts: Option<&str>) -> LogsResponse {
        LogsResponse {
            logs: AggregatedLogs {
                build: build.to_string(),
                ..Default::default()
            },
            session: session_ts.map(|ts| Session {
                timestamp: ts.to_string(),
                session_id: "abcd1234".to_string(),
                started_at: 0,
            }),
        }
    }

    #[test]
    fn test_backoff_sequence_is_capped() {
        let config = PollConfig::default();
        let delays: Vec<u32> = (1..=6).map(|n| config.backoff_delay_ms(n)).collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000, 30000]);
        for n in [7, 10, 33, 64, u32::MAX] {
            assert_eq!(config.backoff_delay_ms(n), 30000);
        }
    }

    #[test]
    fn test_activate_fetches_immediately_once() {
        let mut clock = VirtualClock::default();
        let mut poller = LogPoller::default();
        assert_eq!(poller.state(), PollState::Idle);

        assert!(poller.activate(&mut clock));
        assert!(!poller.activate(&mut clock));
        assert_eq!(poller.state(), PollState::Polling);
        assert_eq!(clock.delays, vec![0]);
    }

    #[test]
    fn test_success_schedules_fixed_interval() {
        let mut clock = VirtualClock::default();
        let mut poller = LogPoller::default();
        poller.activate(&mut clock);

        let ticket = clock.next_due();
        assert!(poller.on_success(ticket, response("a", None), &mut clock).is_some());
        assert_eq!(poller.latest().unwrap().logs.build, "a");
        assert_eq!(clock.delays.last(), Some(&5000));

        assert!(clock.advance(4999).is_empty());
        assert_eq!(clock.advance(1).len(), 1);
    }

    #[test]
    fn test_consecutive_failures_back_off() {
        let mut clock = VirtualClock::default();
        let mut poller = LogPoller::default();
        poller.activate(&mut clock);

        let mut observed = Vec::new();
        for _ in 0..6 {
            let ticket = clock.next_due();
            observed.push(poller.on_failure(ticket, &mut clock).unwrap());
        }
        assert_eq!(observed, vec![1000, 2000, 4000, 8000, 16000, 30000]);
        assert_eq!(poller.state(), PollState::BackingOff { failures: 6 });

        // Потолок держится, повторы не прекращаются
        let ticket = clock.next_due();
        assert_eq!(poller.on_failure(ticket, &mut clock), Some(30000));
    }

    #[test]
    fn test_success_after_failures_resets_counter() {
        let mut clock = VirtualClock::default();
        let mut poller = LogPoller::default();
        poller.activate(&mut clock);

        for _ in 0..3 {
            let ticket = clock.next_due();
            poller.on_failure(ticket, &mut clock);
        }
        let ticket = clock.next_due();
        poller.on_success(ticket, response("ok", None), &mut clock);

        assert_eq!(poller.state(), PollState::Polling);
        assert_eq!(poller.failures(), 0);
        assert_eq!(clock.delays.last(), Some(&5000));

        let ticket = clock.next_due();
        assert_eq!(poller.on_failure(ticket, &mut clock), Some(1000));
    }

    #[test]
    fn test_deactivate_cancels_pending_wakeup() {
        let mut clock = VirtualClock::default();
        let mut poller = LogPoller::default();
        poller.activate(&mut clock);
        let ticket = clock.next_due();
        poller.on_success(ticket, response("a", None), &mut clock);

        poller.deactivate();
        assert_eq!(poller.state(), PollState::Idle);

        let fired = clock.advance(60_000);
        assert_eq!(fired.len(), 1);
        assert!(!poller.is_current(fired[0]));
    }

    #[test]
    fn test_response_after_unmount_is_discarded() {
        let mut clock = VirtualClock::default();
        let mut poller = LogPoller::default();
        poller.activate(&mut clock);
        let first = clock.next_due();
        poller.on_success(first, response("shown", None), &mut clock);

        // Запрос ушёл, компонент размонтирован до ответа
        let in_flight = clock.next_due();
        poller.deactivate();
        let scheduled_before = clock.delays.len();

        assert_eq!(poller.on_success(in_flight, response("late", None), &mut clock), None);
        assert_eq!(poller.on_failure(in_flight, &mut clock), None);
        assert_eq!(poller.latest().unwrap().logs.build, "shown");
        assert_eq!(clock.delays.len(), scheduled_before);
        assert_eq!(poller.state(), PollState::Idle);
    }

    #[test]
    fn test_remount_starts_without_backoff() {
        let mut clock = VirtualClock::default();
        let mut poller = LogPoller::default();
        poller.activate(&mut clock);
        for _ in 0..4 {
            let ticket = clock.next_due();
            poller.on_failure(ticket, &mut clock);
        }

        poller.deactivate();
        clock.advance(60_000);
        assert!(poller.activate(&mut clock));
        assert_eq!(poller.failures(), 0);
        assert_eq!(clock.delays.last(), Some(&0));

        let ticket = clock.next_due();
        assert_eq!(poller.on_failure(ticket, &mut clock), Some(1000));
    }

    #[test]
    fn test_refresh_supersedes_pending_timer() {
        let mut clock = VirtualClock::default();
        let mut poller = LogPoller::default();
        assert!(!poller.refresh(&mut clock));

        poller.activate(&mut clock);
        let ticket = clock.next_due();
        poller.on_success(ticket, response("a", None), &mut clock);

        assert!(poller.refresh(&mut clock));
        let now = clock.advance(0);
        assert_eq!(now.len(), 1);
        assert!(poller.is_current(now[0]));

        let old_timer = clock.advance(5000);
        assert_eq!(old_timer.len(), 1);
        assert!(!poller.is_current(old_timer[0]));
    }

    #[test]
    fn test_session_change_detection() {
        let mut clock = VirtualClock::default();
        let mut poller = LogPoller::default();
        poller.activate(&mut clock);

        let t = clock.next_due();
        let c = poller.on_success(t, response("", Some("2024-01-01T00:00:00.000Z")), &mut clock);
        assert_eq!(c, Some(Committed { session_changed: false }));

        let t = clock.next_due();
        let c = poller.on_success(t, response("", Some("2024-01-01T00:00:00.000Z")), &mut clock);
        assert_eq!(c, Some(Committed { session_changed: false }));
        assert!(!poller.session_changed());

        let t = clock.next_due();
        let c = poller.on_success(t, response("", Some("2024-01-01T00:05:00.000Z")), &mut clock);
        assert_eq!(c, Some(Committed { session_changed: true }));
        assert!(poller.session_changed());
    }
}
