use contracts::shared::logger::{LogCategory, LogsResponse};
use leptos::ev;
use leptos::prelude::*;
use leptos::task::spawn_local;
use std::sync::{Arc, Mutex};
use thaw::*;

use super::api;
use super::poller::{LogPoller, PollConfig, PollState, PollTicket, Scheduler};

/// Планировщик на таймерах браузера. По пробуждению проверяет билет,
/// запрашивает логи и передаёт результат в `LogPoller`.
#[derive(Clone)]
struct BrowserScheduler {
    poller: Arc<Mutex<LogPoller>>,
    logs: RwSignal<LogsResponse>,
    restarted: RwSignal<bool>,
    poll_state: RwSignal<PollState>,
}

impl Scheduler for BrowserScheduler {
    fn schedule(&mut self, ticket: PollTicket, delay_ms: u32) {
        let this = self.clone();
        spawn_local(async move {
            if delay_ms > 0 {
                gloo_timers::future::TimeoutFuture::new(delay_ms).await;
            }
            this.fire(ticket).await;
        });
    }
}

impl BrowserScheduler {
    fn is_current(&self, ticket: PollTicket) -> bool {
        self.poller
            .lock()
            .map(|p| p.is_current(ticket))
            .unwrap_or(false)
    }

    async fn fire(self, ticket: PollTicket) {
        if !self.is_current(ticket) {
            return;
        }

        let result = api::fetch_logs().await;

        let mut scheduler = self.clone();
        let Ok(mut poller) = self.poller.lock() else {
            return;
        };
        match result {
            Ok(response) => {
                let snapshot = response.clone();
                if let Some(committed) = poller.on_success(ticket, response, &mut scheduler) {
                    self.logs.set(snapshot);
                    if committed.session_changed {
                        log::info!("[TerminalLogs] server session changed");
                        self.restarted.set(true);
                    }
                }
            }
            Err(e) => {
                if let Some(delay) = poller.on_failure(ticket, &mut scheduler) {
                    log::warn!("[TerminalLogs] failed to fetch logs: {} (retry in {} ms)", e, delay);
                }
            }
        }
        self.poll_state.set(poller.state());
    }

    fn with_poller(&self, f: impl FnOnce(&mut LogPoller, &mut BrowserScheduler)) {
        let mut scheduler = self.clone();
        if let Ok(mut poller) = self.poller.lock() {
            f(&mut poller, &mut scheduler);
            self.poll_state.set(poller.state());
        }
    }

    fn activate(&self) {
        self.with_poller(|p, s| {
            p.activate(s);
        });
    }

    fn deactivate(&self) {
        if let Ok(mut poller) = self.poller.lock() {
            poller.deactivate();
        }
    }

    fn refresh(&self) {
        self.with_poller(|p, s| {
            p.refresh(s);
        });
    }
}

fn page_hidden() -> bool {
    document().hidden()
}

fn state_label(state: PollState) -> String {
    match state {
        PollState::Idle => "Paused".to_string(),
        PollState::Polling => "Live".to_string(),
        PollState::BackingOff { failures } => format!("Retrying ({} failed)", failures),
    }
}

fn section_title(category: LogCategory) -> &'static str {
    match category {
        LogCategory::Error => "Errors",
        LogCategory::Build => "Build Output",
        LogCategory::Runtime => "Runtime Output",
    }
}

/// Содержимое одной категории; пустые категории не показываются
#[component]
fn LogSection(category: LogCategory, logs: RwSignal<LogsResponse>) -> impl IntoView {
    view! {
        <Show when=move || logs.with(|l| !l.logs.get(category).is_empty())>
            <div class=format!("terminal-logs__section terminal-logs__section--{}", category)>
                <h3 class="terminal-logs__section-title">{section_title(category)}</h3>
                <pre class="terminal-logs__content">
                    {move || logs.with(|l| l.logs.get(category).to_string())}
                </pre>
            </div>
        </Show>
    }
}

/// Панель терминальных логов dev-сервера.
///
/// Опрашивает /api/logs каждые 5 секунд, после ошибок с нарастающей
/// задержкой (до 30 секунд). Пока вкладка скрыта, опрос стоит.
#[component]
pub fn TerminalLogsPanel() -> impl IntoView {
    let logs = RwSignal::new(LogsResponse::default());
    let restarted = RwSignal::new(false);
    let poll_state = RwSignal::new(PollState::Idle);

    let scheduler = BrowserScheduler {
        poller: Arc::new(Mutex::new(LogPoller::new(PollConfig::default()))),
        logs,
        restarted,
        poll_state,
    };

    if !page_hidden() {
        scheduler.activate();
    }

    let on_visibility = scheduler.clone();
    let visibility_handle = window_event_listener(ev::visibilitychange, move |_| {
        if page_hidden() {
            on_visibility.deactivate();
        } else {
            on_visibility.activate();
        }
    });

    let on_unmount = scheduler.clone();
    on_cleanup(move || {
        visibility_handle.remove();
        on_unmount.deactivate();
    });

    let on_refresh = scheduler.clone();
    let handle_refresh = move |_| on_refresh.refresh();

    let on_clear = scheduler.clone();
    let handle_clear = move |_| {
        let scheduler = on_clear.clone();
        spawn_local(async move {
            match api::clear_logs().await {
                Ok(()) => scheduler.refresh(),
                Err(e) => log::warn!("[TerminalLogs] failed to clear logs: {}", e),
            }
        });
    };

    view! {
        <div class="card terminal-logs">
            <div class="card__header terminal-logs__header">
                <h2 class="terminal-logs__title">"Terminal Logs"</h2>
                <span class="terminal-logs__state">{move || state_label(poll_state.get())}</span>
                {move || {
                    logs.with(|l| l.session.clone())
                        .map(|s| {
                            view! {
                                <span class="terminal-logs__session" title=s.timestamp.clone()>
                                    {format!("session {}", s.session_id)}
                                </span>
                            }
                        })
                }}
                <Show when=move || restarted.get()>
                    <span class="warning-box warning-box--info terminal-logs__restarted">
                        "Server restarted"
                    </span>
                </Show>
            </div>

            {LogCategory::ALL
                .into_iter()
                .map(|category| view! { <LogSection category=category logs=logs /> })
                .collect_view()}

            <Show when=move || logs.with(|l| l.logs.is_empty())>
                <div class="terminal-logs__empty">"No terminal output yet"</div>
            </Show>

            <Space>
                <Button appearance=ButtonAppearance::Secondary on_click=handle_refresh>
                    "Refresh Terminal Logs"
                </Button>
                <Button appearance=ButtonAppearance::Transparent on_click=handle_clear>
                    "Clear"
                </Button>
            </Space>
        </div>
    }
}
