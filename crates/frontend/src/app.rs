use crate::shared::debug_log::{self, system, LogArg, TerminalLogsPanel};
use leptos::prelude::*;
use thaw::*;

const PAGE_COMPONENT: &str = "DebugLogsPage";

/// Локальный лог страницы: запись, экспорт и очистка с архивом
#[component]
fn ComponentLogCard() -> impl IntoView {
    let logger = debug_log::for_component(PAGE_COMPONENT);

    let buffer = RwSignal::new(logger.get_logs());
    let archived = RwSignal::new(logger.get_archived().len());
    let (error, set_error) = signal::<Option<String>>(None);

    let refresh_view = move || {
        let logger = debug_log::for_component(PAGE_COMPONENT);
        buffer.set(logger.get_logs());
        archived.set(logger.get_archived().len());
    };

    let handle_log = move |_| {
        let logger = debug_log::for_component(PAGE_COMPONENT);
        logger.log(&[
            LogArg::from("Manual entry:"),
            LogArg::json(&serde_json::json!({
                "entries": buffer.with(|b| b.lines().count()),
                "archives": archived.get(),
            })),
        ]);
        refresh_view();
    };

    let handle_export = move |_| {
        let logger = debug_log::for_component(PAGE_COMPONENT);
        let export_log = debug_log::for_feature("export");
        export_log.log_value(
            "Exporting",
            &serde_json::json!({ "file": logger.export_file_name(), "entries": buffer.with(|b| b.lines().count()) }),
        );
        if let Err(e) = logger.export() {
            export_log.log_message("Export failed");
            system::error(
                "Failed to export component log",
                Some(serde_json::json!({ "component": PAGE_COMPONENT, "reason": e.clone() })),
            );
            set_error.set(Some(e));
        }
    };

    let handle_clear = move |_| {
        debug_log::for_component(PAGE_COMPONENT).clear();
        refresh_view();
    };

    view! {
        <div class="card component-log">
            <div class="card__header">
                <h2>"Component Log"</h2>
                <span class="component-log__archives">
                    {move || format!("{} archived", archived.get())}
                </span>
            </div>
            {move || error.get().map(|err| view! {
                <div class="warning-box warning-box--error">
                    <span class="warning-box__text">{err}</span>
                </div>
            })}
            <pre class="component-log__content">{move || buffer.get()}</pre>
            <Space>
                <Button appearance=ButtonAppearance::Primary on_click=handle_log>
                    "Log entry"
                </Button>
                <Button appearance=ButtonAppearance::Secondary on_click=handle_export>
                    "Export"
                </Button>
                <Button appearance=ButtonAppearance::Transparent on_click=handle_clear>
                    "Clear"
                </Button>
            </Space>
        </div>
    }
}

#[component]
pub fn App() -> impl IntoView {
    system::log("Debug logs page mounted");

    view! {
        <div class="page page--wide debug-logs">
            <h1 class="debug-logs__title">"Debug Logs"</h1>
            <ComponentLogCard />
            <TerminalLogsPanel />
        </div>
    }
}
