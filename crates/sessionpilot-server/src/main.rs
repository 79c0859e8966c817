#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod api;
mod modes;

use anyhow::Context;
use api::state::AppState;
use sessionpilot_browser::ChromeLauncher;
use sessionpilot_core::{AppConfig, SessionStore};
use std::sync::Arc;

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,sessionpilot_server=debug".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (config, rejected) = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(config.server.log_json);
    for entry in &rejected {
        tracing::warn!(
            key = entry.key,
            value = %entry.value,
            "Ignoring invalid environment override"
        );
    }

    tracing::info!(
        headless = config.browser.headless,
        default_platform = %config.defaults.platform,
        "Starting SessionPilot server"
    );

    let store =
        SessionStore::from_config(&config.store).context("Failed to open session store")?;
    if !store.is_configured() {
        tracing::warn!(
            "Session store is not configured; session endpoints will report soft failures"
        );
    }
    let launcher = Arc::new(ChromeLauncher::from_config(&config.browser));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, store, launcher);
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("SessionPilot running on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server terminated unexpectedly")?;
    Ok(())
}
