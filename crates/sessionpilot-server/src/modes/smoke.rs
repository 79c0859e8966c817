use super::{RunRequest, non_empty};
use crate::api::state::AppState;
use serde::Serialize;
use sessionpilot_browser::{PageDriver, ScopedSession};
use sessionpilot_core::{AutomationError, AutomationResult};
use std::time::Duration;

#[derive(Debug, Serialize)]
pub struct SmokeOutput {
    pub title: String,
    pub url: String,
}

/// Reachability check without any stored session.
pub async fn run(state: &AppState, request: &RunRequest) -> AutomationResult<SmokeOutput> {
    let target = non_empty(request.url.as_deref())
        .unwrap_or(state.config.browser.smoke_url.as_str())
        .to_string();
    let timeout = Duration::from_millis(state.config.automation.navigation_timeout_ms);

    let scoped = ScopedSession::open(state.launcher.as_ref(), &state.launch_options()).await?;
    let outcome = visit(scoped.page(), &target, timeout).await;
    scoped.finish(outcome).await
}

async fn visit(
    page: &dyn PageDriver,
    target: &str,
    timeout: Duration,
) -> AutomationResult<SmokeOutput> {
    page.navigate(target, timeout).await.map_err(|error| {
        AutomationError::interaction(format!("navigation to {} failed: {:#}", target, error))
    })?;
    Ok(SmokeOutput {
        title: page.title().await.map_err(AutomationError::browser)?,
        url: page.current_url().await.map_err(AutomationError::browser)?,
    })
}
