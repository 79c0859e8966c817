use super::{
    RunRequest, non_empty, optional_session, replay_session, target_account, target_profile,
};
use crate::api::state::AppState;
use serde::Serialize;
use sessionpilot_browser::{PageAutomation, ScopedSession};
use sessionpilot_core::{AutomationError, AutomationResult};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutput {
    pub title: String,
    pub url: String,
    pub logged_in: bool,
    pub cookie_count: usize,
    pub session_found: bool,
}

/// Replay the stored session (if any) and report whether the page looks
/// authenticated.
pub async fn run(state: &AppState, request: &RunRequest) -> AutomationResult<CheckOutput> {
    let profile = target_profile(state, request)?;
    let account = target_account(state, request);
    let session = optional_session(state, &profile, account.as_deref()).await?;
    let target = non_empty(request.url.as_deref())
        .unwrap_or(profile.base_url.as_str())
        .to_string();

    let scoped = ScopedSession::open(state.launcher.as_ref(), &state.launch_options()).await?;
    let outcome: AutomationResult<CheckOutput> = async {
        let cookie_count = replay_session(&scoped, &profile, session.as_ref()).await?;
        let automation = PageAutomation::new(scoped.page(), &profile, &state.config.automation);
        automation.open(&target).await?;

        let page = scoped.page();
        let title = page.title().await.map_err(AutomationError::browser)?;
        let url = page.current_url().await.map_err(AutomationError::browser)?;
        let signal = automation.detect_login().await;
        tracing::debug!(?signal, "Login signal");

        Ok(CheckOutput {
            title,
            url,
            logged_in: signal.logged_in,
            cookie_count,
            session_found: session.is_some(),
        })
    }
    .await;
    scoped.finish(outcome).await
}
