//! Browser modes selected by `POST /api/run`.
//!
//! Every mode validates its request before touching the store or launching a
//! browser, and closes the browser it launched whatever the outcome.

mod check;
mod comments;
mod reply;
mod smoke;

pub use check::CheckOutput;
pub use comments::CommentsOutput;
pub use reply::ReplyOutput;
pub use smoke::SmokeOutput;

use crate::api::state::AppState;
use serde::{Deserialize, Serialize};
use sessionpilot_browser::{PlatformProfile, ScopedSession, seed_session};
use sessionpilot_core::cookies::translate_with_report;
use sessionpilot_core::models::normalize_platform;
use sessionpilot_core::{AutomationError, AutomationResult, SessionRecord};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Smoke,
    Check,
    Comments,
    Reply,
}

impl Mode {
    pub fn parse(raw: &str) -> AutomationResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "smoke" => Ok(Self::Smoke),
            "check" => Ok(Self::Check),
            "comments" => Ok(Self::Comments),
            "reply" => Ok(Self::Reply),
            "" => Err(AutomationError::validation("mode is required")),
            other => Err(AutomationError::validation(format!(
                "unknown mode '{}' (expected smoke, check, comments or reply)",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Smoke => "smoke",
            Self::Check => "check",
            Self::Comments => "comments",
            Self::Reply => "reply",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    #[serde(default)]
    pub mode: String,
    pub platform: Option<String>,
    pub account: Option<String>,
    pub url: Option<String>,
    pub video_url: Option<String>,
    pub limit: Option<i64>,
    pub comment_index: Option<i64>,
    pub reply_text: Option<String>,
    pub dry_run: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ModeOutput {
    Smoke(SmokeOutput),
    Check(CheckOutput),
    Comments(CommentsOutput),
    Reply(ReplyOutput),
}

pub async fn dispatch(
    state: &AppState,
    mode: Mode,
    request: &RunRequest,
) -> AutomationResult<ModeOutput> {
    info!(mode = mode.as_str(), "Running mode");
    match mode {
        Mode::Smoke => smoke::run(state, request).await.map(ModeOutput::Smoke),
        Mode::Check => check::run(state, request).await.map(ModeOutput::Check),
        Mode::Comments => comments::run(state, request).await.map(ModeOutput::Comments),
        Mode::Reply => reply::run(state, request).await.map(ModeOutput::Reply),
    }
}

/// Trimmed, non-empty value of an optional request field.
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn required<'a>(value: Option<&'a str>, field: &str) -> AutomationResult<&'a str> {
    non_empty(value).ok_or_else(|| AutomationError::validation(format!("{} is required", field)))
}

fn target_profile(state: &AppState, request: &RunRequest) -> AutomationResult<PlatformProfile> {
    let platform = non_empty(request.platform.as_deref())
        .unwrap_or(state.config.defaults.platform.as_str());
    PlatformProfile::for_platform(&normalize_platform(platform)?)
}

fn target_account(state: &AppState, request: &RunRequest) -> Option<String> {
    non_empty(request.account.as_deref())
        .or_else(|| non_empty(state.config.defaults.account.as_deref()))
        .map(str::to_string)
}

/// Stored session for modes that work with or without one.
async fn optional_session(
    state: &AppState,
    profile: &PlatformProfile,
    account: Option<&str>,
) -> AutomationResult<Option<SessionRecord>> {
    let Some(account) = account else {
        return Ok(None);
    };
    if !state.store.is_configured() {
        warn!(account, "Session store not configured; continuing without cookies");
        return Ok(None);
    }
    state.store.load(&profile.platform, account).await
}

/// Replay a stored session into the freshly launched browser. Returns the
/// number of cookies injected.
async fn replay_session(
    scoped: &ScopedSession,
    profile: &PlatformProfile,
    session: Option<&SessionRecord>,
) -> AutomationResult<usize> {
    let Some(session) = session else {
        return Ok(0);
    };

    let (cookies, report) = translate_with_report(&session.cookies, &profile.base_url);
    info!(
        platform = %session.platform,
        account = %session.account,
        kept = report.kept,
        dropped = report.dropped,
        "Replaying stored session"
    );
    seed_session(scoped.session(), &cookies, session.user_agent.as_deref()).await?;
    Ok(cookies.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse() {
        assert_eq!(Mode::parse(" Comments ").unwrap(), Mode::Comments);
        assert!(Mode::parse("").unwrap_err().is_client_error());
        let err = Mode::parse("scrape").unwrap_err();
        assert!(err.to_string().contains("scrape"));
    }
}
