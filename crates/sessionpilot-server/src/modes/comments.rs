use super::{RunRequest, optional_session, replay_session, required, target_account, target_profile};
use crate::api::state::AppState;
use serde::Serialize;
use sessionpilot_browser::{CommentRow, PageAutomation, ScopedSession};
use sessionpilot_core::config::AutomationConfig;
use sessionpilot_core::{AutomationError, AutomationResult};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentsOutput {
    pub video_url: String,
    pub comments: Vec<CommentRow>,
    pub item_selector: Option<String>,
    pub total: usize,
    pub session_found: bool,
}

/// Clamp the requested comment limit into `1..=max_comment_limit`.
pub(super) fn resolve_limit(
    requested: Option<i64>,
    config: &AutomationConfig,
) -> AutomationResult<usize> {
    match requested {
        None => Ok(config.default_comment_limit),
        Some(limit) if limit < 1 => Err(AutomationError::validation(format!(
            "limit must be a positive integer (got {})",
            limit
        ))),
        Some(limit) => Ok(usize::try_from(limit)
            .unwrap_or(usize::MAX)
            .min(config.max_comment_limit)),
    }
}

pub async fn run(state: &AppState, request: &RunRequest) -> AutomationResult<CommentsOutput> {
    let video_url = required(request.video_url.as_deref(), "videoUrl")?.to_string();
    let limit = resolve_limit(request.limit, &state.config.automation)?;
    let profile = target_profile(state, request)?;
    let account = target_account(state, request);
    let session = optional_session(state, &profile, account.as_deref()).await?;

    let scoped = ScopedSession::open(state.launcher.as_ref(), &state.launch_options()).await?;
    let outcome: AutomationResult<CommentsOutput> = async {
        replay_session(&scoped, &profile, session.as_ref()).await?;
        let automation = PageAutomation::new(scoped.page(), &profile, &state.config.automation);
        automation.open(&video_url).await?;
        automation.activate_comments_panel().await;
        automation.hydrate(limit).await;

        let extraction = automation.extract_comments(limit).await;
        Ok(CommentsOutput {
            video_url: video_url.clone(),
            comments: extraction.comments,
            item_selector: extraction.item_locator.map(|locator| locator.to_string()),
            total: extraction.total,
            session_found: session.is_some(),
        })
    }
    .await;
    scoped.finish(outcome).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_limit() {
        let config = AutomationConfig::default();
        assert_eq!(resolve_limit(None, &config).unwrap(), 20);
        assert_eq!(resolve_limit(Some(5), &config).unwrap(), 5);
        assert_eq!(resolve_limit(Some(10_000), &config).unwrap(), 100);
        assert!(resolve_limit(Some(0), &config).unwrap_err().is_client_error());
        assert!(resolve_limit(Some(-3), &config).is_err());
    }
}
