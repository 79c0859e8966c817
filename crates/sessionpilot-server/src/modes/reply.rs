use super::{RunRequest, replay_session, required, target_account, target_profile};
use crate::api::state::AppState;
use serde::Serialize;
use sessionpilot_browser::{InputMethod, PageAutomation, ScopedSession};
use sessionpilot_core::models::session_key;
use sessionpilot_core::{AutomationError, AutomationResult};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyOutput {
    pub video_url: String,
    pub comment_index: usize,
    pub reply_text: String,
    pub submitted: bool,
    pub dry_run: bool,
    pub input_method: InputMethod,
}

/// Post `replyText` under the `commentIndex`-th visible comment.
pub async fn run(state: &AppState, request: &RunRequest) -> AutomationResult<ReplyOutput> {
    let video_url = required(request.video_url.as_deref(), "videoUrl")?.to_string();
    let index = match request.comment_index {
        None => return Err(AutomationError::validation("commentIndex is required")),
        Some(index) => usize::try_from(index).map_err(|_| {
            AutomationError::validation(format!(
                "commentIndex must be zero or greater (got {})",
                index
            ))
        })?,
    };
    let reply_text = required(request.reply_text.as_deref(), "replyText")?.to_string();
    let dry_run = request.dry_run.unwrap_or(false);
    let profile = target_profile(state, request)?;
    let account = target_account(state, request)
        .ok_or_else(|| AutomationError::validation("account is required"))?;

    let session = state
        .store
        .load(&profile.platform, &account)
        .await?
        .ok_or_else(|| {
            AutomationError::Configuration(format!(
                "no stored session for {}",
                session_key(&profile.platform, &account)
            ))
        })?;

    let scoped = ScopedSession::open(state.launcher.as_ref(), &state.launch_options()).await?;
    let outcome: AutomationResult<ReplyOutput> = async {
        replay_session(&scoped, &profile, Some(&session)).await?;
        let automation = PageAutomation::new(scoped.page(), &profile, &state.config.automation);
        automation.open(&video_url).await?;
        automation.activate_comments_panel().await;
        automation.hydrate(index + 1).await;

        let items = automation.locate_items().await;
        let count = items.as_ref().map_or(0, |items| items.count);
        let Some(items) = items.filter(|items| index < items.count) else {
            return Err(AutomationError::interaction(format!(
                "commentIndex {} is out of range: {} comments found",
                index, count
            )));
        };

        let outcome = automation
            .submit_reply(&items.target(index, None), &reply_text, dry_run)
            .await?;
        Ok(ReplyOutput {
            video_url: video_url.clone(),
            comment_index: index,
            reply_text: reply_text.clone(),
            submitted: outcome.submitted,
            dry_run,
            input_method: outcome.input_method,
        })
    }
    .await;
    scoped.finish(outcome).await
}
