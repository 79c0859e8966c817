//! Heuristic page interaction: comments panel, lazy-load hydration,
//! extraction, reply submission and the logged-in signal.
//!
//! Nothing here is a contract with the target site. Missing elements become
//! `None`/`null` during extraction and interaction errors during replies.

use crate::cascade::Resolved;
use crate::driver::{Key, PageDriver};
use crate::locator::{Locator, Target};
use crate::profile::PlatformProfile;
use serde::Serialize;
use sessionpilot_core::config::AutomationConfig;
use sessionpilot_core::{AutomationError, AutomationResult};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentRow {
    pub index: usize,
    pub author: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub item_locator: Option<Locator>,
    /// Items visible on the page, including those past the limit.
    pub total: usize,
    pub comments: Vec<CommentRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelActivation {
    AlreadyOpen,
    Trigger(Locator),
    Shortcut(Key),
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMethod {
    Fill,
    Typed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyOutcome {
    pub submitted: bool,
    pub input_method: InputMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginSignal {
    pub logged_in: bool,
    pub avatar_visible: bool,
    pub session_cookie: bool,
    pub login_button_visible: bool,
}

pub struct PageAutomation<'a> {
    page: &'a dyn PageDriver,
    profile: &'a PlatformProfile,
    config: &'a AutomationConfig,
}

fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

impl<'a> PageAutomation<'a> {
    pub fn new(
        page: &'a dyn PageDriver,
        profile: &'a PlatformProfile,
        config: &'a AutomationConfig,
    ) -> Self {
        Self {
            page,
            profile,
            config,
        }
    }

    /// Navigate to `url` and give the page time to settle.
    pub async fn open(&self, url: &str) -> AutomationResult<()> {
        self.page
            .navigate(url, millis(self.config.navigation_timeout_ms))
            .await
            .map_err(|error| {
                AutomationError::interaction(format!("navigation to {} failed: {:#}", url, error))
            })?;
        self.page.pause(millis(self.config.settle_delay_ms)).await;
        Ok(())
    }

    /// Reveal the comments surface: trigger candidates in order, then the
    /// keyboard shortcut.
    pub async fn activate_comments_panel(&self) -> PanelActivation {
        if self.locate_items().await.is_some() {
            debug!("Comments already visible");
            return PanelActivation::AlreadyOpen;
        }

        let action_timeout = millis(self.config.action_timeout_ms);
        for locator in &self.profile.panel_triggers.candidates {
            let count = self.page.count(locator, None).await.unwrap_or(0);
            if count == 0 {
                continue;
            }
            let target = Target::first(locator.clone());
            match self.page.click(&target, action_timeout).await {
                Ok(()) => {
                    info!(trigger = %locator, "Comments panel opened");
                    self.page.pause(millis(self.config.settle_delay_ms)).await;
                    return PanelActivation::Trigger(locator.clone());
                }
                Err(error) => {
                    debug!(
                        trigger = %locator,
                        error = %format!("{:#}", error),
                        "Panel trigger click failed"
                    );
                }
            }
        }

        let Some(key) = Key::parse(&self.config.panel_shortcut_key) else {
            warn!(key = %self.config.panel_shortcut_key, "Unusable panel shortcut key");
            return PanelActivation::Unavailable;
        };
        match self.page.press_key(key).await {
            Ok(()) => {
                info!(?key, "Comments panel requested via shortcut");
                self.page.pause(millis(self.config.settle_delay_ms)).await;
                PanelActivation::Shortcut(key)
            }
            Err(error) => {
                warn!(error = %format!("{:#}", error), "Panel shortcut failed");
                PanelActivation::Unavailable
            }
        }
    }

    /// Scroll the comment list until `limit` items are visible or the
    /// configured rounds run out. Returns the last visible item count.
    pub async fn hydrate(&self, limit: usize) -> usize {
        let step = self.config.scroll_step_px;
        let container = self.profile.scroll_containers.first(self.page, None).await;
        let mut visible = 0;

        for round in 0..self.config.scroll_rounds {
            visible = self.visible_items().await;
            if visible >= limit {
                debug!(round, visible, limit, "Hydration reached limit");
                return visible;
            }
            if let Err(error) = self.page.scroll(container.as_ref(), step).await {
                debug!(round, error = %format!("{:#}", error), "Scroll failed");
            }
            self.page.pause(millis(self.config.scroll_delay_ms)).await;
        }

        visible = self.visible_items().await;
        debug!(visible, limit, rounds = self.config.scroll_rounds, "Hydration finished");
        visible
    }

    pub async fn locate_items(&self) -> Option<Resolved> {
        self.profile.comment_items.resolve(self.page, None).await
    }

    async fn visible_items(&self) -> usize {
        self.locate_items()
            .await
            .map(|resolved| resolved.count)
            .unwrap_or(0)
    }

    /// Author and text of the first `limit` items; unreadable fields are `None`.
    pub async fn extract_comments(&self, limit: usize) -> Extraction {
        let Some(items) = self.locate_items().await else {
            return Extraction {
                item_locator: None,
                total: 0,
                comments: Vec::new(),
            };
        };

        let mut comments = Vec::with_capacity(limit.min(items.count));
        for index in 0..items.count.min(limit) {
            let item = items.target(index, None);
            let author = self
                .profile
                .comment_author
                .read_text(self.page, Some(&item))
                .await;
            let text = self
                .profile
                .comment_text
                .read_text(self.page, Some(&item))
                .await;
            comments.push(CommentRow {
                index,
                author,
                text,
            });
        }

        Extraction {
            item_locator: Some(items.locator),
            total: items.count,
            comments,
        }
    }

    /// Open the reply box of `item`, enter `text` and, unless `dry_run`,
    /// submit it.
    pub async fn submit_reply(
        &self,
        item: &Target,
        text: &str,
        dry_run: bool,
    ) -> AutomationResult<ReplyOutcome> {
        let action_timeout = millis(self.config.action_timeout_ms);

        let control = self
            .profile
            .reply_control
            .first(self.page, Some(item))
            .await
            .ok_or_else(|| {
                AutomationError::interaction(format!("no reply control found in {}", item))
            })?;
        self.page
            .click(&control, action_timeout)
            .await
            .map_err(|error| {
                AutomationError::interaction(format!("reply control click failed: {:#}", error))
            })?;
        self.page.pause(millis(self.config.settle_delay_ms)).await;

        let input = match self.profile.reply_input.first(self.page, Some(item)).await {
            Some(input) => input,
            None => self
                .profile
                .reply_input
                .first(self.page, None)
                .await
                .ok_or_else(|| AutomationError::interaction("no reply input found"))?,
        };

        let input_method = match self
            .page
            .fill(&input, text, millis(self.config.element_timeout_ms))
            .await
        {
            Ok(()) => InputMethod::Fill,
            Err(error) => {
                debug!(
                    input = %input,
                    error = %format!("{:#}", error),
                    "Fill failed, typing instead"
                );
                self.page
                    .type_text(&input, text, millis(self.config.type_delay_ms))
                    .await
                    .map_err(|error| {
                        AutomationError::interaction(format!("typing reply failed: {:#}", error))
                    })?;
                InputMethod::Typed
            }
        };

        if dry_run {
            info!(input = %input, "Dry run: reply entered, not submitted");
            return Ok(ReplyOutcome {
                submitted: false,
                input_method,
            });
        }

        // Escape dismisses overlays that swallow Enter; refocus before submitting.
        if let Err(error) = self.page.press_key(Key::Escape).await {
            debug!(error = %format!("{:#}", error), "Escape failed");
        }
        if let Err(error) = self.page.click(&input, action_timeout).await {
            debug!(error = %format!("{:#}", error), "Refocusing reply input failed");
        }
        self.page
            .press_key(Key::Enter)
            .await
            .map_err(|error| {
                AutomationError::interaction(format!("submitting reply failed: {:#}", error))
            })?;
        self.page.pause(millis(self.config.submit_settle_ms)).await;

        info!(input = %input, ?input_method, "Reply submitted");
        Ok(ReplyOutcome {
            submitted: true,
            input_method,
        })
    }

    /// Best-effort authentication hint; not a guarantee either way.
    pub async fn detect_login(&self) -> LoginSignal {
        let avatar_visible = self.profile.avatar.resolve(self.page, None).await.is_some();
        let cookie_names = match self.page.cookie_names().await {
            Ok(names) => names,
            Err(error) => {
                debug!(error = %format!("{:#}", error), "Reading cookies failed");
                Vec::new()
            }
        };
        let session_cookie = cookie_names
            .iter()
            .any(|name| self.profile.session_cookies.contains(name));
        let login_button_visible = self
            .profile
            .login_button
            .resolve(self.page, None)
            .await
            .is_some();

        LoginSignal {
            logged_in: avatar_visible || (session_cookie && !login_button_visible),
            avatar_visible,
            session_cookie,
            login_button_visible,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{PageEvent, ScriptedPage};

    fn item_locator(profile: &PlatformProfile) -> Locator {
        profile.comment_items.candidates[0].clone()
    }

    fn page_with_comments(profile: &PlatformProfile, count: usize) -> ScriptedPage {
        let items = item_locator(profile);
        let mut page = ScriptedPage::new().with_matches(&items, count);
        for index in 0..count {
            let item = Target::nth(items.clone(), index);
            let author = profile.comment_author.candidates[0].clone();
            let text = profile.comment_text.candidates[0].clone();
            page = page
                .with_scoped_matches(&item, &author, 1)
                .with_scoped_matches(&item, &text, 1)
                .with_text(
                    &Target::first(author).within(&item),
                    &format!("user{}", index),
                );
            if index != 1 {
                page = page.with_text(
                    &Target::first(text).within(&item),
                    &format!("comment {}", index),
                );
            }
        }
        page
    }

    #[tokio::test]
    async fn test_extract_respects_limit_and_nulls_missing_fields() {
        let profile = PlatformProfile::tiktok();
        let config = AutomationConfig::default();
        let page = page_with_comments(&profile, 5);
        let automation = PageAutomation::new(&page, &profile, &config);

        let extraction = automation.extract_comments(3).await;

        assert_eq!(extraction.total, 5);
        assert_eq!(extraction.item_locator, Some(item_locator(&profile)));
        assert_eq!(extraction.comments.len(), 3);
        assert_eq!(extraction.comments[0].author.as_deref(), Some("user0"));
        assert_eq!(extraction.comments[0].text.as_deref(), Some("comment 0"));
        assert_eq!(extraction.comments[1].text, None);
        assert_eq!(extraction.comments[2].index, 2);
    }

    #[tokio::test]
    async fn test_extract_without_items_is_empty() {
        let profile = PlatformProfile::tiktok();
        let config = AutomationConfig::default();
        let page = ScriptedPage::new();
        let automation = PageAutomation::new(&page, &profile, &config);

        let extraction = automation.extract_comments(10).await;
        assert_eq!(extraction.total, 0);
        assert!(extraction.item_locator.is_none());
        assert!(extraction.comments.is_empty());
    }

    #[tokio::test]
    async fn test_panel_falls_back_to_shortcut() {
        let profile = PlatformProfile::tiktok();
        let config = AutomationConfig::default();
        let page = ScriptedPage::new();
        let automation = PageAutomation::new(&page, &profile, &config);

        let activation = automation.activate_comments_panel().await;

        assert_eq!(activation, PanelActivation::Shortcut(Key::Char('c')));
        assert_eq!(page.keys(), vec![Key::Char('c')]);
    }

    #[tokio::test]
    async fn test_panel_clicks_first_matching_trigger() {
        let profile = PlatformProfile::tiktok();
        let config = AutomationConfig::default();
        let trigger = profile.panel_triggers.candidates[1].clone();
        let page = ScriptedPage::new().with_matches(&trigger, 1);
        let automation = PageAutomation::new(&page, &profile, &config);

        let activation = automation.activate_comments_panel().await;

        assert_eq!(activation, PanelActivation::Trigger(trigger.clone()));
        assert_eq!(page.clicks(), vec![Target::first(trigger).to_string()]);
        assert!(page.keys().is_empty());
    }

    #[tokio::test]
    async fn test_hydrate_scrolls_configured_rounds() {
        let profile = PlatformProfile::tiktok();
        let config = AutomationConfig {
            scroll_rounds: 3,
            ..AutomationConfig::default()
        };
        let page = page_with_comments(&profile, 2);
        let automation = PageAutomation::new(&page, &profile, &config);

        let visible = automation.hydrate(10).await;

        assert_eq!(visible, 2);
        let scrolls = page
            .events()
            .into_iter()
            .filter(|event| matches!(event, PageEvent::Scroll(None, _)))
            .count();
        assert_eq!(scrolls, 3);
    }

    #[tokio::test]
    async fn test_hydrate_stops_once_limit_visible() {
        let profile = PlatformProfile::tiktok();
        let config = AutomationConfig::default();
        let page = page_with_comments(&profile, 4);
        let automation = PageAutomation::new(&page, &profile, &config);

        assert_eq!(automation.hydrate(3).await, 4);
        assert!(page.events().is_empty());
    }

    fn reply_page(profile: &PlatformProfile, item: &Target) -> ScriptedPage {
        let control = profile.reply_control.candidates[0].clone();
        let input = profile.reply_input.candidates[2].clone();
        ScriptedPage::new()
            .with_matches(&item.locator, 3)
            .with_scoped_matches(item, &control, 1)
            .with_matches(&input, 1)
    }

    #[tokio::test]
    async fn test_submit_reply_sequence() {
        let profile = PlatformProfile::tiktok();
        let config = AutomationConfig::default();
        let item = Target::nth(item_locator(&profile), 1);
        let page = reply_page(&profile, &item);
        let automation = PageAutomation::new(&page, &profile, &config);

        let outcome = automation.submit_reply(&item, "thanks!", false).await.unwrap();

        assert!(outcome.submitted);
        assert_eq!(outcome.input_method, InputMethod::Fill);
        let input = Target::first(profile.reply_input.candidates[2].clone()).to_string();
        let control = Target::first(profile.reply_control.candidates[0].clone())
            .within(&item)
            .to_string();
        assert_eq!(
            page.events(),
            vec![
                PageEvent::Click(control),
                PageEvent::Fill(input.clone(), "thanks!".to_string()),
                PageEvent::Key(Key::Escape),
                PageEvent::Click(input),
                PageEvent::Key(Key::Enter),
            ]
        );
    }

    #[tokio::test]
    async fn test_submit_reply_types_when_fill_fails() {
        let profile = PlatformProfile::tiktok();
        let config = AutomationConfig::default();
        let item = Target::nth(item_locator(&profile), 0);
        let page = reply_page(&profile, &item).with_failing_fill();
        let automation = PageAutomation::new(&page, &profile, &config);

        let outcome = automation.submit_reply(&item, "hey", true).await.unwrap();

        assert!(!outcome.submitted);
        assert_eq!(outcome.input_method, InputMethod::Typed);
        assert!(page.keys().is_empty());
    }

    #[tokio::test]
    async fn test_submit_reply_without_control_fails() {
        let profile = PlatformProfile::tiktok();
        let config = AutomationConfig::default();
        let item = Target::nth(item_locator(&profile), 0);
        let page = ScriptedPage::new().with_matches(&item.locator, 1);
        let automation = PageAutomation::new(&page, &profile, &config);

        let err = automation.submit_reply(&item, "hey", false).await.unwrap_err();
        assert!(matches!(err, AutomationError::Interaction(_)));
        assert!(page.clicks().is_empty());
    }

    #[tokio::test]
    async fn test_login_signal() {
        let profile = PlatformProfile::tiktok();
        let config = AutomationConfig::default();
        let login_button = profile.login_button.candidates[0].clone();

        let cookie_only = ScriptedPage::new().with_cookie_names(&["sessionid"]);
        let signal = PageAutomation::new(&cookie_only, &profile, &config)
            .detect_login()
            .await;
        assert!(signal.logged_in);

        let cookie_and_button = ScriptedPage::new()
            .with_cookie_names(&["sessionid"])
            .with_matches(&login_button, 1);
        let signal = PageAutomation::new(&cookie_and_button, &profile, &config)
            .detect_login()
            .await;
        assert!(!signal.logged_in);
        assert!(signal.login_button_visible);

        let avatar = ScriptedPage::new()
            .with_matches(&profile.avatar.candidates[0], 1)
            .with_matches(&login_button, 1);
        let signal = PageAutomation::new(&avatar, &profile, &config)
            .detect_login()
            .await;
        assert!(signal.logged_in);
    }
}
