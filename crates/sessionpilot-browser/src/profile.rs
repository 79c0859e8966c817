//! Per-platform anchor URL, session cookie names and selector cascades.

use crate::cascade::SelectorCascade;
use crate::locator::Locator;
use serde::Serialize;
use sessionpilot_core::{AutomationError, AutomationResult};

const REPLY_LABELS: &[&str] = &[
    "reply",
    "responder",
    "répondre",
    "antworten",
    "rispondi",
    "balas",
    "trả lời",
    "ответить",
    "回复",
    "返信",
    "답글",
];

const COMMENTS_LABELS: &[&str] = &[
    "comments",
    "comentarios",
    "comentários",
    "commentaires",
    "kommentare",
    "commenti",
    "komentar",
    "bình luận",
    "комментарии",
    "评论",
    "コメント",
    "댓글",
];

const LOGIN_LABELS: &[&str] = &[
    "log in",
    "iniciar sesión",
    "entrar",
    "connexion",
    "anmelden",
    "accedi",
    "masuk",
];

#[derive(Debug, Clone, Serialize)]
pub struct PlatformProfile {
    pub platform: String,
    /// Origin cookies are anchored to and `check` navigates to by default.
    pub base_url: String,
    /// Cookies whose presence suggests an authenticated session.
    pub session_cookies: Vec<String>,
    pub comment_items: SelectorCascade,
    pub comment_author: SelectorCascade,
    pub comment_text: SelectorCascade,
    pub reply_control: SelectorCascade,
    pub reply_input: SelectorCascade,
    pub panel_triggers: SelectorCascade,
    pub scroll_containers: SelectorCascade,
    pub avatar: SelectorCascade,
    pub login_button: SelectorCascade,
}

impl PlatformProfile {
    /// Built-in profile for `platform` (already normalized).
    pub fn for_platform(platform: &str) -> AutomationResult<Self> {
        match platform {
            "tiktok" => Ok(Self::tiktok()),
            other => Err(AutomationError::validation(format!(
                "platform '{}' has no browser profile",
                other
            ))),
        }
    }

    pub fn tiktok() -> Self {
        Self {
            platform: "tiktok".to_string(),
            base_url: "https://www.tiktok.com".to_string(),
            session_cookies: vec![
                "sessionid".to_string(),
                "sessionid_ss".to_string(),
                "sid_tt".to_string(),
            ],
            comment_items: SelectorCascade::new(
                "comment_items",
                vec![
                    Locator::css(r#"div[class*="DivCommentItemContainer"]"#),
                    Locator::css(r#"div[class*="DivCommentObjectWrapper"]"#),
                    Locator::css(r#"[data-e2e="comment-item"]"#),
                    Locator::css(r#"div[class*="CommentItemWrapper"]"#),
                ],
            ),
            comment_author: SelectorCascade::new(
                "comment_author",
                vec![
                    Locator::css(r#"[data-e2e="comment-username-1"]"#),
                    Locator::css(r#"span[data-e2e="comment-username"]"#),
                    Locator::css(r#"a[href^="/@"] span"#),
                    Locator::css(r#"a[href^="/@"]"#),
                ],
            ),
            comment_text: SelectorCascade::new(
                "comment_text",
                vec![
                    Locator::css(r#"[data-e2e="comment-level-1"]"#),
                    Locator::css(r#"p[class*="PCommentText"]"#),
                    Locator::css(r#"span[class*="SpanText"]"#),
                ],
            ),
            reply_control: SelectorCascade::new(
                "reply_control",
                vec![
                    Locator::css(r#"[data-e2e="comment-reply-1"]"#),
                    Locator::css(r#"span[class*="SpanReplyButton"]"#),
                    Locator::text(r#"span, button, div[role="button"]"#, REPLY_LABELS),
                ],
            ),
            reply_input: SelectorCascade::new(
                "reply_input",
                vec![
                    Locator::css(r#"div[data-e2e="comment-input"] div[contenteditable="true"]"#),
                    Locator::css(r#"div.public-DraftEditor-content[contenteditable="true"]"#),
                    Locator::css(r#"div[contenteditable="true"]"#),
                    Locator::css("textarea"),
                ],
            ),
            panel_triggers: SelectorCascade::new(
                "panel_triggers",
                vec![
                    Locator::css(r#"[data-e2e="comment-icon"]"#),
                    Locator::css(r#"button[aria-label*="comment" i]"#),
                    Locator::text(r#"button, div[role="tab"], span"#, COMMENTS_LABELS),
                ],
            ),
            scroll_containers: SelectorCascade::new(
                "scroll_containers",
                vec![
                    Locator::css(r#"div[class*="DivCommentListContainer"]"#),
                    Locator::css(r#"div[class*="DivCommentContainer"]"#),
                    Locator::css(r#"[data-e2e="comment-list"]"#),
                ],
            ),
            avatar: SelectorCascade::new(
                "avatar",
                vec![
                    Locator::css(r#"[data-e2e="profile-icon"]"#),
                    Locator::css(r#"[data-e2e="nav-profile"]"#),
                ],
            ),
            login_button: SelectorCascade::new(
                "login_button",
                vec![
                    Locator::css(r#"[data-e2e="top-login-button"]"#),
                    Locator::css("button#header-login-button"),
                    Locator::text("button", LOGIN_LABELS),
                ],
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_platform_is_validation_error() {
        let err = PlatformProfile::for_platform("myspace").unwrap_err();
        assert!(err.is_client_error());
        assert!(err.to_string().contains("myspace"));
    }

    #[test]
    fn test_tiktok_profile_cascades_are_populated() {
        let profile = PlatformProfile::for_platform("tiktok").unwrap();
        assert_eq!(profile.base_url, "https://www.tiktok.com");
        for cascade in [
            &profile.comment_items,
            &profile.comment_author,
            &profile.comment_text,
            &profile.reply_control,
            &profile.reply_input,
            &profile.panel_triggers,
            &profile.scroll_containers,
            &profile.avatar,
            &profile.login_button,
        ] {
            assert!(!cascade.candidates.is_empty(), "{} is empty", cascade.name);
        }
    }

    #[test]
    fn test_reply_control_falls_back_to_multilingual_labels() {
        let profile = PlatformProfile::tiktok();
        let last = profile.reply_control.candidates.last().unwrap();
        match last {
            Locator::Text { labels, .. } => {
                assert!(labels.contains(&"responder".to_string()));
                assert!(labels.contains(&"回复".to_string()));
            }
            other => panic!("expected text locator, got {other}"),
        }
    }
}
