//! Browser capability seams.
//!
//! The heuristic layer only talks to these traits. `cdp::ChromeLauncher` is
//! the production implementation; tests drive the same code with scripted
//! fakes.

use crate::locator::{Locator, Target};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sessionpilot_core::{AutomationError, AutomationResult, BrowserCookie};
use std::time::Duration;
use tracing::{debug, warn};

/// Keys the heuristic layer knows how to press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Enter,
    Escape,
    Char(char),
}

impl Key {
    /// Parse a configured key name (`Enter`, `Escape`/`Esc` or one character).
    pub fn parse(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "enter" | "return" => Some(Self::Enter),
            "escape" | "esc" => Some(Self::Escape),
            _ => {
                let mut chars = trimmed.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Self::Char(c)),
                    _ => None,
                }
            }
        }
    }
}

/// A single page inside a live browser session.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate and wait for the document to load.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    async fn title(&self) -> Result<String>;

    async fn current_url(&self) -> Result<String>;

    /// Number of elements matching `locator`, searched inside `within` when set.
    async fn count(&self, locator: &Locator, within: Option<&Target>) -> Result<usize>;

    /// Trimmed visible text of the element, `None` when it is missing or empty.
    async fn text(&self, target: &Target) -> Result<Option<String>>;

    /// Wait up to `timeout` for the element, then click it.
    async fn click(&self, target: &Target, timeout: Duration) -> Result<()>;

    /// Wait up to `timeout` for the element, then replace its content with `text`.
    async fn fill(&self, target: &Target, text: &str, timeout: Duration) -> Result<()>;

    /// Focus the element and send `text` as individual key presses.
    async fn type_text(&self, target: &Target, text: &str, delay: Duration) -> Result<()>;

    async fn press_key(&self, key: Key) -> Result<()>;

    /// Scroll `container` (or the page) vertically by `delta_y` pixels.
    async fn scroll(&self, container: Option<&Target>, delta_y: i64) -> Result<()>;

    /// Names of the cookies visible to the current page.
    async fn cookie_names(&self) -> Result<Vec<String>>;

    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A launched, isolated browser with one page.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    fn page(&self) -> &dyn PageDriver;

    async fn set_user_agent(&self, user_agent: &str) -> Result<()>;

    async fn add_cookie(&self, cookie: &BrowserCookie) -> Result<()>;

    /// Shut the browser down. Calling it more than once is harmless.
    async fn close(&self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchOptions {
    pub headless: bool,
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserSession>>;
}

/// Inject a session's user agent and cookies into a fresh browser.
///
/// Stops at the first rejected cookie and names it in the error.
pub async fn seed_session(
    session: &dyn BrowserSession,
    cookies: &[BrowserCookie],
    user_agent: Option<&str>,
) -> AutomationResult<()> {
    if let Some(user_agent) = user_agent {
        session
            .set_user_agent(user_agent)
            .await
            .map_err(AutomationError::browser)?;
    }

    for cookie in cookies {
        session
            .add_cookie(cookie)
            .await
            .map_err(|error| AutomationError::CookieInjection {
                name: cookie.name.clone(),
                message: format!("{:#}", error),
            })?;
    }

    debug!(cookies = cookies.len(), "Browser session seeded");
    Ok(())
}

/// A browser session that is closed when the request is done with it.
///
/// Call [`ScopedSession::finish`] with the request outcome on every path;
/// dropping an unfinished session logs a warning and leaves the process to
/// the session's own drop handler.
pub struct ScopedSession {
    session: Box<dyn BrowserSession>,
    finished: bool,
}

impl ScopedSession {
    pub async fn open(
        launcher: &dyn BrowserLauncher,
        options: &LaunchOptions,
    ) -> AutomationResult<Self> {
        let session = launcher
            .launch(options)
            .await
            .map_err(AutomationError::browser)?;
        Ok(Self {
            session,
            finished: false,
        })
    }

    pub fn session(&self) -> &dyn BrowserSession {
        self.session.as_ref()
    }

    pub fn page(&self) -> &dyn PageDriver {
        self.session.page()
    }

    /// Close the browser and hand back `outcome` untouched.
    pub async fn finish<T>(mut self, outcome: AutomationResult<T>) -> AutomationResult<T> {
        if let Err(error) = self.session.close().await {
            warn!(error = %format!("{:#}", error), "Failed to close browser session");
        }
        self.finished = true;
        outcome
    }
}

impl Drop for ScopedSession {
    fn drop(&mut self) {
        if !self.finished {
            warn!("Browser session dropped without finish; relying on process cleanup");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct NullPage;

    #[async_trait]
    impl PageDriver for NullPage {
        async fn navigate(&self, _url: &str, _timeout: Duration) -> Result<()> {
            Ok(())
        }
        async fn title(&self) -> Result<String> {
            Ok(String::new())
        }
        async fn current_url(&self) -> Result<String> {
            Ok("about:blank".to_string())
        }
        async fn count(&self, _locator: &Locator, _within: Option<&Target>) -> Result<usize> {
            Ok(0)
        }
        async fn text(&self, _target: &Target) -> Result<Option<String>> {
            Ok(None)
        }
        async fn click(&self, _target: &Target, _timeout: Duration) -> Result<()> {
            Ok(())
        }
        async fn fill(&self, _target: &Target, _text: &str, _timeout: Duration) -> Result<()> {
            Ok(())
        }
        async fn type_text(&self, _target: &Target, _text: &str, _delay: Duration) -> Result<()> {
            Ok(())
        }
        async fn press_key(&self, _key: Key) -> Result<()> {
            Ok(())
        }
        async fn scroll(&self, _container: Option<&Target>, _delta_y: i64) -> Result<()> {
            Ok(())
        }
        async fn cookie_names(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    struct RecordingSession {
        page: NullPage,
        rejected: Option<&'static str>,
        accepted: Mutex<Vec<String>>,
        user_agent: Mutex<Option<String>>,
        closes: Arc<AtomicUsize>,
    }

    impl RecordingSession {
        fn new(rejected: Option<&'static str>, closes: Arc<AtomicUsize>) -> Self {
            Self {
                page: NullPage,
                rejected,
                accepted: Mutex::new(Vec::new()),
                user_agent: Mutex::new(None),
                closes,
            }
        }
    }

    #[async_trait]
    impl BrowserSession for RecordingSession {
        fn page(&self) -> &dyn PageDriver {
            &self.page
        }

        async fn set_user_agent(&self, user_agent: &str) -> Result<()> {
            *self.user_agent.lock().unwrap() = Some(user_agent.to_string());
            Ok(())
        }

        async fn add_cookie(&self, cookie: &BrowserCookie) -> Result<()> {
            if Some(cookie.name.as_str()) == self.rejected {
                anyhow::bail!("Invalid cookie fields");
            }
            self.accepted.lock().unwrap().push(cookie.name.clone());
            Ok(())
        }

        async fn close(&self) -> Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct RecordingLauncher {
        closes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl BrowserLauncher for RecordingLauncher {
        async fn launch(&self, _options: &LaunchOptions) -> Result<Box<dyn BrowserSession>> {
            Ok(Box::new(RecordingSession::new(None, self.closes.clone())))
        }
    }

    fn cookie(name: &str) -> BrowserCookie {
        BrowserCookie {
            name: name.to_string(),
            value: "v".to_string(),
            url: "https://www.tiktok.com".to_string(),
            http_only: false,
            secure: false,
            same_site: None,
            expires: None,
        }
    }

    #[test]
    fn test_key_parse() {
        assert_eq!(Key::parse("Enter"), Some(Key::Enter));
        assert_eq!(Key::parse("esc"), Some(Key::Escape));
        assert_eq!(Key::parse("c"), Some(Key::Char('c')));
        assert_eq!(Key::parse("ctrl+c"), None);
        assert_eq!(Key::parse(""), None);
    }

    #[tokio::test]
    async fn test_seed_session_applies_user_agent_and_cookies() {
        let session = RecordingSession::new(None, Arc::new(AtomicUsize::new(0)));

        seed_session(&session, &[cookie("a"), cookie("b")], Some("UA/1"))
            .await
            .unwrap();

        assert_eq!(*session.accepted.lock().unwrap(), vec!["a", "b"]);
        assert_eq!(session.user_agent.lock().unwrap().as_deref(), Some("UA/1"));
    }

    #[tokio::test]
    async fn test_seed_session_names_rejected_cookie_and_stops() {
        let session = RecordingSession::new(Some("bad"), Arc::new(AtomicUsize::new(0)));

        let err = seed_session(&session, &[cookie("ok"), cookie("bad"), cookie("late")], None)
            .await
            .unwrap_err();

        match err {
            AutomationError::CookieInjection { name, .. } => assert_eq!(name, "bad"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(*session.accepted.lock().unwrap(), vec!["ok"]);
    }

    #[tokio::test]
    async fn test_scoped_session_closes_on_error_outcome() {
        let closes = Arc::new(AtomicUsize::new(0));
        let launcher = RecordingLauncher {
            closes: closes.clone(),
        };

        let scoped = ScopedSession::open(&launcher, &LaunchOptions { headless: true })
            .await
            .unwrap();
        let outcome: AutomationResult<()> = Err(AutomationError::interaction("boom"));
        let result = scoped.finish(outcome).await;

        assert!(result.is_err());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}
