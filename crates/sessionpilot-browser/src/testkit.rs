//! Scripted browser doubles for tests.
//!
//! [`ScriptedPage`] answers locator probes and text reads from tables keyed by
//! the `Display` form of locators and targets, and records every interaction.
//! [`ScriptedLauncher`] hands out sessions sharing one scripted page.

use crate::driver::{BrowserLauncher, BrowserSession, Key, LaunchOptions, PageDriver};
use crate::locator::{Locator, Target};
use anyhow::{Result, bail};
use async_trait::async_trait;
use sessionpilot_core::BrowserCookie;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    Navigate(String),
    Click(String),
    Fill(String, String),
    Type(String, String),
    Key(Key),
    Scroll(Option<String>, i64),
}

#[derive(Default)]
pub struct ScriptedPage {
    title: String,
    url: Mutex<String>,
    matches: HashMap<String, usize>,
    failing_probes: HashSet<String>,
    texts: HashMap<String, String>,
    failing_clicks: HashSet<String>,
    fill_fails: bool,
    cookie_names: Vec<String>,
    probes: Mutex<Vec<String>>,
    events: Mutex<Vec<PageEvent>>,
}

fn scoped_key(locator: &Locator, within: Option<&Target>) -> String {
    match within {
        Some(parent) => format!("{} >> {}", parent, locator),
        None => locator.to_string(),
    }
}

impl ScriptedPage {
    pub fn new() -> Self {
        Self {
            url: Mutex::new("about:blank".to_string()),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn with_matches(mut self, locator: &Locator, count: usize) -> Self {
        self.matches.insert(scoped_key(locator, None), count);
        self
    }

    pub fn with_scoped_matches(mut self, parent: &Target, locator: &Locator, count: usize) -> Self {
        self.matches
            .insert(scoped_key(locator, Some(parent)), count);
        self
    }

    pub fn with_failing_probe(mut self, locator: &Locator) -> Self {
        self.failing_probes.insert(scoped_key(locator, None));
        self
    }

    pub fn with_text(mut self, target: &Target, text: &str) -> Self {
        self.texts.insert(target.to_string(), text.to_string());
        self
    }

    pub fn with_failing_click(mut self, target: &Target) -> Self {
        self.failing_clicks.insert(target.to_string());
        self
    }

    /// Make every `fill` fail so callers fall back to typing.
    pub fn with_failing_fill(mut self) -> Self {
        self.fill_fails = true;
        self
    }

    pub fn with_cookie_names(mut self, names: &[&str]) -> Self {
        self.cookie_names = names.iter().map(|name| name.to_string()).collect();
        self
    }

    pub fn probes(&self) -> Vec<String> {
        self.probes.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<PageEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                PageEvent::Click(target) => Some(target),
                _ => None,
            })
            .collect()
    }

    pub fn keys(&self) -> Vec<Key> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                PageEvent::Key(key) => Some(key),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: PageEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn exists(&self, target: &Target) -> bool {
        let key = scoped_key(&target.locator, target.within.as_deref());
        self.matches.get(&key).copied().unwrap_or(0) > target.index
    }
}

#[async_trait]
impl PageDriver for ScriptedPage {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<()> {
        *self.url.lock().unwrap() = url.to_string();
        self.record(PageEvent::Navigate(url.to_string()));
        Ok(())
    }

    async fn title(&self) -> Result<String> {
        Ok(self.title.clone())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.url.lock().unwrap().clone())
    }

    async fn count(&self, locator: &Locator, within: Option<&Target>) -> Result<usize> {
        let key = scoped_key(locator, within);
        self.probes.lock().unwrap().push(key.clone());
        if self.failing_probes.contains(&key) {
            bail!("probe failed for {}", key);
        }
        Ok(self.matches.get(&key).copied().unwrap_or(0))
    }

    async fn text(&self, target: &Target) -> Result<Option<String>> {
        Ok(self.texts.get(&target.to_string()).cloned())
    }

    async fn click(&self, target: &Target, _timeout: Duration) -> Result<()> {
        let key = target.to_string();
        if self.failing_clicks.contains(&key) || !self.exists(target) {
            bail!("element not clickable: {}", key);
        }
        self.record(PageEvent::Click(key));
        Ok(())
    }

    async fn fill(&self, target: &Target, text: &str, _timeout: Duration) -> Result<()> {
        if self.fill_fails {
            bail!("element is not fillable: {}", target);
        }
        self.record(PageEvent::Fill(target.to_string(), text.to_string()));
        Ok(())
    }

    async fn type_text(&self, target: &Target, text: &str, _delay: Duration) -> Result<()> {
        self.record(PageEvent::Type(target.to_string(), text.to_string()));
        Ok(())
    }

    async fn press_key(&self, key: Key) -> Result<()> {
        self.record(PageEvent::Key(key));
        Ok(())
    }

    async fn scroll(&self, container: Option<&Target>, delta_y: i64) -> Result<()> {
        self.record(PageEvent::Scroll(
            container.map(|target| target.to_string()),
            delta_y,
        ));
        Ok(())
    }

    async fn cookie_names(&self) -> Result<Vec<String>> {
        Ok(self.cookie_names.clone())
    }

    async fn pause(&self, _duration: Duration) {}
}

struct ScriptedSession {
    page: Arc<ScriptedPage>,
    launcher: Arc<LauncherLog>,
}

#[derive(Default)]
struct LauncherLog {
    launches: AtomicUsize,
    closes: AtomicUsize,
    cookies: Mutex<Vec<BrowserCookie>>,
    user_agent: Mutex<Option<String>>,
    rejected_cookie: Option<String>,
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    fn page(&self) -> &dyn PageDriver {
        self.page.as_ref()
    }

    async fn set_user_agent(&self, user_agent: &str) -> Result<()> {
        *self.launcher.user_agent.lock().unwrap() = Some(user_agent.to_string());
        Ok(())
    }

    async fn add_cookie(&self, cookie: &BrowserCookie) -> Result<()> {
        if self.launcher.rejected_cookie.as_deref() == Some(cookie.name.as_str()) {
            bail!("Invalid cookie fields");
        }
        self.launcher.cookies.lock().unwrap().push(cookie.clone());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.launcher.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Launcher whose sessions all drive the same [`ScriptedPage`].
#[derive(Clone)]
pub struct ScriptedLauncher {
    page: Arc<ScriptedPage>,
    log: Arc<LauncherLog>,
}

impl ScriptedLauncher {
    pub fn new(page: ScriptedPage) -> Self {
        Self {
            page: Arc::new(page),
            log: Arc::new(LauncherLog::default()),
        }
    }

    /// Reject the cookie called `name` when it is injected.
    pub fn rejecting_cookie(page: ScriptedPage, name: &str) -> Self {
        Self {
            page: Arc::new(page),
            log: Arc::new(LauncherLog {
                rejected_cookie: Some(name.to_string()),
                ..LauncherLog::default()
            }),
        }
    }

    pub fn page(&self) -> &ScriptedPage {
        &self.page
    }

    pub fn launches(&self) -> usize {
        self.log.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.log.closes.load(Ordering::SeqCst)
    }

    pub fn injected_cookies(&self) -> Vec<BrowserCookie> {
        self.log.cookies.lock().unwrap().clone()
    }

    pub fn user_agent(&self) -> Option<String> {
        self.log.user_agent.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrowserLauncher for ScriptedLauncher {
    async fn launch(&self, _options: &LaunchOptions) -> Result<Box<dyn BrowserSession>> {
        self.log.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            page: self.page.clone(),
            launcher: self.log.clone(),
        }))
    }
}
