use sessionpilot_browser::{BrowserLauncher, LaunchOptions};
use sessionpilot_core::{AppConfig, SessionStore};
use std::sync::Arc;

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: SessionStore,
    pub launcher: Arc<dyn BrowserLauncher>,
}

impl AppState {
    pub fn new(config: AppConfig, store: SessionStore, launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            launcher,
        }
    }

    pub fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            headless: self.config.browser.headless,
        }
    }
}
