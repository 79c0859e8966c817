//! Process configuration.
//!
//! Built once at startup and shared read-only. Sources, lowest priority first:
//! built-in defaults, a TOML file (`SESSIONPILOT_CONFIG` or
//! `./sessionpilot.toml`), then `SESSIONPILOT_*` environment variables.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_PATH_ENV: &str = "SESSIONPILOT_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "sessionpilot.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub browser: BrowserSection,
    pub store: StoreSection,
    pub defaults: DefaultsSection,
    pub automation: AutomationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    /// Emit JSON log lines instead of human-readable ones.
    pub log_json: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSection {
    pub headless: bool,
    /// Explicit Chromium binary; discovered automatically when unset.
    pub chrome_path: Option<PathBuf>,
    /// Target of the `smoke` mode when the request has no URL.
    pub smoke_url: String,
    pub window_width: u32,
    pub window_height: u32,
    pub launch_timeout_ms: u64,
    pub command_timeout_ms: u64,
    pub extra_args: Vec<String>,
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            smoke_url: "https://www.tiktok.com/".to_string(),
            window_width: 1280,
            window_height: 900,
            launch_timeout_ms: 20_000,
            command_timeout_ms: 30_000,
            extra_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackendKind {
    #[default]
    Local,
    Remote,
    Disabled,
}

impl StoreBackendKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "local" => Some(Self::Local),
            "remote" => Some(Self::Remote),
            "disabled" | "none" => Some(Self::Disabled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub backend: StoreBackendKind,
    /// Local database file; defaults to `~/.sessionpilot/sessions.redb`.
    pub db_path: Option<PathBuf>,
    /// Base URL of the remote store.
    pub url: Option<String>,
    /// Service key of the remote store.
    pub key: Option<String>,
    pub table: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: StoreBackendKind::Local,
            db_path: None,
            url: None,
            key: None,
            table: "sessions".to_string(),
        }
    }
}

/// Identifiers used when a request omits platform or account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsSection {
    pub platform: String,
    pub account: Option<String>,
}

impl Default for DefaultsSection {
    fn default() -> Self {
        Self {
            platform: "tiktok".to_string(),
            account: None,
        }
    }
}

/// Tunables for the heuristic page interaction layer. None of these are
/// contracts; they trade speed for robustness against a slow page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    pub navigation_timeout_ms: u64,
    pub element_timeout_ms: u64,
    pub action_timeout_ms: u64,
    /// Pause after navigation and after opening the comments panel.
    pub settle_delay_ms: u64,
    pub scroll_rounds: u32,
    pub scroll_delay_ms: u64,
    pub scroll_step_px: i64,
    pub default_comment_limit: usize,
    pub max_comment_limit: usize,
    /// Key pressed when no comments panel trigger matches.
    pub panel_shortcut_key: String,
    pub type_delay_ms: u64,
    pub submit_settle_ms: u64,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: 45_000,
            element_timeout_ms: 8_000,
            action_timeout_ms: 5_000,
            settle_delay_ms: 1_500,
            scroll_rounds: 6,
            scroll_delay_ms: 800,
            scroll_step_px: 1_200,
            default_comment_limit: 20,
            max_comment_limit: 100,
            panel_shortcut_key: "c".to_string(),
            type_delay_ms: 40,
            submit_settle_ms: 2_500,
        }
    }
}

impl AppConfig {
    /// Load defaults, the optional config file and environment overrides.
    ///
    /// Overrides that could not be parsed are returned so they can be
    /// reported once logging is up.
    pub fn load() -> Result<(Self, Vec<RejectedOverride>)> {
        let mut config = match config_file_path() {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        let rejected = config.apply_overrides(|key| env::var(key).ok());
        config.validate()?;
        Ok((config, rejected))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply `SESSIONPILOT_*` overrides read through `lookup`.
    ///
    /// Unparseable values leave the current setting in place and are returned.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Vec<RejectedOverride> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut rejected = Vec::new();

        if let Some(host) = get("SESSIONPILOT_HOST") {
            self.server.host = host;
        }
        let port = get("SESSIONPILOT_PORT")
            .map(|raw| ("SESSIONPILOT_PORT", raw))
            .or_else(|| get("PORT").map(|raw| ("PORT", raw)));
        if let Some((key, raw)) = port {
            match raw.trim().parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => rejected.push(RejectedOverride::new(key, raw)),
            }
        }
        if let Some(raw) = get("SESSIONPILOT_LOG_FORMAT") {
            self.server.log_json = raw.trim().eq_ignore_ascii_case("json");
        }
        if let Some(raw) = get("SESSIONPILOT_HEADLESS") {
            match parse_bool(&raw) {
                Some(headless) => self.browser.headless = headless,
                None => rejected.push(RejectedOverride::new("SESSIONPILOT_HEADLESS", raw)),
            }
        }
        if let Some(path) = get("SESSIONPILOT_CHROME_PATH") {
            self.browser.chrome_path = Some(PathBuf::from(path));
        }
        if let Some(url) = get("SESSIONPILOT_SMOKE_URL") {
            self.browser.smoke_url = url;
        }
        if let Some(raw) = get("SESSIONPILOT_STORE_BACKEND") {
            match StoreBackendKind::parse(&raw) {
                Some(kind) => self.store.backend = kind,
                None => rejected.push(RejectedOverride::new("SESSIONPILOT_STORE_BACKEND", raw)),
            }
        }
        if let Some(path) = get("SESSIONPILOT_DB_PATH") {
            self.store.db_path = Some(PathBuf::from(path));
        }
        if let Some(url) = get("SESSIONPILOT_STORE_URL") {
            self.store.url = Some(url);
        }
        if let Some(key) = get("SESSIONPILOT_STORE_KEY") {
            self.store.key = Some(key);
        }
        if let Some(table) = get("SESSIONPILOT_STORE_TABLE") {
            self.store.table = table;
        }
        if let Some(platform) = get("SESSIONPILOT_DEFAULT_PLATFORM") {
            self.defaults.platform = platform;
        }
        if let Some(account) = get("SESSIONPILOT_DEFAULT_ACCOUNT") {
            self.defaults.account = Some(account);
        }
        rejected
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            bail!("Server port must be non-zero");
        }
        if self.store.table.trim().is_empty() {
            bail!("Store table name must not be empty");
        }
        if self.defaults.platform.trim().is_empty() {
            bail!("Default platform must not be empty");
        }

        let automation = &self.automation;
        for (name, value) in [
            ("navigation_timeout_ms", automation.navigation_timeout_ms),
            ("element_timeout_ms", automation.element_timeout_ms),
            ("action_timeout_ms", automation.action_timeout_ms),
            ("launch_timeout_ms", self.browser.launch_timeout_ms),
            ("command_timeout_ms", self.browser.command_timeout_ms),
        ] {
            if value == 0 {
                bail!("{} must be greater than zero", name);
            }
        }
        if automation.default_comment_limit == 0
            || automation.default_comment_limit > automation.max_comment_limit
        {
            bail!(
                "default_comment_limit must be between 1 and max_comment_limit ({})",
                automation.max_comment_limit
            );
        }
        Ok(())
    }
}

fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = env::var(CONFIG_PATH_ENV)
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }
    let local = Path::new(DEFAULT_CONFIG_FILE);
    local.exists().then(|| local.to_path_buf())
}

/// An environment override whose value could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedOverride {
    pub key: &'static str,
    pub value: String,
}

impl RejectedOverride {
    fn new(key: &'static str, value: String) -> Self {
        Self { key, value }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
