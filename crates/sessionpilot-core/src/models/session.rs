//! Session record model: the persisted cookie set for one (platform, account).

use crate::error::{AutomationError, AutomationResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Persisted cookie set and user agent for one (platform, account) pair.
///
/// Cookies are kept exactly as exported by the browser extension; they are
/// translated only when replayed into a browser.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub platform: String,
    pub account: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub cookies: Vec<Value>,
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Timestamp of the last write (milliseconds since epoch)
    #[serde(default)]
    pub updated_at: i64,
}

// Remote rows may carry an explicit `null` cookie column.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl SessionRecord {
    /// Build a record from untyped request input.
    ///
    /// `cookies` must be a JSON array; its entries are not inspected here.
    pub fn new(
        platform: &str,
        account: &str,
        cookies: Value,
        user_agent: Option<String>,
    ) -> AutomationResult<Self> {
        let platform = normalize_platform(platform)?;
        let account = normalize_account(account)?;
        let Value::Array(cookies) = cookies else {
            return Err(AutomationError::validation("cookies must be an array"));
        };
        let user_agent = user_agent
            .map(|ua| ua.trim().to_string())
            .filter(|ua| !ua.is_empty());

        Ok(Self {
            platform,
            account,
            cookies,
            user_agent,
            updated_at: sessionpilot_storage::time_utils::now_ms(),
        })
    }

    pub fn key(&self) -> String {
        session_key(&self.platform, &self.account)
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary::from(self)
    }
}

/// Read-only view of a record that never exposes cookie values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub platform: String,
    pub account: String,
    pub cookie_count: usize,
    pub cookie_names: Vec<String>,
    pub user_agent: Option<String>,
    pub updated_at: i64,
}

impl From<&SessionRecord> for SessionSummary {
    fn from(record: &SessionRecord) -> Self {
        let cookie_names = record
            .cookies
            .iter()
            .filter_map(|entry| entry.get("name").and_then(Value::as_str))
            .map(str::to_string)
            .collect();

        Self {
            platform: record.platform.clone(),
            account: record.account.clone(),
            cookie_count: record.cookies.len(),
            cookie_names,
            user_agent: record.user_agent.clone(),
            updated_at: record.updated_at,
        }
    }
}

/// Lowercase and trim a platform identifier.
pub fn normalize_platform(platform: &str) -> AutomationResult<String> {
    let platform = platform.trim().to_lowercase();
    if platform.is_empty() {
        return Err(AutomationError::validation("platform is required"));
    }
    if platform.contains(':') {
        return Err(AutomationError::validation(format!(
            "platform must not contain ':' (got '{}')",
            platform
        )));
    }
    Ok(platform)
}

pub fn normalize_account(account: &str) -> AutomationResult<String> {
    let account = account.trim();
    if account.is_empty() {
        return Err(AutomationError::validation("account is required"));
    }
    Ok(account.to_string())
}

/// Storage key for a (platform, account) pair. The platform never contains
/// `:`, so the first separator splits the key unambiguously.
pub fn session_key(platform: &str, account: &str) -> String {
    format!("{}:{}", platform, account)
}
