//! Browser-side cookie model.

use serde::{Deserialize, Serialize};

/// Normalized same-site attribute accepted by the browser.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

impl SameSite {
    /// Parse an extension export value (`lax`, `strict`, `no_restriction`,
    /// `none`), case-insensitive. Unknown values yield `None` so that the
    /// attribute is left out instead of guessed.
    pub fn from_export(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "lax" => Some(Self::Lax),
            "strict" => Some(Self::Strict),
            "no_restriction" | "none" => Some(Self::None),
            _ => None,
        }
    }
}

/// A cookie ready to be injected into a remote-controlled browser.
///
/// Serializes to the parameter object of CDP `Network.setCookie`. Cookies are
/// anchored to a URL rather than an explicit domain and path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BrowserCookie {
    pub name: String,
    pub value: String,
    pub url: String,
    pub http_only: bool,
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<SameSite>,
    /// Expiry in whole seconds since the epoch; absent for session cookies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<i64>,
}
