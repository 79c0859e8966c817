//! Error taxonomy shared by the store, the browser layer and the HTTP surface.

use thiserror::Error;

pub type AutomationResult<T> = std::result::Result<T, AutomationError>;

#[derive(Debug, Error)]
pub enum AutomationError {
    /// A required collaborator (usually the session store) is not configured.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The request is missing a field or carries an invalid one.
    #[error("validation error: {0}")]
    Validation(String),

    /// The backing store failed to read or write.
    #[error("store error: {0}")]
    Store(String),

    /// The browser rejected a stored cookie.
    #[error("cookie '{name}' was rejected by the browser: {message}")]
    CookieInjection { name: String, message: String },

    /// A page interaction (lookup, click, fill, wait) failed.
    #[error("interaction failed: {0}")]
    Interaction(String),

    /// The browser could not be launched or the protocol connection broke.
    #[error("browser error: {0}")]
    Browser(String),
}

impl AutomationError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn interaction(message: impl Into<String>) -> Self {
        Self::Interaction(message.into())
    }

    /// Only validation failures are the caller's fault; everything else is
    /// reported as a soft failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Wrap a lower-level store failure, keeping the whole context chain.
    pub fn store(error: anyhow::Error) -> Self {
        Self::Store(format!("{:#}", error))
    }

    pub fn browser(error: anyhow::Error) -> Self {
        Self::Browser(format!("{:#}", error))
    }
}
