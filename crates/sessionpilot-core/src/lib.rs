//! SessionPilot Core
//!
//! Data model and the two stable components of SessionPilot:
//! - the Cookie Translator (`cookies`), a pure transform from a
//!   browser-extension cookie export to CDP cookie parameters
//! - the Cookie Session Store (`session`), an upsert/lookup service keyed
//!   by (platform, account) with local and remote backends
//!
//! Also hosts the process configuration and the shared error taxonomy.

pub mod config;
pub mod cookies;
pub mod error;
pub mod models;
pub mod session;

pub use config::AppConfig;
pub use error::{AutomationError, AutomationResult};
pub use models::{BrowserCookie, SameSite, SessionRecord, SessionSummary};
pub use session::{LocalSessionBackend, RemoteSessionBackend, SessionBackend, SessionStore};
