//! SessionPilot browser layer.
//!
//! - `driver`: capability traits for launching a browser and driving a page
//! - `cdp`: the Chromium implementation of those traits
//! - `locator`, `cascade`, `profile`: ordered fallback selectors per platform
//! - `interact`: comments panel, hydration, extraction, replies, login hint

pub mod cascade;
pub mod cdp;
pub mod driver;
pub mod interact;
pub mod locator;
pub mod profile;
#[cfg(any(test, feature = "test-utils"))]
pub mod testkit;

pub use cascade::{Resolved, SelectorCascade};
pub use cdp::ChromeLauncher;
pub use driver::{
    BrowserLauncher, BrowserSession, Key, LaunchOptions, PageDriver, ScopedSession, seed_session,
};
pub use interact::{
    CommentRow, Extraction, InputMethod, LoginSignal, PageAutomation, PanelActivation,
    ReplyOutcome,
};
pub use locator::{Locator, Target};
pub use profile::PlatformProfile;
