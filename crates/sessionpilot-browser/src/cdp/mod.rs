//! Chromium driven over the DevTools protocol.

mod chrome;
mod connection;
mod discovery;

pub use chrome::{ChromeLauncher, ChromePage, ChromeSession};
pub use connection::{CdpConnection, CdpEvent};
pub use discovery::find_chromium;
