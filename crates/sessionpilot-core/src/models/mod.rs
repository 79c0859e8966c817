pub mod cookie;
pub mod session;

pub use cookie::{BrowserCookie, SameSite};
pub use session::{
    SessionRecord, SessionSummary, normalize_account, normalize_platform, session_key,
};
