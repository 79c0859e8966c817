//! Path utilities for SessionPilot directory resolution.

use anyhow::Result;
use std::path::PathBuf;

const SESSIONPILOT_DIR: &str = ".sessionpilot";
const DATABASE_FILE: &str = "sessions.redb";

/// Environment variable to override the SessionPilot directory.
pub const SESSIONPILOT_DIR_ENV: &str = "SESSIONPILOT_DIR";

/// Resolve the SessionPilot data directory.
/// Priority: SESSIONPILOT_DIR env var > ~/.sessionpilot/
pub fn resolve_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(SESSIONPILOT_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|h| h.join(SESSIONPILOT_DIR))
        .ok_or_else(|| anyhow::anyhow!("Failed to determine home directory"))
}

/// Default location of the local session database.
pub fn default_database_path() -> Result<PathBuf> {
    Ok(resolve_data_dir()?.join(DATABASE_FILE))
}
