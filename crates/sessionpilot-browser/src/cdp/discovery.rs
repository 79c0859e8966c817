use anyhow::{Result, bail};
use std::path::{Path, PathBuf};

const CHROME_PATH_ENV: &str = "CHROME_PATH";

const BINARY_NAMES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
    "msedge",
];

/// Locate a Chromium-based browser: the configured path, then `CHROME_PATH`,
/// then well-known binary names on `PATH`, then install locations.
pub fn find_chromium(configured: Option<&Path>) -> Result<PathBuf> {
    let from_env = std::env::var_os(CHROME_PATH_ENV).map(PathBuf::from);
    resolve(configured, from_env)
}

fn resolve(configured: Option<&Path>, from_env: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        bail!("Configured Chrome path does not exist: {}", path.display());
    }

    if let Some(path) = from_env.filter(|path| path.exists()) {
        return Ok(path);
    }

    if let Some(path) = BINARY_NAMES.iter().find_map(|name| which::which(name).ok()) {
        return Ok(path);
    }

    if let Some(path) = install_locations().into_iter().find(|path| path.exists()) {
        return Ok(path);
    }

    bail!(
        "No Chrome or Chromium found. Install one or set {} (or browser.chrome_path)",
        CHROME_PATH_ENV
    )
}

fn install_locations() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = Vec::new();

    #[cfg(target_os = "linux")]
    paths.extend(
        [
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/usr/bin/microsoft-edge",
        ]
        .map(PathBuf::from),
    );

    #[cfg(target_os = "macos")]
    paths.extend(
        [
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
        ]
        .map(PathBuf::from),
    );

    #[cfg(windows)]
    for var in ["ProgramFiles", "ProgramFiles(x86)", "LOCALAPPDATA"] {
        if let Some(root) = std::env::var_os(var) {
            let root = PathBuf::from(root);
            paths.push(root.join(r"Google\Chrome\Application\chrome.exe"));
            paths.push(root.join(r"Microsoft\Edge\Application\msedge.exe"));
        }
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_path_wins() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let other = tempfile::NamedTempFile::new().unwrap();

        let found = resolve(Some(file.path()), Some(other.path().to_path_buf())).unwrap();
        assert_eq!(found, file.path());
    }

    #[test]
    fn test_missing_configured_path_is_an_error() {
        let err = resolve(Some(Path::new("/definitely/not/chrome")), None).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/chrome"));
    }

    #[test]
    fn test_env_path_used_when_not_configured() {
        let file = tempfile::NamedTempFile::new().unwrap();

        let found = resolve(None, Some(file.path().to_path_buf())).unwrap();
        assert_eq!(found, file.path());
    }
}
