use super::connection::{CdpConnection, wait_for_event};
use super::discovery::find_chromium;
use crate::driver::{BrowserLauncher, BrowserSession, Key, LaunchOptions, PageDriver};
use crate::locator::{Locator, Target, js_count, js_string};
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::Url;
use serde_json::{Value, json};
use sessionpilot_core::BrowserCookie;
use sessionpilot_core::config::BrowserSection;
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::Mutex;
use tracing::{debug, info};

const POLL_INTERVAL: Duration = Duration::from_millis(200);
const LOAD_EVENTS: &[&str] = &["Page.domContentEventFired", "Page.loadEventFired"];
const TARGET_LIST_ATTEMPTS: u32 = 10;
const TARGET_LIST_RETRY: Duration = Duration::from_millis(300);
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Spawns a fresh Chromium with a throwaway profile for every session.
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    config: BrowserSection,
}

impl ChromeLauncher {
    pub fn from_config(config: &BrowserSection) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserSession>> {
        let session = ChromeSession::launch(&self.config, options).await?;
        Ok(Box::new(session))
    }
}

pub struct ChromeSession {
    page: ChromePage,
    child: Mutex<Option<Child>>,
    _profile: TempDir,
}

impl ChromeSession {
    pub async fn launch(config: &BrowserSection, options: &LaunchOptions) -> Result<Self> {
        let binary = find_chromium(config.chrome_path.as_deref())?;
        let profile = tempfile::Builder::new()
            .prefix("sessionpilot-profile-")
            .tempdir()
            .context("Failed to create browser profile directory")?;

        let mut args = vec![
            "--remote-debugging-port=0".to_string(),
            format!("--user-data-dir={}", profile.path().display()),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            "--disable-extensions".to_string(),
            "--disable-background-networking".to_string(),
            "--disable-sync".to_string(),
            "--disable-features=TranslateUI".to_string(),
            "--mute-audio".to_string(),
            format!(
                "--window-size={},{}",
                config.window_width, config.window_height
            ),
        ];
        if options.headless {
            args.push("--headless=new".to_string());
            args.push("--disable-gpu".to_string());
        }
        args.extend(config.extra_args.iter().cloned());
        args.push("about:blank".to_string());

        debug!(binary = %binary.display(), headless = options.headless, "Launching Chromium");
        let mut child = Command::new(&binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to launch {}", binary.display()))?;

        let launch_timeout = Duration::from_millis(config.launch_timeout_ms);
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow!("Chromium stderr is not captured"))?;
        let browser_ws = read_devtools_url(stderr, launch_timeout).await?;
        let page_ws = find_page_target(&target_list_url(&browser_ws)?).await?;

        let cdp = CdpConnection::connect(
            &page_ws,
            launch_timeout,
            Duration::from_millis(config.command_timeout_ms),
        )
        .await?;
        for domain in ["Page.enable", "Runtime.enable", "Network.enable"] {
            cdp.send(domain, json!({})).await?;
        }

        info!(pid = ?child.id(), "Chromium session started");
        Ok(Self {
            page: ChromePage { cdp },
            child: Mutex::new(Some(child)),
            _profile: profile,
        })
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    fn page(&self) -> &dyn PageDriver {
        &self.page
    }

    async fn set_user_agent(&self, user_agent: &str) -> Result<()> {
        self.page
            .cdp
            .send(
                "Network.setUserAgentOverride",
                json!({ "userAgent": user_agent }),
            )
            .await?;
        Ok(())
    }

    async fn add_cookie(&self, cookie: &BrowserCookie) -> Result<()> {
        let result = self
            .page
            .cdp
            .send("Network.setCookie", serde_json::to_value(cookie)?)
            .await?;
        if result.get("success").and_then(Value::as_bool) == Some(false) {
            bail!("browser refused the cookie");
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let Some(mut child) = self.child.lock().await.take() else {
            return Ok(());
        };
        child.start_kill().context("Failed to kill Chromium")?;
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, child.wait()).await {
            Ok(status) => {
                let status = status.context("Failed to reap Chromium")?;
                debug!(%status, "Chromium exited");
            }
            Err(_) => bail!("Chromium did not exit within {:?}", SHUTDOWN_TIMEOUT),
        }
        Ok(())
    }
}

/// Read Chromium's stderr until it announces the DevTools endpoint.
async fn read_devtools_url(stderr: ChildStderr, timeout: Duration) -> Result<String> {
    const MARKER: &str = "DevTools listening on ";

    let mut lines = BufReader::new(stderr).lines();
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let line = tokio::time::timeout_at(deadline, lines.next_line())
            .await
            .map_err(|_| anyhow!("Chromium did not start within {}ms", timeout.as_millis()))?
            .context("Failed to read Chromium output")?;

        match line {
            Some(line) => {
                if let Some((_, url)) = line.split_once(MARKER) {
                    return Ok(url.trim().to_string());
                }
            }
            None => bail!("Chromium exited before announcing its DevTools endpoint"),
        }
    }
}

fn target_list_url(browser_ws: &str) -> Result<String> {
    let url = Url::parse(browser_ws).with_context(|| format!("Bad DevTools URL: {}", browser_ws))?;
    let host = url
        .host_str()
        .ok_or_else(|| anyhow!("DevTools URL has no host: {}", browser_ws))?;
    let port = url
        .port()
        .ok_or_else(|| anyhow!("DevTools URL has no port: {}", browser_ws))?;
    Ok(format!("http://{}:{}/json/list", host, port))
}

async fn find_page_target(list_url: &str) -> Result<String> {
    for attempt in 0..TARGET_LIST_ATTEMPTS {
        if attempt > 0 {
            tokio::time::sleep(TARGET_LIST_RETRY).await;
        }
        let Ok(response) = reqwest::get(list_url).await else {
            continue;
        };
        let Ok(targets) = response.json::<Vec<Value>>().await else {
            continue;
        };
        if let Some(ws) = page_target_ws(&targets) {
            return Ok(ws);
        }
    }
    bail!("No page target listed at {}", list_url)
}

fn page_target_ws(targets: &[Value]) -> Option<String> {
    targets
        .iter()
        .filter(|target| target.get("type").and_then(Value::as_str) == Some("page"))
        .find_map(|target| target.get("webSocketDebuggerUrl").and_then(Value::as_str))
        .map(str::to_string)
}

pub struct ChromePage {
    cdp: CdpConnection,
}

impl ChromePage {
    async fn eval_bool(&self, expression: &str) -> Result<bool> {
        Ok(self.cdp.evaluate(expression).await?.as_bool().unwrap_or(false))
    }

    /// Poll until `target` exists or `timeout` elapses.
    async fn wait_for(&self, target: &Target, timeout: Duration) -> Result<()> {
        let probe = format!("!!({})", target.js_element());
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.eval_bool(&probe).await? {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                bail!("Timed out after {}ms waiting for {}", timeout.as_millis(), target);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn dispatch_key(&self, key: Key) -> Result<()> {
        let (key_name, code, key_code, text) = match key {
            Key::Enter => ("Enter".to_string(), "Enter".to_string(), 13, Some("\r".to_string())),
            Key::Escape => ("Escape".to_string(), "Escape".to_string(), 27, None),
            Key::Char(c) => {
                let upper = c.to_ascii_uppercase();
                let code = if upper.is_ascii_alphabetic() {
                    format!("Key{}", upper)
                } else {
                    String::new()
                };
                (c.to_string(), code, upper as u32, Some(c.to_string()))
            }
        };

        let mut down = json!({
            "type": if text.is_some() { "keyDown" } else { "rawKeyDown" },
            "key": key_name,
            "code": code,
            "windowsVirtualKeyCode": key_code,
        });
        if let Some(text) = &text {
            down["text"] = json!(text);
        }
        self.cdp.send("Input.dispatchKeyEvent", down).await?;
        self.cdp
            .send(
                "Input.dispatchKeyEvent",
                json!({
                    "type": "keyUp",
                    "key": key_name,
                    "code": code,
                    "windowsVirtualKeyCode": key_code,
                }),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PageDriver for ChromePage {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        let mut events = self.cdp.subscribe();
        let result = self.cdp.send("Page.navigate", json!({ "url": url })).await?;
        if let Some(error) = result.get("errorText").and_then(Value::as_str) {
            bail!("Navigation to {} failed: {}", url, error);
        }
        // Same-document navigations (fragment changes) have no loader and fire no load event.
        if result.get("loaderId").is_none() {
            return Ok(());
        }

        wait_for_event(&mut events, LOAD_EVENTS, timeout)
            .await
            .with_context(|| format!("{} did not load", url))?;
        Ok(())
    }

    async fn title(&self) -> Result<String> {
        let title = self.cdp.evaluate("document.title").await?;
        Ok(title.as_str().unwrap_or_default().to_string())
    }

    async fn current_url(&self) -> Result<String> {
        let url = self.cdp.evaluate("location.href").await?;
        Ok(url.as_str().unwrap_or_default().to_string())
    }

    async fn count(&self, locator: &Locator, within: Option<&Target>) -> Result<usize> {
        let count = self.cdp.evaluate(&js_count(locator, within)).await?;
        Ok(count.as_u64().unwrap_or(0) as usize)
    }

    async fn text(&self, target: &Target) -> Result<Option<String>> {
        let expression = format!(
            "((el) => {{ if (!el) return null; \
             const t = (el.innerText || el.textContent || '').trim(); \
             return t || null; }})({})",
            target.js_element()
        );
        let value = self.cdp.evaluate(&expression).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn click(&self, target: &Target, timeout: Duration) -> Result<()> {
        self.wait_for(target, timeout).await?;
        let expression = format!(
            "((el) => {{ if (!el) return false; \
             el.scrollIntoView({{ block: 'center' }}); el.click(); return true; }})({})",
            target.js_element()
        );
        if !self.eval_bool(&expression).await? {
            bail!("{} disappeared before it could be clicked", target);
        }
        Ok(())
    }

    async fn fill(&self, target: &Target, text: &str, timeout: Duration) -> Result<()> {
        self.wait_for(target, timeout).await?;
        let expression = format!(
            "((el, text) => {{ if (!el) return false; el.focus(); \
             if (el.isContentEditable) {{ \
               document.execCommand('selectAll', false, null); \
               return document.execCommand('insertText', false, text); }} \
             if ('value' in el) {{ \
               const proto = Object.getPrototypeOf(el); \
               const setter = Object.getOwnPropertyDescriptor(proto, 'value')?.set; \
               if (setter) setter.call(el, text); else el.value = text; \
               el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
               return true; }} \
             return false; }})({}, {})",
            target.js_element(),
            js_string(text)
        );
        if !self.eval_bool(&expression).await? {
            bail!("{} does not accept text", target);
        }
        Ok(())
    }

    async fn type_text(&self, target: &Target, text: &str, delay: Duration) -> Result<()> {
        let focus = format!(
            "((el) => {{ if (!el) return false; el.focus(); return true; }})({})",
            target.js_element()
        );
        if !self.eval_bool(&focus).await? {
            bail!("{} cannot be focused", target);
        }
        for c in text.chars() {
            self.cdp
                .send("Input.insertText", json!({ "text": c.to_string() }))
                .await?;
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn press_key(&self, key: Key) -> Result<()> {
        self.dispatch_key(key).await
    }

    async fn scroll(&self, container: Option<&Target>, delta_y: i64) -> Result<()> {
        let expression = match container {
            Some(target) => format!(
                "((el) => {{ if (!el) return false; el.scrollBy(0, {}); return true; }})({})",
                delta_y,
                target.js_element()
            ),
            None => format!("(() => {{ window.scrollBy(0, {}); return true; }})()", delta_y),
        };
        if !self.eval_bool(&expression).await? {
            bail!("Scroll container vanished");
        }
        Ok(())
    }

    async fn cookie_names(&self) -> Result<Vec<String>> {
        let result = self.cdp.send("Network.getCookies", json!({})).await?;
        let names = result
            .get("cookies")
            .and_then(Value::as_array)
            .map(|cookies| {
                cookies
                    .iter()
                    .filter_map(|cookie| cookie.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(names)
    }
}
