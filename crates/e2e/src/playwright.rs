//! Playwright browser driver
//!
//! Runs a small Node bridge that owns one Playwright page and speaks JSON
//! lines over stdio:
//!
//! ```text
//! stdin  -> {"id": 3, "cmd": "select", "slot": "end", "index": 1}
//! stdout <- {"id": 3, "ok": true, "result": null}
//! stdout <- {"event": "response", "response": {"url": ..., "status": 200, ...}}
//! ```
//!
//! Replies are routed to the waiting command by id. Response events are
//! published on a broadcast channel, which is what `subscribe_responses`
//! hands to the correlator.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command as TokioCommand};
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, trace, warn};

use cableguy_common::{NetworkResponse, Slot};

use crate::driver::{BrowserDriver, ResponseStream};
use crate::error::{E2eError, E2eResult};

const RESPONSE_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" | "safari" => Ok(Browser::Webkit),
            other => Err(E2eError::ScenarioParse(format!("unknown browser '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// CSS selectors the bridge uses to find things on the configurator page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub consent_accept: String,
    pub begin_button: String,
    pub end_button: String,
    pub slot_image: String,
    pub option_item: String,
    pub brand_item: String,
    pub brand_name: String,
    pub brand_count: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            consent_accept: ".spicy-consent-bar__action-accept".to_string(),
            begin_button: ".cg-plugButton--left".to_string(),
            end_button: ".cg-plugButton--right".to_string(),
            slot_image: "img.cg-plugImage".to_string(),
            option_item: ".cg-plugItem".to_string(),
            brand_item: ".cg-brands__item".to_string(),
            brand_name: ".cg-brands__item__name".to_string(),
            brand_count: ".cg-brands__item__count".to_string(),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub browser: Browser,
    pub headless: bool,
    pub viewport: Viewport,
    /// Node executable used to run the bridge
    pub node_binary: PathBuf,
    /// Extra module search path so the bridge can `require('playwright')`
    pub node_path: Option<PathBuf>,
    /// Upper bound for a single bridge command
    pub command_timeout_ms: u64,
    /// How long to look for the consent banner before moving on
    pub consent_timeout_ms: u64,
    pub selectors: Selectors,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.thomann.de/intl/cableguy.html".to_string(),
            browser: Browser::Chromium,
            headless: true,
            viewport: Viewport::default(),
            node_binary: PathBuf::from("node"),
            node_path: None,
            command_timeout_ms: 30_000,
            consent_timeout_ms: 1_500,
            selectors: Selectors::default(),
        }
    }
}

/// Line written by the bridge on stdout
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BridgeMessage {
    Event {
        event: String,
        response: NetworkResponse,
    },
    Reply {
        id: u64,
        ok: bool,
        #[serde(default)]
        result: Value,
        #[serde(default)]
        error: Option<String>,
    },
}

type PendingReplies = Arc<Mutex<HashMap<u64, oneshot::Sender<E2eResult<Value>>>>>;

/// Live browser session behind the Node bridge
pub struct PlaywrightDriver {
    config: PlaywrightConfig,
    child: tokio::sync::Mutex<Child>,
    stdin: tokio::sync::Mutex<ChildStdin>,
    pending: PendingReplies,
    next_id: AtomicU64,
    responses: broadcast::Sender<NetworkResponse>,
    _script_dir: TempDir,
}

impl PlaywrightDriver {
    /// Start the bridge and a fresh browser page
    pub async fn launch(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed()?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("cableguy-bridge.js");
        std::fs::write(&script_path, BRIDGE_SCRIPT)?;

        let mut cmd = TokioCommand::new(&config.node_binary);
        cmd.arg(&script_path)
            .current_dir(script_dir.path())
            .env("CABLEGUY_BRIDGE_CONFIG", bridge_config(&config).to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(node_path) = &config.node_path {
            cmd.env("NODE_PATH", node_path);
        }

        let mut child = cmd.spawn().map_err(|e| {
            E2eError::Playwright(format!(
                "Failed to spawn {}: {}",
                config.node_binary.display(),
                e
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdout unavailable".to_string()))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("[bridge] {}", line);
                }
            });
        }

        let pending: PendingReplies = Arc::new(Mutex::new(HashMap::new()));
        let (responses, _) = broadcast::channel(RESPONSE_CHANNEL_CAPACITY);

        tokio::spawn(read_bridge_output(
            BufReader::new(stdout),
            pending.clone(),
            responses.clone(),
        ));

        let driver = Self {
            config,
            child: tokio::sync::Mutex::new(child),
            stdin: tokio::sync::Mutex::new(stdin),
            pending,
            next_id: AtomicU64::new(1),
            responses,
            _script_dir: script_dir,
        };

        driver.request(json!({ "cmd": "start" })).await?;
        info!(
            "Playwright bridge ready ({}, headless: {})",
            driver.config.browser.as_str(),
            driver.config.headless
        );
        Ok(driver)
    }

    /// Check if Playwright is installed
    fn check_playwright_installed() -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Navigate to the configurator and dismiss the consent banner if shown
    pub async fn open(&self) -> E2eResult<()> {
        let result = self.request(json!({ "cmd": "open" })).await?;

        let ok = result.get("ok").and_then(Value::as_bool).unwrap_or(false);
        let url = result.get("url").and_then(Value::as_str).unwrap_or_default();
        if !ok {
            return Err(E2eError::Playwright(format!(
                "navigation to {} did not succeed",
                self.config.base_url
            )));
        }
        if !url.contains("cableguy") {
            return Err(E2eError::Playwright(format!(
                "landed on unexpected page {}",
                url
            )));
        }

        if result.get("consent_dismissed").and_then(Value::as_bool) == Some(true) {
            debug!("Consent banner dismissed");
        }
        info!("Configurator open at {}", url);
        Ok(())
    }

    /// Close the browser and stop the bridge
    pub async fn close(&self) -> E2eResult<()> {
        if let Err(e) = self.request(json!({ "cmd": "close" })).await {
            warn!("Bridge did not close cleanly: {}", e);
        }
        let mut child = self.child.lock().await;
        kill_bridge(&mut child).await;
        Ok(())
    }

    async fn request(&self, mut command: Value) -> E2eResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        command["id"] = json!(id);

        let line = serde_json::to_string(&command)?;
        trace!("bridge <- {}", line);
        let rx = {
            let mut stdin = self.stdin.lock().await;
            send_command(&mut *stdin, &self.pending, id, &line).await?
        };

        let timeout = Duration::from_millis(self.config.command_timeout_ms);
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(E2eError::Playwright(
                "bridge exited before replying".to_string(),
            )),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(E2eError::Driver(format!(
                    "command {} timed out after {} ms",
                    command["cmd"], self.config.command_timeout_ms
                )))
            }
        }
    }
}

#[async_trait]
impl BrowserDriver for PlaywrightDriver {
    async fn open_selection_surface(&self, slot: Slot) -> E2eResult<()> {
        self.request(json!({ "cmd": "open_surface", "slot": slot })).await?;
        Ok(())
    }

    async fn list_rendered_options(&self) -> E2eResult<Vec<String>> {
        let result = self.request(json!({ "cmd": "list_options" })).await?;
        Ok(serde_json::from_value(result)?)
    }

    async fn trigger_selection(&self, slot: Slot, index: usize) -> E2eResult<()> {
        self.request(json!({ "cmd": "select", "slot": slot, "index": index }))
            .await?;
        Ok(())
    }

    async fn read_rendered_count(&self, brand: &str) -> E2eResult<u64> {
        let result = self
            .request(json!({
                "cmd": "rendered_count",
                "brand": brand,
                "pattern": exact_label_pattern(brand),
            }))
            .await?;
        let text = result.as_str().unwrap_or_default();
        parse_rendered_count(text).ok_or_else(|| {
            E2eError::Driver(format!("no count rendered for brand '{}': {:?}", brand, text))
        })
    }

    fn subscribe_responses(&self) -> ResponseStream {
        self.responses.subscribe()
    }

    async fn selected_slot_label(&self, slot: Slot) -> E2eResult<Option<String>> {
        let result = self.request(json!({ "cmd": "slot_label", "slot": slot })).await?;
        Ok(result.as_str().map(String::from))
    }
}

/// Kill the bridge process; false if the kill itself failed
async fn kill_bridge(child: &mut Child) -> bool {
    match child.kill().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Failed to kill bridge process: {}", e);
            false
        }
    }
}

/// Register the reply slot, then write the command line.
///
/// The slot exists before the bridge can see the command; a failed write
/// takes it back out.
async fn send_command<W>(
    writer: &mut W,
    pending: &PendingReplies,
    id: u64,
    line: &str,
) -> E2eResult<oneshot::Receiver<E2eResult<Value>>>
where
    W: AsyncWrite + Unpin,
{
    let (tx, rx) = oneshot::channel();
    pending.lock().insert(id, tx);

    let written = async {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await
    }
    .await;

    match written {
        Ok(()) => Ok(rx),
        Err(e) => {
            pending.lock().remove(&id);
            Err(E2eError::Playwright(format!("bridge stdin write failed: {}", e)))
        }
    }
}

async fn read_bridge_output<R>(
    mut reader: BufReader<R>,
    pending: PendingReplies,
    responses: broadcast::Sender<NetworkResponse>,
) where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Bridge stdout read failed: {}", e);
                break;
            }
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        trace!("bridge -> {}", trimmed);

        match serde_json::from_str::<BridgeMessage>(trimmed) {
            Ok(BridgeMessage::Event { event, response }) => {
                if event == "response" {
                    // no subscribers just means nobody is correlating right now
                    let _ = responses.send(response);
                }
            }
            Ok(BridgeMessage::Reply {
                id,
                ok,
                result,
                error,
            }) => {
                let reply = if ok {
                    Ok(result)
                } else {
                    Err(E2eError::Playwright(
                        error.unwrap_or_else(|| "unknown bridge error".to_string()),
                    ))
                };
                match pending.lock().remove(&id) {
                    Some(tx) => {
                        let _ = tx.send(reply);
                    }
                    None => debug!("Dropping reply for abandoned command {}", id),
                }
            }
            Err(e) => debug!("Unrecognized bridge output ({}): {}", e, trimmed),
        }
    }

    debug!("Bridge output closed");
    pending.lock().clear();
}

fn bridge_config(config: &PlaywrightConfig) -> Value {
    json!({
        "base_url": config.base_url,
        "browser": config.browser.as_str(),
        "headless": config.headless,
        "viewport": { "width": config.viewport.width, "height": config.viewport.height },
        "consent_timeout_ms": config.consent_timeout_ms,
        "selectors": config.selectors,
    })
}

/// Anchored pattern for a label equal to `label`, surrounding whitespace aside
fn exact_label_pattern(label: &str) -> String {
    format!(r"^\s*{}\s*$", regex::escape(label.trim()))
}

/// First number in a rendered label such as "(1,204)" or "12 articles"
pub fn parse_rendered_count(text: &str) -> Option<u64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '\''))
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

const BRIDGE_SCRIPT: &str = r#"
const readline = require('readline');
const { chromium, firefox, webkit } = require('playwright');

const cfg = JSON.parse(process.env.CABLEGUY_BRIDGE_CONFIG);
const engines = { chromium, firefox, webkit };
const sel = cfg.selectors;
let browser;
let page;

function emit(msg) {
  process.stdout.write(JSON.stringify(msg) + '\n');
}

function slotButton(slot) {
  return slot === 'begin' ? sel.begin_button : sel.end_button;
}

const commands = {
  async start() {
    browser = await engines[cfg.browser].launch({ headless: cfg.headless });
    const context = await browser.newContext({ viewport: cfg.viewport });
    page = await context.newPage();
    page.on('response', async (response) => {
      const type = response.request().resourceType();
      if (type !== 'xhr' && type !== 'fetch') return;
      let body = '';
      try { body = await response.text(); } catch (e) { /* body gone after navigation */ }
      emit({
        event: 'response',
        response: {
          url: response.url(),
          status: response.status(),
          resource_type: type,
          content_type: response.headers()['content-type'] || null,
          body,
        },
      });
    });
    return null;
  },
  async open() {
    const resp = await page.goto(cfg.base_url, { waitUntil: 'domcontentloaded' });
    let consent_dismissed = false;
    try {
      await page.locator(sel.consent_accept).click({ timeout: cfg.consent_timeout_ms });
      consent_dismissed = true;
    } catch (e) { /* banner not shown */ }
    return { ok: !!resp && resp.ok(), url: page.url(), consent_dismissed };
  },
  async open_surface({ slot }) {
    await page.locator(slotButton(slot)).click();
    await page.locator(sel.option_item).first().waitFor({ state: 'visible' });
    return null;
  },
  async list_options() {
    return await page.locator(sel.option_item).allInnerTexts();
  },
  async select({ index }) {
    await page.locator(sel.option_item).nth(index).click();
    return null;
  },
  async slot_label({ slot }) {
    const img = page.locator(slotButton(slot)).locator(sel.slot_image).first();
    if ((await img.count()) === 0) return null;
    return (await img.getAttribute('alt')) || (await img.getAttribute('src'));
  },
  async rendered_count({ brand, pattern }) {
    const name = page.locator(sel.brand_name, { hasText: new RegExp(pattern) });
    const item = page.locator(sel.brand_item, { has: name }).first();
    try {
      await item.waitFor({ state: 'visible' });
    } catch (e) {
      throw new Error('brand ' + brand + ' not rendered: ' + e.message);
    }
    return await item.locator(sel.brand_count).first().innerText();
  },
  async close() {
    if (browser) await browser.close();
    setImmediate(() => process.exit(0));
    return null;
  },
};

const rl = readline.createInterface({ input: process.stdin });
rl.on('line', async (line) => {
  let msg;
  try { msg = JSON.parse(line); } catch (e) { return; }
  const handler = commands[msg.cmd];
  if (!handler) {
    emit({ id: msg.id, ok: false, error: 'unknown command ' + msg.cmd });
    return;
  }
  try {
    const result = await handler(msg);
    emit({ id: msg.id, ok: true, result: result === undefined ? null : result });
  } catch (error) {
    emit({ id: msg.id, ok: false, error: error.message });
  }
});
rl.on('close', async () => {
  if (browser) await browser.close();
  process.exit(0);
});
"#;
