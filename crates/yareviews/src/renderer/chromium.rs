//! Chromium-based renderer using chromiumoxide.
//!
//! Every tab mirrors its `Network.responseReceived` events into an in-memory
//! buffer laid out like Chrome's performance log, which is what
//! [`RenderContext::drain_log`] hands out. The buffer keeps at most
//! `log_capacity` entries and drops the oldest first.

use super::{NavigationResult, NodeRef, RenderContext, Renderer};
use crate::config::BrowserSettings;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{EnableParams, EventResponseReceived};
use chromiumoxide::cdp::js_protocol::runtime::ReleaseObjectParams;
use chromiumoxide::page::Page;
use chromiumoxide::Element;
use futures::StreamExt;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::debug;

const VISIBLE_FN: &str = "function() {
    const rect = this.getBoundingClientRect();
    const style = window.getComputedStyle(this);
    return rect.width > 0 && rect.height > 0
        && style.visibility !== 'hidden' && style.display !== 'none';
}";

const CLICK_FN: &str = "function() { this.click(); return true; }";

const SCROLL_FN: &str = "function() { this.scrollIntoView(); return true; }";

/// Find the Chromium binary path.
pub fn find_chromium(settings: &BrowserSettings) -> Option<PathBuf> {
    // 1. Explicit setting (config file or YAREVIEWS_CHROMIUM_PATH)
    if let Some(path) = &settings.chromium_path {
        if path.exists() {
            return Some(path.clone());
        }
    }

    // 2. ~/.yareviews/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".yareviews/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".yareviews/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".yareviews/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".yareviews/chromium/chrome-linux64/chrome"),
                home.join(".yareviews/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Chromium-based renderer.
pub struct ChromiumRenderer {
    browser: tokio::sync::Mutex<Browser>,
    handler_task: JoinHandle<()>,
    active_count: Arc<AtomicUsize>,
    log_capacity: usize,
}

impl ChromiumRenderer {
    /// Launch a Chromium instance configured by `settings`.
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        let chrome_path = find_chromium(settings)
            .context("Chromium not found. Set YAREVIEWS_CHROMIUM_PATH or browser.chromium_path.")?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(settings.window_width, settings.window_height)
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg(format!(
                "--window-size={},{}",
                settings.window_width, settings.window_height
            ));
        builder = if settings.headless {
            builder.arg("--headless=new")
        } else {
            builder.with_head()
        };
        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser handler error: {e}");
                }
            }
        });

        Ok(Self {
            browser: tokio::sync::Mutex::new(browser),
            handler_task,
            active_count: Arc::new(AtomicUsize::new(0)),
            log_capacity: settings.log_capacity,
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;

        if let Err(e) = page.execute(EnableParams::default()).await {
            debug!("Network.enable failed: {e}");
        }

        let capacity = self.log_capacity;
        let log = Arc::new(Mutex::new(VecDeque::new()));
        let mut events = page
            .event_listener::<EventResponseReceived>()
            .await
            .context("failed to subscribe to network responses")?;
        let sink = Arc::clone(&log);
        let listener = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let params = match serde_json::to_value(&*event) {
                    Ok(params) => params,
                    Err(e) => {
                        debug!("dropping unserializable network event: {e}");
                        continue;
                    }
                };
                let entry = serde_json::json!({
                    "message": { "method": "Network.responseReceived", "params": params }
                });
                if let Ok(mut buffer) = sink.lock() {
                    if push_bounded(&mut buffer, entry.to_string(), capacity) {
                        debug!(capacity, "performance log full, dropped oldest entry");
                    }
                }
            }
        });

        self.active_count.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(ChromiumContext {
            page,
            elements: tokio::sync::Mutex::new(HandleRegistry::new()),
            log,
            listener,
            active_count: Arc::clone(&self.active_count),
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        browser.close().await.context("failed to close Chromium")?;
        self.handler_task.abort();
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// A single Chromium page context.
pub struct ChromiumContext {
    page: Page,
    elements: tokio::sync::Mutex<HandleRegistry<Element>>,
    log: Arc<Mutex<VecDeque<String>>>,
    listener: JoinHandle<()>,
    active_count: Arc<AtomicUsize>,
}

/// Append `entry`, dropping from the front past `capacity`. Returns whether
/// anything was dropped.
fn push_bounded(buffer: &mut VecDeque<String>, entry: String, capacity: usize) -> bool {
    buffer.push_back(entry);
    let mut dropped = false;
    while buffer.len() > capacity {
        buffer.pop_front();
        dropped = true;
    }
    dropped
}

/// Scope node id (if any) and selector of an element query.
type QueryKey = (Option<String>, String);

/// Elements handed out as `NodeRef`s, keyed by remote object id.
///
/// Each handle belongs to the query that produced it. Running the same query
/// again evicts the handles of its previous run that no other live query
/// returned, along with everything queried inside them.
struct HandleRegistry<E> {
    handles: HashMap<String, E>,
    queries: HashMap<QueryKey, Vec<String>>,
}

impl<E> HandleRegistry<E> {
    fn new() -> Self {
        Self {
            handles: HashMap::new(),
            queries: HashMap::new(),
        }
    }

    fn get(&self, node: &NodeRef) -> Result<&E> {
        self.handles
            .get(node.as_str())
            .with_context(|| format!("stale element handle: {node}"))
    }

    /// Store the result of one query. Returns the refs to hand out and the
    /// handles evicted from the previous run.
    fn record(
        &mut self,
        scope: Option<&NodeRef>,
        selector: &str,
        found: Vec<(String, E)>,
    ) -> (Vec<NodeRef>, Vec<E>) {
        let ids: Vec<String> = found.iter().map(|(id, _)| id.clone()).collect();
        let key = (scope.map(|n| n.as_str().to_string()), selector.to_string());
        let previous = self.queries.insert(key, ids.clone()).unwrap_or_default();
        for (id, handle) in found {
            self.handles.insert(id, handle);
        }
        let evicted = self.evict(previous);
        (ids.into_iter().map(NodeRef::new).collect(), evicted)
    }

    fn evict(&mut self, ids: Vec<String>) -> Vec<E> {
        let mut pending = ids;
        let mut evicted = Vec::new();
        while let Some(id) = pending.pop() {
            if self.queries.values().any(|live| live.contains(&id)) {
                continue;
            }
            let Some(handle) = self.handles.remove(&id) else {
                continue;
            };
            evicted.push(handle);
            let nested: Vec<QueryKey> = self
                .queries
                .keys()
                .filter(|(scope, _)| scope.as_deref() == Some(id.as_str()))
                .cloned()
                .collect();
            for key in nested {
                if let Some(ids) = self.queries.remove(&key) {
                    pending.extend(ids);
                }
            }
        }
        evicted
    }

    fn clear(&mut self) {
        self.handles.clear();
        self.queries.clear();
    }

    fn len(&self) -> usize {
        self.handles.len()
    }
}

impl ChromiumContext {
    async fn call_on(&self, node: &NodeRef, function: &str) -> Result<Option<serde_json::Value>> {
        let elements = self.elements.lock().await;
        let element = elements.get(node)?;
        let returns = element
            .call_js_fn(function, false)
            .await
            .context("JS call on element failed")?;
        Ok(returns.result.value)
    }
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        let start = Instant::now();
        self.elements.lock().await.clear();

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(timeout_ms),
            self.page.goto(url),
        )
        .await;

        let load_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(_)) => {
                let _ = self.page.wait_for_navigation().await;

                let final_url = self
                    .page
                    .url()
                    .await
                    .unwrap_or_default()
                    .unwrap_or_else(|| url.to_string());

                Ok(NavigationResult {
                    final_url,
                    load_time_ms,
                })
            }
            Ok(Err(e)) => bail!("navigation failed: {e}"),
            Err(_) => bail!("navigation timed out after {timeout_ms}ms"),
        }
    }

    async fn query_all(&self, scope: Option<&NodeRef>, selector: &str) -> Result<Vec<NodeRef>> {
        let mut elements = self.elements.lock().await;
        let found = match scope {
            None => self
                .page
                .find_elements(selector)
                .await
                .with_context(|| format!("query failed: {selector}"))?,
            Some(node) => elements
                .get(node)?
                .find_elements(selector)
                .await
                .with_context(|| format!("scoped query failed: {selector}"))?,
        };

        let found = found
            .into_iter()
            .map(|element| (element.remote_object_id.inner().clone(), element))
            .collect();
        let (refs, evicted) = elements.record(scope, selector, found);
        let live = elements.len();
        drop(elements);

        if !evicted.is_empty() {
            debug!(selector, released = evicted.len(), live, "releasing superseded element handles");
        }
        for element in evicted {
            let release = ReleaseObjectParams::new(element.remote_object_id.clone());
            if let Err(e) = self.page.execute(release).await {
                debug!("failed to release element handle: {e}");
            }
        }
        Ok(refs)
    }

    async fn text(&self, node: &NodeRef) -> Result<Option<String>> {
        let elements = self.elements.lock().await;
        let element = elements.get(node)?;
        element.inner_text().await.context("failed to read text")
    }

    async fn attribute(&self, node: &NodeRef, name: &str) -> Result<Option<String>> {
        let elements = self.elements.lock().await;
        let element = elements.get(node)?;
        element
            .attribute(name)
            .await
            .with_context(|| format!("failed to read attribute {name}"))
    }

    async fn is_visible(&self, node: &NodeRef) -> Result<bool> {
        let value = self.call_on(node, VISIBLE_FN).await?;
        Ok(value.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    async fn click(&self, node: &NodeRef) -> Result<()> {
        self.call_on(node, CLICK_FN).await?;
        Ok(())
    }

    async fn scroll_into_view(&self, node: &NodeRef) -> Result<()> {
        self.call_on(node, SCROLL_FN).await?;
        Ok(())
    }

    async fn drain_log(&self) -> Result<Vec<String>> {
        let mut buffer = self
            .log
            .lock()
            .map_err(|_| anyhow::anyhow!("performance log buffer poisoned"))?;
        Ok(buffer.drain(..).collect())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        self.listener.abort();
        let _ = self.page.close().await;
        Ok(())
    }
}
