//! Renderer abstraction for browser-driven page access.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide). Session code
//! only sees these traits, which is what lets the tests drive it with a
//! scripted page.

pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// Opaque handle to one DOM element of the current document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeRef(String);

impl NodeRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab).
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<()>;
    /// Number of currently active contexts.
    fn active_contexts(&self) -> usize;
}

/// A single browser context (tab).
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;

    /// All elements matching a CSS selector, in document order. Searches the
    /// whole document when `scope` is `None`, otherwise the scope's subtree.
    async fn query_all(&self, scope: Option<&NodeRef>, selector: &str) -> Result<Vec<NodeRef>>;

    /// First element matching a CSS selector.
    async fn query_one(&self, scope: Option<&NodeRef>, selector: &str) -> Result<Option<NodeRef>> {
        Ok(self.query_all(scope, selector).await?.into_iter().next())
    }

    /// Rendered text of an element.
    async fn text(&self, node: &NodeRef) -> Result<Option<String>>;

    /// Attribute value, `None` when the attribute is not set.
    async fn attribute(&self, node: &NodeRef, name: &str) -> Result<Option<String>>;

    /// Whether the element currently occupies visible layout space.
    async fn is_visible(&self, node: &NodeRef) -> Result<bool>;

    /// Scripted click (`element.click()`), no pointer simulation.
    async fn click(&self, node: &NodeRef) -> Result<()>;

    async fn scroll_into_view(&self, node: &NodeRef) -> Result<()>;

    /// Take every buffered performance-log entry. Each entry is the raw JSON
    /// text of one log message; the buffer is empty afterwards.
    async fn drain_log(&self) -> Result<Vec<String>>;

    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;
}
