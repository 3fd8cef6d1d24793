//! Performance-log decoding.
//!
//! The log channel is best-effort: an unavailable buffer reads as empty and
//! malformed entries are dropped.

use crate::renderer::RenderContext;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace};

/// One decoded DevTools event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogEvent {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl LogEvent {
    /// `params.response.<key>` for `Network.*` response events.
    pub fn response_field(&self, key: &str) -> Option<&Value> {
        self.params.get("response").and_then(|r| r.get(key))
    }
}

/// Decode one raw entry.
///
/// Accepts the shapes Chrome produces: `{"message": {"method", "params"}}`,
/// the WebDriver wrapper whose `message` is itself a JSON string of that
/// object, and a bare `{"method", "params"}`.
pub fn decode_entry(raw: &str) -> Option<LogEvent> {
    let value: Value = serde_json::from_str(raw).ok()?;
    decode_value(value, 0)
}

/// Layers between the raw entry and the event object. The WebDriver shape
/// uses all of them: object, string, object, object.
const MAX_WRAPPER_DEPTH: u8 = 3;

fn decode_value(value: Value, depth: u8) -> Option<LogEvent> {
    if depth > MAX_WRAPPER_DEPTH {
        return None;
    }
    match value {
        Value::String(inner) => {
            let parsed: Value = serde_json::from_str(&inner).ok()?;
            decode_value(parsed, depth + 1)
        }
        Value::Object(mut map) => {
            if map.contains_key("method") {
                return serde_json::from_value(Value::Object(map)).ok();
            }
            let inner = map.remove("message")?;
            decode_value(inner, depth + 1)
        }
        _ => None,
    }
}

/// Take everything currently buffered and decode it.
pub async fn drain(ctx: &dyn RenderContext) -> Vec<LogEvent> {
    let raw = match ctx.drain_log().await {
        Ok(raw) => raw,
        Err(e) => {
            debug!("performance log unavailable: {e}");
            return Vec::new();
        }
    };

    let total = raw.len();
    let events: Vec<LogEvent> = raw.iter().filter_map(|entry| decode_entry(entry)).collect();
    if events.len() < total {
        trace!("dropped {} malformed log entries", total - events.len());
    }
    events
}
