//! Configuration loading and resolution.

use crate::error::{HarvestError, HarvestResult};
use crate::selectors::SelectorTable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Browser launch settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    /// Explicit Chromium binary. Falls back to discovery when unset.
    pub chromium_path: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
    /// Network log entries kept per tab between drains. The oldest are
    /// dropped first.
    pub log_capacity: usize,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            chromium_path: None,
            window_width: 1920,
            window_height: 1080,
            log_capacity: 1000,
        }
    }
}

/// Every tunable of a harvest run. All fields have defaults, so a config
/// file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Review page URL, `{id}` is replaced with the organization id.
    pub url_template: String,
    /// Substring identifying the background review-fetch request.
    pub fetch_marker: String,
    /// Query key whose value is the business id.
    pub business_id_key: String,
    pub navigation_timeout_ms: u64,
    /// Pause after navigation so the page can issue its first requests.
    pub page_settle_ms: u64,
    pub resolve_timeout_ms: u64,
    pub log_poll_interval_ms: u64,
    /// Pause after each scroll for lazily rendered cards.
    pub scroll_settle_ms: u64,
    /// Optional cap on scroll rounds. `None` loads until the list stops growing.
    pub max_scroll_rounds: Option<u32>,
    pub sort_attempts: u32,
    pub sort_poll_interval_ms: u64,
    pub sort_open_wait_ms: u64,
    pub sort_select_wait_ms: u64,
    pub browser: BrowserSettings,
    pub selectors: SelectorTable,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            url_template: "https://yandex.ru/maps/org/{id}/reviews/".into(),
            fetch_marker: "fetchReviews".into(),
            business_id_key: "businessId".into(),
            navigation_timeout_ms: 30_000,
            page_settle_ms: 4_000,
            resolve_timeout_ms: 10_000,
            log_poll_interval_ms: 300,
            scroll_settle_ms: 1_000,
            max_scroll_rounds: None,
            sort_attempts: 20,
            sort_poll_interval_ms: 500,
            sort_open_wait_ms: 700,
            sort_select_wait_ms: 1_000,
            browser: BrowserSettings::default(),
            selectors: SelectorTable::default(),
        }
    }
}

impl HarvestConfig {
    /// Load from a JSON file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> HarvestResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            HarvestError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Review page URL for an organization id.
    pub fn page_url(&self, id: u64) -> String {
        self.url_template.replace("{id}", &id.to_string())
    }

    /// Apply `YAREVIEWS_CHROMIUM_PATH` and `YAREVIEWS_HEADLESS`.
    pub fn apply_env(&mut self) {
        if let Ok(path) = std::env::var("YAREVIEWS_CHROMIUM_PATH") {
            if !path.is_empty() {
                self.browser.chromium_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(flag) = std::env::var("YAREVIEWS_HEADLESS") {
            if let Some(headless) = parse_flag(&flag) {
                self.browser.headless = headless;
            }
        }
    }

    pub fn page_settle(&self) -> Duration {
        Duration::from_millis(self.page_settle_ms)
    }

    pub fn log_poll_interval(&self) -> Duration {
        Duration::from_millis(self.log_poll_interval_ms)
    }

    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }

    pub fn sort_poll_interval(&self) -> Duration {
        Duration::from_millis(self.sort_poll_interval_ms)
    }

    pub fn sort_open_wait(&self) -> Duration {
        Duration::from_millis(self.sort_open_wait_ms)
    }

    pub fn sort_select_wait(&self) -> Duration {
        Duration::from_millis(self.sort_select_wait_ms)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Resolve the config file path, if any.
///
/// Order: explicit path, `YAREVIEWS_CONFIG`, `./.yareviews/config.json`,
/// `~/.yareviews/config.json`.
pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(path));
    }

    if let Ok(env_path) = std::env::var("YAREVIEWS_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    let cwd_config = PathBuf::from(".yareviews/config.json");
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    dirs::home_dir()
        .map(|home| home.join(".yareviews").join("config.json"))
        .filter(|p| p.exists())
}

/// Load the effective configuration: file (when one resolves), then env overrides.
pub fn resolve_config(explicit: Option<&str>) -> HarvestResult<HarvestConfig> {
    let mut config = match resolve_config_path(explicit) {
        Some(path) => {
            tracing::debug!("Loading config from {}", path.display());
            HarvestConfig::from_file(&path)?
        }
        None => HarvestConfig::default(),
    };
    config.apply_env();
    Ok(config)
}
