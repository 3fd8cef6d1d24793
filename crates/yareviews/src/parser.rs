//! Top-level entry points: open an organization page, resolve an id from a
//! link, or run a whole extraction and tear the tab down.

use crate::config::HarvestConfig;
use crate::error::{HarvestError, HarvestResult};
use crate::renderer::Renderer;
use crate::session::PageSession;
use crate::types::{ExtractionResult, ParseMode, SortMode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct ReviewParser {
    renderer: Arc<dyn Renderer>,
    config: Arc<HarvestConfig>,
}

impl ReviewParser {
    pub fn new(renderer: Arc<dyn Renderer>, config: HarvestConfig) -> Self {
        Self {
            renderer,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Open the review page of organization `id`.
    pub async fn open(&self, id: u64) -> HarvestResult<PageSession> {
        self.open_url(&self.config.page_url(id)).await
    }

    /// Open an arbitrary URL and let it settle.
    pub async fn open_url(&self, url: &str) -> HarvestResult<PageSession> {
        let ctx = self
            .renderer
            .new_context()
            .await
            .map_err(|e| HarvestError::BrowserUnavailable(format!("{e:#}")))?;
        let mut session = PageSession::new(ctx, Arc::clone(&self.config));

        if let Err(e) = session.navigate(url).await {
            close_quietly(session).await;
            return Err(HarvestError::Navigation {
                url: url.to_string(),
                reason: format!("{e:#}"),
            });
        }

        tokio::time::sleep(self.config.page_settle()).await;
        info!(%url, "page opened");
        Ok(session)
    }

    /// Navigate to `url` and recover the business id from the page's review
    /// fetch. `None` when no fetch is seen within `timeout`.
    pub async fn resolve_id(&self, url: &str, timeout: Option<Duration>) -> HarvestResult<Option<u64>> {
        let timeout = timeout.unwrap_or(Duration::from_millis(self.config.resolve_timeout_ms));
        let mut session = self.open_url(url).await?;
        let business_id = session.resolve_business_id(timeout, None).await;
        close_quietly(session).await;

        let id = business_id.and_then(|id| match id.parse::<u64>() {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(%id, "business id is not an integer: {e}");
                None
            }
        });
        info!(%url, ?id, "business id resolved");
        Ok(id)
    }

    /// Open organization `id`, extract what `mode` asks for, close the tab.
    pub async fn parse(
        &self,
        id: u64,
        mode: ParseMode,
        sort: Option<SortMode>,
        limit: Option<usize>,
    ) -> HarvestResult<ExtractionResult> {
        let session = self.open(id).await?;
        let result = session.extract(mode, sort, limit).await;
        close_quietly(session).await;
        Ok(result)
    }
}

async fn close_quietly(session: PageSession) {
    if let Err(e) = session.close().await {
        warn!("failed to close tab: {e:#}");
    }
}
