//! One open organization page and the operations that read it.
//!
//! A [`PageSession`] owns its tab exclusively. Clicks, scrolls and log drains
//! are ordered only by the call sequence on that session.

pub mod correlator;
pub mod extractor;
pub mod loader;
pub mod log_reader;
pub mod sort;

use crate::config::HarvestConfig;
use crate::renderer::{NavigationResult, RenderContext};
use crate::types::{CompanyInfo, ExtractionResult, ParseMode, ReviewRecord, SortMode};
use correlator::NetworkCorrelator;
use extractor::RecordExtractor;
use loader::IncrementalLoader;
use sort::SortSelector;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub use loader::{LoadReport, LoadStop};
pub use log_reader::LogEvent;
pub use sort::SortOutcome;

pub struct PageSession {
    ctx: Box<dyn RenderContext>,
    config: Arc<HarvestConfig>,
    correlator: NetworkCorrelator,
}

impl PageSession {
    /// Wrap an already created tab.
    pub fn new(ctx: Box<dyn RenderContext>, config: Arc<HarvestConfig>) -> Self {
        let correlator = NetworkCorrelator::new(&config);
        Self {
            ctx,
            config,
            correlator,
        }
    }

    pub async fn navigate(&mut self, url: &str) -> anyhow::Result<NavigationResult> {
        let result = self
            .ctx
            .navigate(url, self.config.navigation_timeout_ms)
            .await?;
        debug!(url = %result.final_url, load_time_ms = result.load_time_ms, "page loaded");
        Ok(result)
    }

    /// An organization page renders its header; anything else does not.
    pub async fn is_valid_page(&self) -> bool {
        matches!(
            self.ctx.query_one(None, &self.config.selectors.org_header).await,
            Ok(Some(_))
        )
    }

    pub async fn get_company_info(&self) -> ExtractionResult {
        if !self.is_valid_page().await {
            return ExtractionResult::page_not_found();
        }
        ExtractionResult::Success {
            company_info: Some(self.read_company().await),
            reviews: None,
        }
    }

    pub async fn get_reviews(&self, sort: Option<SortMode>, limit: Option<usize>) -> ExtractionResult {
        if !self.is_valid_page().await {
            return ExtractionResult::page_not_found();
        }
        ExtractionResult::Success {
            company_info: None,
            reviews: Some(self.collect_reviews(sort, limit).await),
        }
    }

    pub async fn get_both(&self, sort: Option<SortMode>, limit: Option<usize>) -> ExtractionResult {
        if !self.is_valid_page().await {
            return ExtractionResult::page_not_found();
        }
        let company_info = self.read_company().await;
        let reviews = self.collect_reviews(sort, limit).await;
        ExtractionResult::Success {
            company_info: Some(company_info),
            reviews: Some(reviews),
        }
    }

    pub async fn extract(
        &self,
        mode: ParseMode,
        sort: Option<SortMode>,
        limit: Option<usize>,
    ) -> ExtractionResult {
        match mode {
            ParseMode::All => self.get_both(sort, limit).await,
            ParseMode::Company => self.get_company_info().await,
            ParseMode::Reviews => self.get_reviews(sort, limit).await,
        }
    }

    /// Switch the review order. Best-effort.
    pub async fn apply_sort(&self, mode: Option<SortMode>) -> SortOutcome {
        SortSelector::new(self.ctx.as_ref(), &self.config)
            .apply(mode)
            .await
    }

    /// Scroll until `target` cards are rendered, or until the list stops
    /// growing when `target` is `None`.
    pub async fn expand(&self, target: Option<usize>) -> LoadReport {
        IncrementalLoader::new(
            self.ctx.as_ref(),
            &self.config.selectors.review_card,
            self.config.scroll_settle(),
        )
        .max_rounds(self.config.max_scroll_rounds)
        .expand(target)
        .await
    }

    /// Business id carried by the page's review fetch, if one is observed
    /// within `timeout`.
    pub async fn resolve_business_id(
        &mut self,
        timeout: Duration,
        expected: Option<&str>,
    ) -> Option<String> {
        self.correlator
            .resolve_business_id(self.ctx.as_ref(), timeout, expected)
            .await
    }

    pub async fn close(self) -> anyhow::Result<()> {
        self.ctx.close().await
    }

    async fn read_company(&self) -> CompanyInfo {
        RecordExtractor::new(self.ctx.as_ref(), &self.config.selectors)
            .company_info()
            .await
    }

    async fn collect_reviews(&self, sort: Option<SortMode>, limit: Option<usize>) -> Vec<ReviewRecord> {
        let limit = limit.filter(|&n| n > 0);

        self.apply_sort(sort).await;
        self.expand(limit).await;

        let mut cards = match self
            .ctx
            .query_all(None, &self.config.selectors.review_card)
            .await
        {
            Ok(cards) => cards,
            Err(e) => {
                debug!("review card query failed: {e}");
                Vec::new()
            }
        };
        if let Some(limit) = limit {
            cards.truncate(limit);
        }

        let extractor = RecordExtractor::new(self.ctx.as_ref(), &self.config.selectors);
        let mut reviews = Vec::with_capacity(cards.len());
        for card in &cards {
            reviews.push(extractor.extract(card).await);
        }
        info!(count = reviews.len(), "reviews extracted");
        reviews
    }
}
