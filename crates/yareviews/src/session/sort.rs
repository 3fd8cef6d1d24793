//! Sort order selection through the ranking popup.
//!
//! Two bounded polls: find and click the ranking control, then find and click
//! the popup line carrying the wanted label. Nothing here fails the caller;
//! the outcome is reported for diagnostics only.

use crate::config::HarvestConfig;
use crate::poll::{Poll, PollOutcome, Probe, Step};
use crate::renderer::{NodeRef, RenderContext};
use crate::selectors::SelectorTable;
use crate::types::SortMode;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortOutcome {
    Applied(SortMode),
    /// No sort requested.
    Skipped,
    ControlNotFound,
    /// The popup never showed the wanted label.
    OptionNotFound { visible_lines: usize },
    /// A click or scroll on a located element failed.
    InteractionFailed(String),
}

impl SortOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, SortOutcome::Applied(_))
    }
}

pub struct SortSelector<'a> {
    ctx: &'a dyn RenderContext,
    selectors: &'a SelectorTable,
    attempts: u32,
    interval: Duration,
    open_wait: Duration,
    select_wait: Duration,
}

impl<'a> SortSelector<'a> {
    pub fn new(ctx: &'a dyn RenderContext, config: &'a HarvestConfig) -> Self {
        Self {
            ctx,
            selectors: &config.selectors,
            attempts: config.sort_attempts,
            interval: config.sort_poll_interval(),
            open_wait: config.sort_open_wait(),
            select_wait: config.sort_select_wait(),
        }
    }

    pub async fn apply(&self, mode: Option<SortMode>) -> SortOutcome {
        let Some(mode) = mode else {
            return SortOutcome::Skipped;
        };

        let outcome = self.apply_mode(mode).await;
        match &outcome {
            SortOutcome::Applied(mode) => info!(%mode, "sort applied"),
            SortOutcome::ControlNotFound => warn!(%mode, "sort control not found"),
            SortOutcome::OptionNotFound { visible_lines } => {
                warn!(%mode, visible_lines, "sort option not found among visible popup lines")
            }
            SortOutcome::InteractionFailed(reason) => warn!(%mode, "sort interaction failed: {reason}"),
            SortOutcome::Skipped => {}
        }
        outcome
    }

    async fn apply_mode(&self, mode: SortMode) -> SortOutcome {
        let mut open = VisibleControl {
            ctx: self.ctx,
            selector: &self.selectors.sort_control,
        };
        let control = match Poll::attempts(self.attempts, self.interval)
            .run(&mut open)
            .await
        {
            PollOutcome::Done { value, rounds } => {
                debug!(rounds, "sort control visible");
                value
            }
            _ => return SortOutcome::ControlNotFound,
        };
        if let Err(reason) = self.activate(&control).await {
            return SortOutcome::InteractionFailed(reason);
        }
        tokio::time::sleep(self.open_wait).await;

        let mut select = LabeledLine {
            ctx: self.ctx,
            selector: &self.selectors.sort_popup_line,
            label: mode.label(),
            visible_seen: 0,
        };
        let line = match Poll::attempts(self.attempts, self.interval)
            .run(&mut select)
            .await
        {
            PollOutcome::Done { value, .. } => value,
            _ => {
                return SortOutcome::OptionNotFound {
                    visible_lines: select.visible_seen,
                }
            }
        };
        if let Err(reason) = self.activate(&line).await {
            return SortOutcome::InteractionFailed(reason);
        }
        tokio::time::sleep(self.select_wait).await;

        SortOutcome::Applied(mode)
    }

    async fn activate(&self, node: &NodeRef) -> Result<(), String> {
        self.ctx
            .scroll_into_view(node)
            .await
            .map_err(|e| format!("scroll failed: {e}"))?;
        self.ctx
            .click(node)
            .await
            .map_err(|e| format!("click failed: {e}"))
    }
}

/// Visible elements matching `selector`, in document order.
async fn visible_nodes(ctx: &dyn RenderContext, selector: &str) -> Vec<NodeRef> {
    let nodes = match ctx.query_all(None, selector).await {
        Ok(nodes) => nodes,
        Err(e) => {
            debug!("query {selector} failed: {e}");
            return Vec::new();
        }
    };
    let mut visible = Vec::with_capacity(nodes.len());
    for node in nodes {
        if ctx.is_visible(&node).await.unwrap_or(false) {
            visible.push(node);
        }
    }
    visible
}

struct VisibleControl<'a> {
    ctx: &'a dyn RenderContext,
    selector: &'a str,
}

#[async_trait]
impl Probe for VisibleControl<'_> {
    type Output = NodeRef;

    async fn probe(&mut self, attempt: u32) -> Step<NodeRef> {
        match visible_nodes(self.ctx, self.selector).await.into_iter().next() {
            Some(node) => Step::Done(node),
            None => {
                debug!(attempt, "sort control not visible yet");
                Step::Retry
            }
        }
    }
}

struct LabeledLine<'a> {
    ctx: &'a dyn RenderContext,
    selector: &'a str,
    label: &'static str,
    /// Visible lines seen on the latest attempt.
    visible_seen: usize,
}

impl LabeledLine<'_> {
    async fn matches(&self, node: &NodeRef) -> bool {
        let aria = self.ctx.attribute(node, "aria-label").await.ok().flatten();
        if aria.as_deref().map(str::trim) == Some(self.label) {
            return true;
        }
        let text = self.ctx.text(node).await.ok().flatten();
        text.as_deref().map(str::trim) == Some(self.label)
    }
}

#[async_trait]
impl Probe for LabeledLine<'_> {
    type Output = NodeRef;

    async fn probe(&mut self, attempt: u32) -> Step<NodeRef> {
        let lines = visible_nodes(self.ctx, self.selector).await;
        self.visible_seen = lines.len();
        for line in lines {
            if self.matches(&line).await {
                return Step::Done(line);
            }
        }
        debug!(attempt, visible = self.visible_seen, label = self.label, "sort option not visible yet");
        Step::Retry
    }
}
