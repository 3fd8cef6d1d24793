//! Scroll-triggered expansion of the review list.

use crate::poll::{Poll, PollOutcome, Probe, Step};
use crate::renderer::{NodeRef, RenderContext};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How an expansion ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStop {
    /// `target` cards were present.
    Target,
    /// The card count did not change across one settle interval.
    Plateau,
    /// `max_rounds` ran out while the list was still growing.
    Capped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub count: usize,
    pub rounds: u32,
    pub stop: LoadStop,
}

/// Scrolls the last card into view until enough cards are rendered or the
/// count stops growing.
pub struct IncrementalLoader<'a> {
    ctx: &'a dyn RenderContext,
    card_selector: &'a str,
    settle: Duration,
    max_rounds: Option<u32>,
}

impl<'a> IncrementalLoader<'a> {
    pub fn new(ctx: &'a dyn RenderContext, card_selector: &'a str, settle: Duration) -> Self {
        Self {
            ctx,
            card_selector,
            settle,
            max_rounds: None,
        }
    }

    /// Stop after this many rounds even if the list is still growing.
    pub fn max_rounds(mut self, max_rounds: Option<u32>) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Expand until `target` cards exist, or until the list plateaus when
    /// `target` is `None`.
    pub async fn expand(&self, target: Option<usize>) -> LoadReport {
        let mut probe = ExpandProbe {
            ctx: self.ctx,
            selector: self.card_selector,
            target,
            last: None,
        };
        let report = match Poll::plateau(self.settle, self.max_rounds)
            .run(&mut probe)
            .await
        {
            PollOutcome::Done { value, rounds } => LoadReport {
                count: value,
                rounds,
                stop: LoadStop::Target,
            },
            PollOutcome::Plateau { observed, rounds } => LoadReport {
                count: observed,
                rounds,
                stop: LoadStop::Plateau,
            },
            PollOutcome::Capped { observed, rounds } => {
                warn!(observed, rounds, "review list still growing at scroll cap");
                LoadReport {
                    count: observed,
                    rounds,
                    stop: LoadStop::Capped,
                }
            }
            // Plateau polls never exhaust.
            PollOutcome::Exhausted { rounds } => LoadReport {
                count: 0,
                rounds,
                stop: LoadStop::Plateau,
            },
        };
        info!(count = report.count, rounds = report.rounds, stop = ?report.stop, "review list expanded");
        report
    }
}

struct ExpandProbe<'a> {
    ctx: &'a dyn RenderContext,
    selector: &'a str,
    target: Option<usize>,
    last: Option<NodeRef>,
}

#[async_trait]
impl Probe for ExpandProbe<'_> {
    type Output = usize;

    async fn probe(&mut self, attempt: u32) -> Step<usize> {
        let cards = match self.ctx.query_all(None, self.selector).await {
            Ok(cards) => cards,
            Err(e) => {
                debug!("card query failed: {e}");
                Vec::new()
            }
        };
        let count = cards.len();
        debug!(attempt, count, "review cards rendered");

        if self.target.is_some_and(|target| count >= target) {
            return Step::Done(count);
        }
        self.last = cards.into_iter().last();
        Step::Observed(count)
    }

    async fn advance(&mut self) {
        if let Some(last) = &self.last {
            if let Err(e) = self.ctx.scroll_into_view(last).await {
                debug!("scroll to last card failed: {e}");
            }
        }
    }
}
