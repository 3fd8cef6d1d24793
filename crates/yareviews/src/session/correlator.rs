//! Business id recovery from intercepted review-fetch traffic.
//!
//! The id never appears in the rendered markup. The page fetches its reviews
//! from a background endpoint whose query string carries `businessId=<digits>`,
//! so the id is read off the response events in the performance log.

use super::log_reader::{self, LogEvent};
use crate::config::HarvestConfig;
use crate::helpers::business_id_from_url;
use crate::poll::{Poll, PollOutcome, Probe, Step};
use crate::renderer::RenderContext;
use crate::types::FetchCorrelation;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

const RESPONSE_RECEIVED: &str = "Network.responseReceived";

/// Watches the log for the review-fetch request and keeps the latest match.
#[derive(Debug, Clone)]
pub struct NetworkCorrelator {
    fetch_marker: String,
    business_id_key: String,
    interval: Duration,
    /// Single slot, replaced on every qualifying event.
    cache: Option<FetchCorrelation>,
}

impl NetworkCorrelator {
    pub fn new(config: &HarvestConfig) -> Self {
        Self {
            fetch_marker: config.fetch_marker.clone(),
            business_id_key: config.business_id_key.clone(),
            interval: config.log_poll_interval(),
            cache: None,
        }
    }

    pub(crate) fn cached(&self) -> Option<&FetchCorrelation> {
        self.cache.as_ref()
    }

    /// Business id of the most recent qualifying review fetch, polling the log
    /// until `timeout` elapses. With `expected` set, only events carrying that
    /// id qualify.
    pub async fn resolve_business_id(
        &mut self,
        ctx: &dyn RenderContext,
        timeout: Duration,
        expected: Option<&str>,
    ) -> Option<String> {
        if let Some(hit) = &self.cache {
            if satisfies(hit, expected) {
                return hit.business_id.clone();
            }
            debug!(cached = ?hit.business_id, ?expected, "cached review fetch does not match");
            self.cache = None;
        }

        let poll = Poll::deadline(timeout, self.interval);
        let mut probe = CorrelationProbe {
            ctx,
            correlator: self,
            expected,
        };
        match poll.run(&mut probe).await {
            PollOutcome::Done { value, rounds } => {
                info!(business_id = ?value, rounds, "review fetch correlated");
                value
            }
            outcome => {
                debug!(rounds = outcome.rounds(), "no review fetch observed before deadline");
                None
            }
        }
    }

    /// Match one event against the review-fetch pattern.
    fn qualify(&self, event: &LogEvent, expected: Option<&str>) -> Option<FetchCorrelation> {
        if event.method != RESPONSE_RECEIVED {
            return None;
        }
        let url = event.response_field("url")?.as_str()?;
        if !url.contains(&self.fetch_marker) {
            return None;
        }
        if event.response_field("status")?.as_i64()? != 200 {
            return None;
        }

        let business_id = business_id_from_url(url, &self.business_id_key);
        if let Some(want) = expected {
            if business_id.as_deref() != Some(want) {
                return None;
            }
        }

        let request_id = event
            .params
            .get("requestId")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        Some(FetchCorrelation {
            business_id,
            source_url: url.to_string(),
            request_id,
        })
    }

    /// Fold a drained batch into the cache. Returns whether anything matched.
    fn absorb(&mut self, events: &[LogEvent], expected: Option<&str>) -> bool {
        let mut matched = false;
        for event in events {
            if let Some(hit) = self.qualify(event, expected) {
                debug!(url = %hit.source_url, request_id = %hit.request_id, "qualifying review fetch");
                self.cache = Some(hit);
                matched = true;
            }
        }
        matched
    }
}

struct CorrelationProbe<'a> {
    ctx: &'a dyn RenderContext,
    correlator: &'a mut NetworkCorrelator,
    expected: Option<&'a str>,
}

#[async_trait]
impl Probe for CorrelationProbe<'_> {
    type Output = Option<String>;

    async fn probe(&mut self, _attempt: u32) -> Step<Option<String>> {
        let events = log_reader::drain(self.ctx).await;
        self.correlator.absorb(&events, self.expected);
        match self.correlator.cached() {
            Some(hit) if satisfies(hit, self.expected) => Step::Done(hit.business_id.clone()),
            _ => Step::Retry,
        }
    }
}

fn satisfies(hit: &FetchCorrelation, expected: Option<&str>) -> bool {
    expected.is_none() || hit.business_id.as_deref() == expected
}
