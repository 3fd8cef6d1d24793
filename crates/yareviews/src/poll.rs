//! Retryable poll loop shared by every wait in a page session.
//!
//! Three bound kinds coexist:
//! - `Deadline`: wall-clock limit, used for the network log.
//! - `Attempts`: fixed number of probes, used for popup interaction.
//! - `Plateau`: stop when an observed count stops changing, used for
//!   scroll-triggered loading. Without `max_rounds` this loop has no upper
//!   bound; a list that keeps growing keeps it running.
//!
//! Sleeping and deadlines go through `tokio::time`, so tests run them on a
//! paused clock.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

/// How a poll loop is bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollBound {
    Deadline(Duration),
    Attempts(u32),
    Plateau { max_rounds: Option<u32> },
}

/// What a single probe saw.
#[derive(Debug, Clone, PartialEq)]
pub enum Step<T> {
    /// Condition satisfied, stop with this value.
    Done(T),
    /// Nothing yet, try again.
    Retry,
    /// A monotone measurement, compared across rounds by `Plateau` bounds.
    /// Treated as `Retry` by the other bounds.
    Observed(usize),
}

/// Final state of a poll loop.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome<T> {
    Done { value: T, rounds: u32 },
    /// Deadline passed or attempts used up.
    Exhausted { rounds: u32 },
    /// Two consecutive observations were equal.
    Plateau { observed: usize, rounds: u32 },
    /// `max_rounds` reached while the observation was still changing.
    Capped { observed: usize, rounds: u32 },
}

impl<T> PollOutcome<T> {
    pub fn rounds(&self) -> u32 {
        match self {
            PollOutcome::Done { rounds, .. }
            | PollOutcome::Exhausted { rounds }
            | PollOutcome::Plateau { rounds, .. }
            | PollOutcome::Capped { rounds, .. } => *rounds,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            PollOutcome::Done { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// One round of work inside a poll loop.
#[async_trait]
pub trait Probe: Send {
    type Output: Send;

    /// Inspect the current state. `attempt` starts at 0.
    async fn probe(&mut self, attempt: u32) -> Step<Self::Output>;

    /// Runs after a non-final round, before the sleep. Used to trigger the
    /// next increment of work (e.g. a scroll).
    async fn advance(&mut self) {}
}

/// A configured poll loop.
#[derive(Debug, Clone, Copy)]
pub struct Poll {
    bound: PollBound,
    interval: Duration,
}

impl Poll {
    pub fn new(bound: PollBound, interval: Duration) -> Self {
        Self { bound, interval }
    }

    pub fn deadline(timeout: Duration, interval: Duration) -> Self {
        Self::new(PollBound::Deadline(timeout), interval)
    }

    pub fn attempts(count: u32, interval: Duration) -> Self {
        Self::new(PollBound::Attempts(count), interval)
    }

    pub fn plateau(settle: Duration, max_rounds: Option<u32>) -> Self {
        Self::new(PollBound::Plateau { max_rounds }, settle)
    }

    /// Drive `probe` until its condition holds or the bound is hit.
    pub async fn run<P: Probe>(&self, probe: &mut P) -> PollOutcome<P::Output> {
        match self.bound {
            PollBound::Deadline(timeout) => self.run_deadline(probe, timeout).await,
            PollBound::Attempts(count) => self.run_attempts(probe, count).await,
            PollBound::Plateau { max_rounds } => self.run_plateau(probe, max_rounds).await,
        }
    }

    async fn run_deadline<P: Probe>(
        &self,
        probe: &mut P,
        timeout: Duration,
    ) -> PollOutcome<P::Output> {
        let deadline = Instant::now() + timeout;
        let mut rounds = 0;
        loop {
            let step = probe.probe(rounds).await;
            rounds += 1;
            if let Step::Done(value) = step {
                return PollOutcome::Done { value, rounds };
            }
            let now = Instant::now();
            if now >= deadline {
                return PollOutcome::Exhausted { rounds };
            }
            probe.advance().await;
            // The last sleep is cut short so the final round lands on the deadline.
            tokio::time::sleep_until((now + self.interval).min(deadline)).await;
        }
    }

    async fn run_attempts<P: Probe>(&self, probe: &mut P, count: u32) -> PollOutcome<P::Output> {
        for attempt in 0..count {
            if let Step::Done(value) = probe.probe(attempt).await {
                return PollOutcome::Done {
                    value,
                    rounds: attempt + 1,
                };
            }
            if attempt + 1 < count {
                probe.advance().await;
                tokio::time::sleep(self.interval).await;
            }
        }
        PollOutcome::Exhausted { rounds: count }
    }

    async fn run_plateau<P: Probe>(
        &self,
        probe: &mut P,
        max_rounds: Option<u32>,
    ) -> PollOutcome<P::Output> {
        let mut previous = 0usize;
        let mut rounds = 0u32;
        loop {
            let step = probe.probe(rounds).await;
            rounds += 1;
            match step {
                Step::Done(value) => return PollOutcome::Done { value, rounds },
                Step::Observed(observed) if observed == previous => {
                    return PollOutcome::Plateau { observed, rounds };
                }
                Step::Observed(observed) => previous = observed,
                Step::Retry => {}
            }
            if max_rounds.is_some_and(|max| rounds >= max) {
                return PollOutcome::Capped {
                    observed: previous,
                    rounds,
                };
            }
            probe.advance().await;
            tokio::time::sleep(self.interval).await;
        }
    }
}
