//! Batch posting with randomized pacing
//!
//! Requests are posted strictly in order. Between two consecutive requests
//! the runner waits a whole number of seconds drawn uniformly from the
//! configured range; no wait follows the last request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{ConfigError, Result};
use crate::poster::PostingClient;
use crate::types::{Event, PostRequest};

/// Inclusive range of whole seconds to wait between posts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    min: u64,
    max: u64,
}

impl DelayRange {
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidDelay` when `min > max`.
    pub fn new(min: u64, max: u64) -> Result<Self> {
        if min > max {
            return Err(ConfigError::InvalidDelay { min, max }.into());
        }
        Ok(Self { min, max })
    }

    /// `[floor, floor + spread]`
    pub fn from_floor(floor: u64, spread: u64) -> Self {
        Self {
            min: floor,
            max: floor.saturating_add(spread),
        }
    }

    /// No waiting at all
    pub fn none() -> Self {
        Self { min: 0, max: 0 }
    }

    pub fn min(&self) -> u64 {
        self.min
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    /// Draw one delay uniformly from the range
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        Duration::from_secs(rng.gen_range(self.min..=self.max))
    }
}

impl std::fmt::Display for DelayRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}s", self.min, self.max)
    }
}

/// How the runner waits between posts
#[async_trait]
pub trait Pause: Send + Sync {
    /// Wait for `duration`, returning early once `shutdown` is set
    async fn pause(&self, duration: Duration, shutdown: Option<&AtomicBool>);
}

/// Real wall-clock wait, checking the shutdown flag every second
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPause;

#[async_trait]
impl Pause for TokioPause {
    async fn pause(&self, duration: Duration, shutdown: Option<&AtomicBool>) {
        let mut remaining = duration;
        while !remaining.is_zero() {
            if shutdown.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                return;
            }
            let step = remaining.min(Duration::from_secs(1));
            sleep(step).await;
            remaining -= step;
        }
    }
}

/// Records requested waits instead of sleeping
#[derive(Debug, Clone, Default)]
pub struct RecordingPause {
    waits: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingPause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every wait requested so far, in order
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Pause for RecordingPause {
    async fn pause(&self, duration: Duration, _shutdown: Option<&AtomicBool>) {
        self.waits.lock().unwrap().push(duration);
    }
}

/// Posts a list of requests one after another
pub struct BatchRunner<P: Pause = TokioPause> {
    delay: DelayRange,
    pause: P,
    shutdown: Option<Arc<AtomicBool>>,
}

impl BatchRunner<TokioPause> {
    pub fn new(delay: DelayRange) -> Self {
        Self {
            delay,
            pause: TokioPause,
            shutdown: None,
        }
    }
}

impl<P: Pause> BatchRunner<P> {
    /// Replace the wait strategy
    pub fn with_pause<Q: Pause>(self, pause: Q) -> BatchRunner<Q> {
        BatchRunner {
            delay: self.delay,
            pause,
            shutdown: self.shutdown,
        }
    }

    /// Stop before the next request once `flag` is set
    pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(flag);
        self
    }

    pub fn delay(&self) -> DelayRange {
        self.delay
    }

    fn interrupted(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Post every request in order through `client`
    ///
    /// Returns one event per processed request, in input order. Every event
    /// is also retained by `client`. If the shutdown flag is raised the
    /// remaining requests are skipped.
    pub async fn run(&self, client: &mut PostingClient, requests: &[PostRequest]) -> Vec<Event> {
        let mut results = Vec::with_capacity(requests.len());

        for (index, request) in requests.iter().enumerate() {
            if self.interrupted() {
                warn!(
                    "Batch interrupted; skipping {} remaining post(s)",
                    requests.len() - index
                );
                break;
            }

            info!(
                "Posting {}/{} to r/{}",
                index + 1,
                requests.len(),
                request.community
            );
            results.push(client.post_request(request).await);

            if index + 1 < requests.len() {
                let wait = self.delay.draw(&mut rand::thread_rng());
                info!("Waiting {} seconds before next post...", wait.as_secs());
                self.pause.pause(wait, self.shutdown.as_deref()).await;
            }
        }

        results
    }
}

/// Post `requests` in order with a random wait drawn from `delay` between them
pub async fn batch_post(
    client: &mut PostingClient,
    requests: &[PostRequest],
    delay: DelayRange,
) -> Vec<Event> {
    BatchRunner::new(delay).run(client, requests).await
}
