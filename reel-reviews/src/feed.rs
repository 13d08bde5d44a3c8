//! Live review feed
//!
//! A subscription keeps one background task attached to the review relation's
//! change channel. On every change the task reads the whole relation again,
//! newest first, wraps each review in a [`FeedEntry`] with overlay
//! coordinates and hands the full list to the consumer callback. Consumers
//! always receive complete lists, never diffs.
//!
//! If the change channel lags or closes the task re-subscribes as needed and
//! re-materializes, so the consumer still converges on the stored state.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reel_common::config::{FeedConfig, FeedPlacement};
use reel_common::{Review, ReviewId};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::SubscriptionError;
use crate::relation::ReviewRelation;

const MIN_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// A review positioned on the scrolling overlay
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedEntry {
    pub review: Review,
    /// Pixels from the top, in `[0, viewport_height)`
    pub vertical_offset: f64,
    /// Seconds before the entry starts scrolling, in `[0, max_start_delay)`
    pub start_delay_secs: f64,
}

/// Overlay geometry and placement policy
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSettings {
    pub viewport_height: f64,
    pub max_start_delay_secs: f64,
    pub placement: FeedPlacement,
}

impl From<&FeedConfig> for FeedSettings {
    fn from(config: &FeedConfig) -> Self {
        Self {
            viewport_height: config.viewport_height,
            max_start_delay_secs: config.max_start_delay_secs,
            placement: config.placement,
        }
    }
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self::from(&FeedConfig::default())
    }
}

type Callback = Box<dyn FnMut(Vec<FeedEntry>) + Send>;

/// Opens feed subscriptions against a review relation
#[derive(Clone)]
pub struct LiveFeedSubscriber {
    relation: Arc<dyn ReviewRelation>,
    settings: FeedSettings,
    seed: Option<u64>,
}

impl LiveFeedSubscriber {
    pub fn new(relation: Arc<dyn ReviewRelation>, settings: FeedSettings) -> Self {
        Self { relation, settings, seed: None }
    }

    /// Deterministic placement for tests
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Start delivering full feed lists to `on_update`
    ///
    /// The first call happens once the current contents are read. Must be
    /// called inside a tokio runtime. The callback must not cancel its own
    /// subscription.
    pub fn subscribe<F>(&self, on_update: F) -> FeedSubscription
    where
        F: FnMut(Vec<FeedEntry>) + Send + 'static,
    {
        let callback: Arc<Mutex<Option<Callback>>> = Arc::new(Mutex::new(Some(Box::new(on_update))));
        let token = CancellationToken::new();
        let refresh = Arc::new(Notify::new());

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let worker = FeedWorker {
            relation: self.relation.clone(),
            placer: Placer::new(self.settings.clone(), rng),
            callback: callback.clone(),
            token: token.clone(),
            refresh: refresh.clone(),
        };
        tokio::spawn(worker.run());

        info!(placement = ?self.settings.placement, "Live feed subscription opened");
        FeedSubscription { callback, token, refresh }
    }
}

/// Handle to a running feed subscription
///
/// Dropping the handle cancels the subscription.
pub struct FeedSubscription {
    callback: Arc<Mutex<Option<Callback>>>,
    token: CancellationToken,
    refresh: Arc<Notify>,
}

impl FeedSubscription {
    /// Detach from the relation
    ///
    /// When this returns no further callback invocation will start. An
    /// invocation already running finishes first.
    pub fn cancel(&self) {
        if self.token.is_cancelled() {
            return;
        }
        self.token.cancel();
        lock_callback(&self.callback).take();
        debug!("Live feed subscription cancelled");
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Force a re-read without waiting for a change
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn lock_callback(callback: &Mutex<Option<Callback>>) -> MutexGuard<'_, Option<Callback>> {
    // A panicking consumer poisons the lock; the slot is still usable
    callback.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct FeedWorker {
    relation: Arc<dyn ReviewRelation>,
    placer: Placer,
    callback: Arc<Mutex<Option<Callback>>>,
    token: CancellationToken,
    refresh: Arc<Notify>,
}

impl FeedWorker {
    async fn run(mut self) {
        // Subscribe before the first read so no write falls in between
        let mut rx = self.relation.watch();
        self.materialize().await;

        let mut backoff = MIN_BACKOFF;
        loop {
            tokio::select! {
                _ = self.token.cancelled() => break,
                _ = self.refresh.notified() => {
                    debug!("Manual feed refresh");
                    self.materialize().await;
                }
                received = rx.recv() => match received {
                    Ok(event) => {
                        debug!(event = event.event_type(), review_id = %event.review_id(), "Feed change notification");
                        backoff = MIN_BACKOFF;
                        self.materialize().await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        let err = SubscriptionError::Lagged(skipped);
                        warn!(error = %err, "Feed resynchronizing from full list");
                        self.materialize().await;
                    }
                    Err(RecvError::Closed) => {
                        let err = SubscriptionError::Closed;
                        warn!(error = %err, backoff_ms = backoff.as_millis() as u64, "Feed re-subscribing");
                        tokio::select! {
                            _ = self.token.cancelled() => break,
                            _ = tokio::time::sleep(backoff) => {}
                        }
                        backoff = (backoff * 2).min(MAX_BACKOFF);
                        rx = self.relation.watch();
                        self.materialize().await;
                    }
                }
            }
        }

        debug!("Live feed worker stopped");
    }

    /// Read the full relation and deliver it, retrying failed reads until one
    /// succeeds or the subscription is cancelled
    async fn materialize(&mut self) {
        let mut backoff = MIN_BACKOFF;
        let reviews = loop {
            match self.relation.list_all().await {
                Ok(reviews) => break reviews,
                Err(e) => {
                    warn!(error = %e, backoff_ms = backoff.as_millis() as u64, "Feed re-materialization failed, retrying");
                    tokio::select! {
                        _ = self.token.cancelled() => return,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        };

        let entries = self.placer.place(reviews);
        if self.token.is_cancelled() {
            return;
        }

        let mut slot = lock_callback(&self.callback);
        if let Some(on_update) = slot.as_mut() {
            debug!(entries = entries.len(), "Delivering feed update");
            on_update(entries);
        }
    }
}

/// Assigns overlay coordinates according to the placement policy
struct Placer {
    settings: FeedSettings,
    rng: StdRng,
    /// Sticky placement only: coordinates per review, never reassigned
    assigned: HashMap<ReviewId, (f64, f64)>,
}

impl Placer {
    fn new(settings: FeedSettings, rng: StdRng) -> Self {
        Self { settings, rng, assigned: HashMap::new() }
    }

    fn place(&mut self, reviews: Vec<Review>) -> Vec<FeedEntry> {
        if self.settings.placement == FeedPlacement::Sticky {
            // Deleted reviews never come back, so their slots can go
            let present: HashSet<ReviewId> = reviews.iter().map(|r| r.id).collect();
            self.assigned.retain(|id, _| present.contains(id));
        }

        reviews
            .into_iter()
            .map(|review| {
                let (vertical_offset, start_delay_secs) = match self.settings.placement {
                    FeedPlacement::Reshuffle => self.draw(),
                    FeedPlacement::Sticky => match self.assigned.get(&review.id) {
                        Some(coords) => *coords,
                        None => {
                            let coords = self.draw();
                            self.assigned.insert(review.id, coords);
                            coords
                        }
                    },
                };
                FeedEntry { review, vertical_offset, start_delay_secs }
            })
            .collect()
    }

    fn draw(&mut self) -> (f64, f64) {
        let offset = uniform(&mut self.rng, self.settings.viewport_height);
        let delay = uniform(&mut self.rng, self.settings.max_start_delay_secs);
        (offset, delay)
    }
}

/// Uniform draw from `[0, upper)`; a non-positive or non-finite bound yields 0
fn uniform(rng: &mut StdRng, upper: f64) -> f64 {
    if upper.is_finite() && upper > 0.0 {
        rng.gen_range(0.0..upper)
    } else {
        0.0
    }
}
