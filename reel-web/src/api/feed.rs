//! Server-Sent Events for the live review feed
//!
//! Each connected client owns one feed subscription. Every `feed` event
//! carries the complete list of entries; the subscription is cancelled when
//! the client disconnects and the stream is dropped. Lists are handed over
//! through a `watch` slot, so a client that reads slowly skips straight to
//! the newest list instead of queueing every intermediate one.

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use reel_reviews::{FeedEntry, FeedSubscription, LiveFeedSubscriber};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::AppState;

const HEARTBEAT: Duration = Duration::from_secs(15);

/// GET /api/feed
pub async fn feed_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to live feed");

    let (subscription, mut rx) = latest_feed(&state.feed);

    let stream = async_stream::stream! {
        // Held for the life of the stream; dropping it cancels the subscription
        let _subscription = subscription;

        loop {
            tokio::select! {
                _ = tokio::time::sleep(HEARTBEAT) => {
                    debug!("SSE: Sending heartbeat");
                    yield Ok(Event::default().comment("heartbeat"));
                }

                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let latest = rx.borrow_and_update().clone();
                    let Some(entries) = latest else { continue };
                    match Event::default().event("feed").json_data(&entries) {
                        Ok(event) => {
                            debug!(entries = entries.len(), "SSE: Sending feed update");
                            yield Ok(event);
                        }
                        Err(e) => warn!("SSE: Failed to serialize feed update: {}", e),
                    }
                }
            }
        }

        info!("Live feed SSE stream ended");
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(HEARTBEAT).text("keep-alive"))
}

/// Subscribe with a slot that only ever holds the newest full list
///
/// The receiver errors once the subscription is cancelled.
fn latest_feed(
    feed: &LiveFeedSubscriber,
) -> (FeedSubscription, watch::Receiver<Option<Vec<FeedEntry>>>) {
    let (tx, rx) = watch::channel(None);
    let subscription = feed.subscribe(move |entries| {
        tx.send_replace(Some(entries));
    });
    (subscription, rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_common::db::init_in_memory;
    use reel_common::events::EventBus;
    use reel_common::{MovieId, NewReview, Rating, UserId};
    use reel_reviews::{FeedSettings, ReviewRelation, SqliteReviewRelation};
    use std::sync::Arc;

    fn new_review(text: &str) -> NewReview {
        NewReview {
            subject_id: MovieId(238),
            author_id: UserId::new("alice"),
            text: text.to_string(),
            rating: Rating::new(4).unwrap(),
        }
    }

    async fn wait_for_len(rx: &mut watch::Receiver<Option<Vec<FeedEntry>>>, len: usize) {
        let reached = tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|latest| latest.as_ref().is_some_and(|entries| entries.len() == len)),
        )
        .await
        .expect("feed list within timeout");
        assert!(reached.is_ok());
    }

    #[tokio::test]
    async fn test_stalled_reader_keeps_only_newest_list() {
        let pool = init_in_memory().await.unwrap();
        let relation = Arc::new(SqliteReviewRelation::new(pool, EventBus::new(16)));
        let feed = LiveFeedSubscriber::new(relation.clone(), FeedSettings::default());

        let (_subscription, mut rx) = latest_feed(&feed);
        wait_for_len(&mut rx, 0).await;

        // Nobody reads while the writes land
        for n in 0..5 {
            relation.insert(new_review(&format!("review {}", n))).await.unwrap();
        }
        wait_for_len(&mut rx, 5).await;

        // One slot, holding the full newest list
        let latest = rx.borrow_and_update().clone().unwrap();
        assert_eq!(latest.len(), 5);
        assert_eq!(latest[0].review.text, "review 4");
    }

    #[tokio::test]
    async fn test_cancelled_subscription_closes_slot() {
        let pool = init_in_memory().await.unwrap();
        let relation = Arc::new(SqliteReviewRelation::new(pool, EventBus::new(16)));
        let feed = LiveFeedSubscriber::new(relation, FeedSettings::default());

        let (subscription, mut rx) = latest_feed(&feed);
        wait_for_len(&mut rx, 0).await;
        drop(subscription);

        let closed = tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .expect("slot closes within timeout");
        assert!(closed.is_err());
    }
}
