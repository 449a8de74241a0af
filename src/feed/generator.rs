//! Win feed generator
//!
//! Two independent timers drive the feed: production fabricates a new event
//! on a period drawn once, uniformly from the configured window, each time
//! production starts, and rotation advances the featured pointer on a fixed
//! period. Either can be started and
//! stopped on its own. The feed never touches the ledger.

use crate::config::FeedConfig;
use crate::errors::SpinDripResult;
use crate::feed::buffer::FeedBuffer;
use crate::feed::event::{WinEvent, WinEventFactory};
use crate::rng::SharedRandom;
use crate::scheduler::{spawn_periodic, TaskHandle, TickControl};
use chrono::Utc;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::future::ready;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

const LIVE_CHANNEL_CAPACITY: usize = 64;

/// Point-in-time view of the feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSnapshot {
    /// Newest first
    pub events: Vec<WinEvent>,
    pub featured: Option<WinEvent>,
    pub featured_index: usize,
}

/// Stream of feed events: the buffer oldest-first, then live events
pub type FeedStream = BoxStream<'static, WinEvent>;

struct FeedInner {
    config: FeedConfig,
    factory: WinEventFactory,
    rng: SharedRandom,
    buffer: Mutex<FeedBuffer>,
    live: broadcast::Sender<WinEvent>,
    production: AsyncMutex<Option<TaskHandle>>,
    rotation: AsyncMutex<Option<TaskHandle>>,
}

/// Synthetic "recent wins" feed
#[derive(Clone)]
pub struct WinFeed {
    inner: Arc<FeedInner>,
}

impl FeedInner {
    fn buffer(&self) -> MutexGuard<'_, FeedBuffer> {
        self.buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn produce(&self) -> WinEvent {
        let event = {
            let mut rng = self.rng.lock();
            self.factory.fabricate(&mut **rng, Utc::now())
        };
        let mut buffer = self.buffer();
        buffer.push(event.clone());
        // sent under the buffer lock so subscribers never see an event twice
        let _ = self.live.send(event.clone());
        debug!(
            "feed: {} won {} on {}{}",
            event.username,
            event.amount,
            event.game,
            if event.is_jackpot { " (jackpot)" } else { "" }
        );
        event
    }

    /// One uniform draw from the production window, in whole milliseconds
    fn production_period(&self) -> Duration {
        let span = self.config.max_interval_ms - self.config.min_interval_ms;
        let draw = self.rng.lock().next_f64();
        Duration::from_millis(self.config.min_interval_ms + (span as f64 * draw) as u64)
    }
}

impl WinFeed {
    /// Build a feed; catalog and range defects are rejected here
    pub fn new(config: FeedConfig, rng: SharedRandom) -> SpinDripResult<Self> {
        config.validate()?;
        let (live, _) = broadcast::channel(LIVE_CHANNEL_CAPACITY);
        Ok(Self {
            inner: Arc::new(FeedInner {
                factory: WinEventFactory::new(config.clone()),
                buffer: Mutex::new(FeedBuffer::new(config.capacity, config.featured_window)),
                config,
                rng,
                live,
                production: AsyncMutex::new(None),
                rotation: AsyncMutex::new(None),
            }),
        })
    }

    /// Fabricate one event immediately
    pub fn produce_one(&self) -> WinEvent {
        self.inner.produce()
    }

    /// Advance the featured pointer immediately
    pub fn rotate(&self) {
        self.inner.buffer().rotate();
    }

    /// Start event production; seeds the initial events into an empty buffer.
    ///
    /// No-op while already producing.
    pub async fn start_production(&self) {
        let mut production = self.inner.production.lock().await;
        if production.as_ref().map(TaskHandle::is_active).unwrap_or(false) {
            return;
        }

        if self.inner.buffer().is_empty() {
            for _ in 0..self.inner.config.initial_events {
                self.inner.produce();
            }
        }

        let period = self.inner.production_period();
        let weak = Arc::downgrade(&self.inner);
        *production = Some(spawn_periodic("feed-production", period, move || {
            ready(with_feed(&weak, |feed| {
                feed.produce();
            }))
        }));
        info!("win feed production started every {}ms", period.as_millis());
    }

    pub async fn stop_production(&self) {
        if let Some(task) = self.inner.production.lock().await.take() {
            task.cancel().await;
            info!("win feed production stopped");
        }
    }

    /// Start rotating the featured pointer. No-op while already rotating.
    pub async fn start_rotation(&self) {
        let mut rotation = self.inner.rotation.lock().await;
        if rotation.as_ref().map(TaskHandle::is_active).unwrap_or(false) {
            return;
        }

        let weak = Arc::downgrade(&self.inner);
        *rotation = Some(spawn_periodic(
            "feed-rotation",
            self.inner.config.rotation_interval(),
            move || ready(with_feed(&weak, |feed| feed.buffer().rotate())),
        ));
        debug!("win feed rotation started");
    }

    pub async fn stop_rotation(&self) {
        if let Some(task) = self.inner.rotation.lock().await.take() {
            task.cancel().await;
            debug!("win feed rotation stopped");
        }
    }

    /// Start production and rotation
    pub async fn start(&self) {
        self.start_production().await;
        self.start_rotation().await;
    }

    /// Cancel both timers; nothing fires after this returns
    pub async fn shutdown(&self) {
        self.stop_production().await;
        self.stop_rotation().await;
    }

    pub async fn is_producing(&self) -> bool {
        self.inner.production.lock().await.as_ref().map(TaskHandle::is_active).unwrap_or(false)
    }

    pub async fn is_rotating(&self) -> bool {
        self.inner.rotation.lock().await.as_ref().map(TaskHandle::is_active).unwrap_or(false)
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        let buffer = self.inner.buffer();
        FeedSnapshot {
            events: buffer.to_vec(),
            featured: buffer.featured().cloned(),
            featured_index: buffer.featured_index(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.buffer().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.buffer().is_empty()
    }

    /// Replay the buffered events oldest-first, then follow live production.
    ///
    /// Each call is an independent subscription. A subscriber that falls
    /// behind skips the events it missed.
    pub fn subscribe(&self) -> FeedStream {
        let (replay, receiver) = {
            let buffer = self.inner.buffer();
            let replay: Vec<WinEvent> = buffer.iter().rev().cloned().collect();
            (replay, self.inner.live.subscribe())
        };

        let live = BroadcastStream::new(receiver).filter_map(|item| match item {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!("feed subscriber lagged, skipped {} events", skipped);
                None
            }
        });

        Box::pin(tokio_stream::iter(replay).chain(live))
    }
}

/// Run `f` against the feed if it still exists; stop the timer otherwise
fn with_feed(weak: &Weak<FeedInner>, f: impl FnOnce(&FeedInner)) -> TickControl {
    match weak.upgrade() {
        Some(feed) => {
            f(&feed);
            TickControl::Continue
        }
        None => TickControl::Stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{SeededRandom, SequenceRandom};
    use tokio::time;

    fn feed() -> WinFeed {
        WinFeed::new(FeedConfig::default(), SharedRandom::new(SeededRandom::new(21))).unwrap()
    }

    #[test]
    fn test_rejects_empty_catalogs() {
        let config = FeedConfig {
            games: Vec::new(),
            ..FeedConfig::default()
        };
        assert!(WinFeed::new(config, SharedRandom::new(SeededRandom::new(1))).is_err());
    }

    #[test]
    fn test_buffer_bounded_under_heavy_production() {
        let feed = feed();
        for _ in 0..1_000 {
            feed.produce_one();
            assert!(feed.len() <= 10);
        }
        assert_eq!(feed.len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_seeds_initial_events() {
        let feed = feed();
        feed.start_production().await;
        assert_eq!(feed.len(), 5);
        assert!(feed.is_producing().await);

        // production window is 8-13s
        time::sleep(Duration::from_millis(7_900)).await;
        assert_eq!(feed.len(), 5);
        time::sleep(Duration::from_millis(5_200)).await;
        assert_eq!(feed.len(), 6);

        feed.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_production_keeps_one_period() {
        let feed = feed();
        let started = time::Instant::now();
        feed.start_production().await;
        let mut stream = feed.subscribe();
        for _ in 0..5 {
            stream.next().await.unwrap();
        }

        let mut fired = Vec::new();
        for _ in 0..4 {
            stream.next().await.unwrap();
            fired.push(time::Instant::now());
        }

        let period = fired[0] - started;
        assert!(period >= Duration::from_millis(8_000) && period <= Duration::from_millis(13_000));
        for pair in fired.windows(2) {
            assert_eq!(pair[1] - pair[0], period);
        }

        feed.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_production_period_drawn_from_shared_random() {
        let feed = WinFeed::new(FeedConfig::default(), SharedRandom::new(SequenceRandom::new(vec![0.5]))).unwrap();
        let started = time::Instant::now();
        feed.start_production().await;
        let mut stream = feed.subscribe();
        for _ in 0..5 {
            stream.next().await.unwrap();
        }

        stream.next().await.unwrap();
        // every draw is 0.5: 8000 + 0.5 * 5000
        assert_eq!(time::Instant::now() - started, Duration::from_millis(10_500));
        stream.next().await.unwrap();
        assert_eq!(time::Instant::now() - started, Duration::from_millis(21_000));

        feed.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_production_after_shutdown() {
        let feed = feed();
        feed.start().await;
        time::sleep(Duration::from_secs(60)).await;
        feed.shutdown().await;

        let before = feed.snapshot();
        time::sleep(Duration::from_secs(600)).await;
        let after = feed.snapshot();

        assert_eq!(before.events, after.events);
        assert_eq!(before.featured_index, after.featured_index);
        assert!(!feed.is_producing().await);
        assert!(!feed.is_rotating().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rotation_independent_of_production() {
        let feed = feed();
        for _ in 0..5 {
            feed.produce_one();
        }
        feed.start_rotation().await;

        time::sleep(Duration::from_millis(3_100)).await;
        assert_eq!(feed.snapshot().featured_index, 1);
        time::sleep(Duration::from_millis(3_000)).await;
        assert_eq!(feed.snapshot().featured_index, 2);
        time::sleep(Duration::from_millis(3_000)).await;
        assert_eq!(feed.snapshot().featured_index, 0);

        assert!(!feed.is_producing().await);
        assert_eq!(feed.len(), 5);
        feed.stop_rotation().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_replays_then_follows() {
        let feed = feed();
        let first = feed.produce_one();
        let second = feed.produce_one();

        let mut stream = feed.subscribe();
        assert_eq!(stream.next().await, Some(first));
        assert_eq!(stream.next().await, Some(second));

        let third = feed.produce_one();
        assert_eq!(stream.next().await, Some(third));

        // a fresh subscription starts over from the buffer
        let mut again = feed.subscribe();
        assert_eq!(again.next().await.map(|e| e.id), feed.snapshot().events.last().map(|e| e.id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_stream_from_timer() {
        let feed = feed();
        let mut stream = feed.subscribe();
        feed.start_production().await;

        let mut received = Vec::new();
        for _ in 0..7 {
            received.push(stream.next().await.unwrap());
        }
        // five seeded, then two produced on the timer
        assert_eq!(received.len(), 7);
        assert_eq!(feed.len(), 7);

        feed.shutdown().await;
    }
}
