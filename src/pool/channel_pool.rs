//! Keyed, expiry-aware pooling of channels.
//!
//! Idle channels live on one shelf per [`ChannelFlags`]. The flags-to-shelf map is a
//! [`DashMap`]; each shelf is a `VecDeque` briefly locked for every push, pop or drain,
//! rather than a lock-free queue.
use dashmap::DashMap;
use futures_util::future::join_all;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{fence, AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::channel::close_quietly;
use super::clock::{has_expired, Clock, MonotonicClock};
use super::configuration::{ChannelPoolSettings, DEFAULT_CHANNEL_TTL};
use super::pooled::{Entry, PooledChannel};
use super::{ChannelFactory, ChannelFlags};

/// Idle channels opened with the same flags, oldest first.
///
/// Shelves are not lock-free: each one sits behind its own mutex, held only for a single
/// push, pop or drain and never across an `.await`. There is no lock spanning all shelves.
type Shelf<C> = Mutex<VecDeque<Entry<C>>>;

enum Strategy<C> {
    /// Channels are kept around and reused, one shelf per set of [`ChannelFlags`].
    Pooled(DashMap<ChannelFlags, Arc<Shelf<C>>>),
    /// Every acquisition opens a new channel, every release closes it.
    Passthrough,
}

pub(crate) struct PoolInner<F: ChannelFactory> {
    factory: F,
    clock: Box<dyn Clock>,
    ttl: Duration,
    /// Flips to `true` once, in [`ChannelPool::close`], and never goes back.
    closed: AtomicBool,
    strategy: Strategy<F::Channel>,
}

/// `ChannelPool` pools channels opened on a single connection to a RabbitMq broker.
///
/// Opening a channel costs a round-trip to the broker and is serialised at the connection
/// level: short-lived users of channels (e.g. one publish per request) should borrow them
/// from a pool instead.
///
/// Channels are pooled by [`ChannelFlags`]: a channel is only reused by callers asking for
/// the same flags it was opened with.
/// Channels are discarded, rather than reused, once they are older than the configured
/// time-to-live (five minutes by default).
///
/// `ChannelPool` is cheap to clone: all clones share the same channels.
///
/// # Example
///
/// ```rust,no_run
/// use carrot_cake_channel_pool::pool::{ChannelFlags, ChannelPool};
///
/// async fn publish_something(connection: lapin::Connection) -> anyhow::Result<()> {
///     let pool = ChannelPool::builder(connection).build();
///
///     let channel = pool.acquire(ChannelFlags::PUBLISHER_CONFIRMS).await?;
///     // ... use `channel` as a `lapin::Channel` ...
///     channel.release().await;
///
///     pool.close().await;
///     Ok(())
/// }
/// ```
pub struct ChannelPool<F: ChannelFactory> {
    inner: Arc<PoolInner<F>>,
}

impl<F: ChannelFactory> Clone for ChannelPool<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: ChannelFactory> ChannelPool<F> {
    /// Start building a [`ChannelPool`] on top of `factory`.
    pub fn builder(factory: F) -> ChannelPoolBuilder<F> {
        ChannelPoolBuilder::new(factory)
    }

    /// Get a channel opened with `flags`.
    ///
    /// An idle channel with the same flags is reused if there is one that has not expired
    /// (expired ones found along the way are closed); otherwise a new channel is opened.
    ///
    /// Errors returned by the [`ChannelFactory`] are returned as they are.
    #[tracing::instrument(name = "channel_pool_acquire", skip(self))]
    pub async fn acquire(&self, flags: ChannelFlags) -> Result<PooledChannel<F>, F::Error> {
        let entry = match self.inner.take_idle(flags).await {
            Some(entry) => entry,
            None => self.inner.open(flags).await?,
        };
        Ok(PooledChannel::new(entry, Arc::downgrade(&self.inner)))
    }

    /// Hand a channel back to the pool it was acquired from.
    ///
    /// Equivalent to [`PooledChannel::release`].
    pub async fn release(&self, channel: PooledChannel<F>) {
        channel.release().await
    }

    /// Close the pool, closing all idle channels.
    ///
    /// Channels still in use are closed when they are released.
    /// Closing a pool more than once is harmless.
    pub async fn close(&self) {
        // The flag must be visible before the shelves are drained: releases racing with us
        // either see it and close their channel, or land on a shelf before the drain below.
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            info!("Closing channel pool");
        }
        fence(Ordering::SeqCst);
        let drained = self.inner.flush().await;
        debug!(drained, "Closed idle channels");
    }

    /// `true` once [`ChannelPool::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// A point-in-time view of the idle channels held by the pool.
    pub fn status(&self) -> PoolStatus {
        let idle = match &self.inner.strategy {
            Strategy::Pooled(shelves) => shelves
                .iter()
                .map(|shelf| (*shelf.key(), shelf.value().lock().len()))
                .collect(),
            Strategy::Passthrough => HashMap::new(),
        };
        PoolStatus {
            idle,
            closed: self.is_closed(),
        }
    }
}

impl<F: ChannelFactory> PoolInner<F> {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn has_expired(&self, entry: &Entry<F::Channel>) -> bool {
        has_expired(self.clock.now(), entry.created_at, self.ttl)
    }

    /// Pop idle channels off the shelf for `flags` until one that has not expired turns up.
    async fn take_idle(&self, flags: ChannelFlags) -> Option<Entry<F::Channel>> {
        let Strategy::Pooled(shelves) = &self.strategy else {
            return None;
        };
        let shelf = shelves.get(&flags).map(|shelf| Arc::clone(shelf.value()))?;
        loop {
            let entry = shelf.lock().pop_front()?;
            if !self.has_expired(&entry) {
                debug!(?flags, "Reusing an idle channel");
                return Some(entry);
            }
            debug!(
                ?flags,
                created_at = entry.created_at,
                "Closing an expired channel"
            );
            close_quietly(entry.channel).await;
        }
    }

    async fn open(&self, flags: ChannelFlags) -> Result<Entry<F::Channel>, F::Error> {
        let channel = self.factory.create_channel(flags).await?;
        debug!(?flags, "Opened a new channel");
        Ok(Entry {
            channel,
            flags,
            created_at: self.clock.now(),
        })
    }

    /// Shelve a released channel, or close it if it must not be reused.
    pub(crate) async fn recycle(&self, entry: Entry<F::Channel>) {
        let shelves = match &self.strategy {
            Strategy::Pooled(shelves) if !self.is_closed() && !self.has_expired(&entry) => {
                shelves
            }
            _ => {
                close_quietly(entry.channel).await;
                return;
            }
        };

        let shelf = Arc::clone(
            shelves
                .entry(entry.flags)
                .or_insert_with(Arc::default)
                .value(),
        );
        shelf.lock().push_back(entry);

        // `close` may have run between the check above and the push, in which case its drain
        // could have missed this channel. Check again, and drain ourselves if so.
        fence(Ordering::SeqCst);
        if self.is_closed() {
            self.flush().await;
        }
    }

    /// Close every idle channel, across all flags. Returns how many were closed.
    async fn flush(&self) -> usize {
        let drained = self.drain();
        let count = drained.len();
        join_all(
            drained
                .into_iter()
                .map(|entry| close_quietly(entry.channel)),
        )
        .await;
        count
    }

    /// Take every idle channel off its shelf, across all flags.
    fn drain(&self) -> Vec<Entry<F::Channel>> {
        let Strategy::Pooled(shelves) = &self.strategy else {
            return Vec::new();
        };
        // Snapshot the shelves first: no map lock is held while draining.
        let snapshot: Vec<Arc<Shelf<F::Channel>>> = shelves
            .iter()
            .map(|shelf| Arc::clone(shelf.value()))
            .collect();
        let mut drained = Vec::new();
        for shelf in snapshot {
            drained.extend(shelf.lock().drain(..));
        }
        drained
    }
}

impl<F: ChannelFactory> Drop for PoolInner<F> {
    fn drop(&mut self) {
        let drained = self.drain();
        if drained.is_empty() {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                debug!(
                    drained = drained.len(),
                    "Closing idle channels of a dropped pool"
                );
                runtime.spawn(join_all(
                    drained
                        .into_iter()
                        .map(|entry| close_quietly(entry.channel)),
                ));
            }
            Err(_) => warn!(
                drained = drained.len(),
                "A channel pool was dropped outside of a tokio runtime: its idle channels could not be closed"
            ),
        }
    }
}

/// Idle channels held by a [`ChannelPool`], as returned by [`ChannelPool::status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStatus {
    idle: HashMap<ChannelFlags, usize>,
    closed: bool,
}

impl PoolStatus {
    /// Total number of idle channels.
    pub fn idle(&self) -> usize {
        self.idle.values().sum()
    }

    /// Number of idle channels opened with `flags`.
    pub fn idle_for(&self, flags: ChannelFlags) -> usize {
        self.idle.get(&flags).copied().unwrap_or_default()
    }

    /// Whether the pool had been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// A builder for [`ChannelPool`].
///
/// Use [`ChannelPool::builder`] as entrypoint.
pub struct ChannelPoolBuilder<F> {
    factory: F,
    ttl: Duration,
    pooling_enabled: bool,
    clock: Box<dyn Clock>,
}

impl<F: ChannelFactory> ChannelPoolBuilder<F> {
    fn new(factory: F) -> Self {
        Self {
            factory,
            ttl: DEFAULT_CHANNEL_TTL,
            pooling_enabled: true,
            clock: Box::new(MonotonicClock::new()),
        }
    }

    /// Apply the values found in `settings`.
    #[must_use]
    pub fn settings(self, settings: &ChannelPoolSettings) -> Self {
        self.ttl(settings.channel_ttl())
            .pooling(settings.pooling_enabled)
    }

    /// How long a channel may live before it is discarded.
    /// Defaults to 5 minutes if left unspecified.
    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Turn pooling on or off. It is on by default.
    ///
    /// With pooling off, every acquisition opens a new channel and every release closes it.
    #[must_use]
    pub fn pooling(mut self, enabled: bool) -> Self {
        self.pooling_enabled = enabled;
        self
    }

    /// Replace the [`Clock`] used to age channels.
    #[must_use]
    pub fn clock<C: Clock>(mut self, clock: C) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Finalise the builder and get an instance of [`ChannelPool`].
    pub fn build(self) -> ChannelPool<F> {
        let strategy = if self.pooling_enabled {
            Strategy::Pooled(DashMap::new())
        } else {
            Strategy::Passthrough
        };
        ChannelPool {
            inner: Arc::new(PoolInner {
                factory: self.factory,
                clock: self.clock,
                ttl: self.ttl,
                closed: AtomicBool::new(false),
                strategy,
            }),
        }
    }
}
