//! The container handed out by [`ChannelPool::acquire`](super::ChannelPool::acquire).
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Weak;
use tracing::warn;

use super::channel::close_quietly;
use super::channel_pool::PoolInner;
use super::clock::Tick;
use super::{ChannelFactory, ChannelFlags};

/// A channel, stamped with the flags it was opened with and its creation tick.
pub(crate) struct Entry<C> {
    pub(crate) channel: C,
    pub(crate) flags: ChannelFlags,
    pub(crate) created_at: Tick,
}

/// A channel borrowed from a [`ChannelPool`](super::ChannelPool).
///
/// `PooledChannel` dereferences to the underlying channel.
/// Once you are done with it, hand it back with [`PooledChannel::release`]: the pool will
/// either keep it around for the next caller asking for the same [`ChannelFlags`] or close it.
///
/// A `PooledChannel` that is simply dropped is returned to its pool in the background,
/// on the current tokio runtime.
pub struct PooledChannel<F: ChannelFactory> {
    /// `None` only once the channel has left the container, so it can be closed at most once.
    entry: Option<Entry<F::Channel>>,
    pool: Weak<PoolInner<F>>,
}

impl<F: ChannelFactory> PooledChannel<F> {
    pub(crate) fn new(entry: Entry<F::Channel>, pool: Weak<PoolInner<F>>) -> Self {
        Self {
            entry: Some(entry),
            pool,
        }
    }

    fn entry(&self) -> &Entry<F::Channel> {
        self.entry
            .as_ref()
            .expect("The channel has already left its container. This is a bug.")
    }

    /// The flags this channel was opened with.
    pub fn flags(&self) -> ChannelFlags {
        self.entry().flags
    }

    /// The tick at which the channel was opened.
    pub fn created_at(&self) -> Tick {
        self.entry().created_at
    }

    /// Return the channel to the pool it was acquired from.
    ///
    /// If that pool has been closed (or dropped) in the meantime, the channel is closed instead.
    pub async fn release(mut self) {
        if let Some(entry) = self.entry.take() {
            return_to_pool(&self.pool, entry).await;
        }
    }

    /// Take the channel out of the pool for good.
    ///
    /// The pool forgets about it: closing it becomes the caller's responsibility.
    pub fn detach(mut self) -> F::Channel {
        self.entry
            .take()
            .map(|entry| entry.channel)
            .expect("The channel has already left its container. This is a bug.")
    }
}

async fn return_to_pool<F: ChannelFactory>(pool: &Weak<PoolInner<F>>, entry: Entry<F::Channel>) {
    match pool.upgrade() {
        Some(pool) => pool.recycle(entry).await,
        None => close_quietly(entry.channel).await,
    }
}

impl<F: ChannelFactory> Deref for PooledChannel<F> {
    type Target = F::Channel;

    fn deref(&self) -> &F::Channel {
        &self.entry().channel
    }
}

impl<F: ChannelFactory> DerefMut for PooledChannel<F> {
    fn deref_mut(&mut self) -> &mut F::Channel {
        &mut self
            .entry
            .as_mut()
            .expect("The channel has already left its container. This is a bug.")
            .channel
    }
}

impl<F: ChannelFactory> fmt::Debug for PooledChannel<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("PooledChannel");
        if let Some(entry) = &self.entry {
            debug
                .field("flags", &entry.flags)
                .field("created_at", &entry.created_at);
        }
        debug.finish_non_exhaustive()
    }
}

impl<F: ChannelFactory> Drop for PooledChannel<F> {
    fn drop(&mut self) {
        let Some(entry) = self.entry.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let pool = self.pool.clone();
                runtime.spawn(async move { return_to_pool(&pool, entry).await });
            }
            Err(_) => warn!(
                flags = ?entry.flags,
                "A pooled channel was dropped outside of a tokio runtime: it could not be returned to its pool"
            ),
        }
    }
}
