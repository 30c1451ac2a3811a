//! Tick sources used to age pooled channels.
use std::time::{Duration, Instant};

/// A monotonic timestamp, in milliseconds.
pub type Tick = u64;

/// A source of monotonic [`Tick`]s.
///
/// Pooled channels are stamped with a tick when they are created and compared against the
/// current tick whenever they are about to be reused or shelved.
/// Ticks are deliberately not wall-clock time, so that system clock adjustments cannot
/// make channels look younger than they are.
pub trait Clock: Send + Sync + 'static {
    /// The current tick.
    ///
    /// Ticks should never go backwards: channels stamped after the current tick count as expired.
    fn now(&self) -> Tick;
}

/// The default [`Clock`]: milliseconds elapsed since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// Create a clock whose tick `0` is now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Tick {
        Tick::try_from(self.origin.elapsed().as_millis()).unwrap_or(Tick::MAX)
    }
}

/// Whether a channel stamped at `created` must be discarded at `now`.
///
/// A `now` earlier than `created` means the tick source went backwards: the channel age
/// cannot be trusted, so the channel counts as expired.
pub(crate) fn has_expired(now: Tick, created: Tick, ttl: Duration) -> bool {
    let ttl = Tick::try_from(ttl.as_millis()).unwrap_or(Tick::MAX);
    now < created || now - created > ttl
}
