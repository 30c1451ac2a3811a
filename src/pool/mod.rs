//! Provides pooling for [`lapin::Channel`]s multiplexed over a single [`lapin::Connection`].
//!
//! This module provides three key guarantees:
//! - Channels are only reused by callers asking for the same [`ChannelFlags`].
//! - Channels older than the configured time-to-live are closed rather than reused.
//! - Every channel is closed exactly once, including when releases race with [`ChannelPool::close`].
//!
//! ```rust,no_run
//! use carrot_cake_channel_pool::pool::{ChannelFlags, ChannelPool, ChannelPoolSettings};
//!
//! // Function for asyncness.
//! async fn example(connection: lapin::Connection) -> anyhow::Result<()> {
//!     // Keep idle channels around for one minute.
//!     let settings = ChannelPoolSettings {
//!         channel_ttl_seconds: 60,
//!         ..Default::default()
//!     };
//!
//!     let pool = ChannelPool::builder(connection).settings(&settings).build();
//!
//!     // get a channel with publisher confirms enabled from the pool.
//!     let channel = pool.acquire(ChannelFlags::PUBLISHER_CONFIRMS).await?;
//!     channel.release().await;
//!     Ok(())
//! }
//! ```

mod channel;
mod channel_pool;
mod clock;
mod configuration;
mod connection;
mod error;
mod flags;
mod pooled;

pub use channel::PoolableChannel;
pub use channel_pool::{ChannelPool, ChannelPoolBuilder, PoolStatus};
pub use clock::{Clock, MonotonicClock, Tick};
pub use configuration::ChannelPoolSettings;
pub use connection::ChannelFactory;
pub use error::Error;
pub use flags::ChannelFlags;
pub use pooled::PooledChannel;
