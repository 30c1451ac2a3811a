//! `carrot-cake-channel-pool` pools [`lapin`] channels, so that short-lived users of
//! channels do not pay for opening a new one on every operation.
//!
//! [`ChannelPool`](crate::pool::ChannelPool) is the best starting point to learn more about
//! what `carrot-cake-channel-pool` provides and how to leverage it.
//!
//! The pool is not tied to [`lapin`]: anything implementing
//! [`ChannelFactory`](crate::pool::ChannelFactory) can be pooled.

pub mod pool;
