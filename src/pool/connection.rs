//! Implements [`ChannelFactory`] for [`lapin::Connection`].
use lapin::options::{BasicQosOptions, ConfirmSelectOptions};

use super::{ChannelFlags, PoolableChannel};

/// `ChannelFactory` opens new channels for a [`ChannelPool`](super::ChannelPool).
///
/// It is usually a single, already established connection to the broker: channels are
/// multiplexed on top of it.
/// Connecting (and reconnecting) is not the concern of the pool.
#[async_trait::async_trait]
pub trait ChannelFactory: Send + Sync + 'static {
    /// The channel type handed out by the factory.
    type Channel: PoolableChannel;
    /// Error returned when a channel cannot be opened.
    ///
    /// The pool forwards it, untouched, to the caller of [`ChannelPool::acquire`](super::ChannelPool::acquire).
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open a new channel, configured according to `flags`.
    async fn create_channel(&self, flags: ChannelFlags) -> Result<Self::Channel, Self::Error>;
}

#[async_trait::async_trait]
impl ChannelFactory for lapin::Connection {
    type Channel = lapin::Channel;
    type Error = super::Error;

    #[tracing::instrument(name = "rabbitmq_create_channel", skip(self))]
    async fn create_channel(&self, flags: ChannelFlags) -> Result<lapin::Channel, super::Error> {
        let channel = lapin::Connection::create_channel(self).await?;
        if flags.publisher_confirms() {
            // See https://www.rabbitmq.com/amqp-0-9-1-reference.html#confirm.select.nowait
            channel
                .confirm_select(ConfirmSelectOptions { nowait: false })
                .await?;
        }
        if let Some(prefetch_count) = flags.prefetch_count() {
            channel
                .basic_qos(prefetch_count, BasicQosOptions::default())
                .await?;
        }
        Ok(channel)
    }
}
