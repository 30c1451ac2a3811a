//! Implements [`PoolableChannel`] for [`lapin::Channel`].
use tracing::warn;

/// AMQP reply code for a normal, requested shutdown.
///
/// See <https://www.rabbitmq.com/amqp-0-9-1-reference.html#constants>.
const REPLY_SUCCESS: u16 = 200;

/// A channel that can be managed by a [`ChannelPool`](super::ChannelPool).
///
/// `close` consumes the channel: once closed, a channel cannot be closed again or handed out.
#[async_trait::async_trait]
pub trait PoolableChannel: Send + Sync + 'static {
    /// Close the channel, releasing its resources on the broker.
    async fn close(self) -> Result<(), anyhow::Error>;
}

#[async_trait::async_trait]
impl PoolableChannel for lapin::Channel {
    async fn close(self) -> Result<(), anyhow::Error> {
        // Channels torn down by the broker (or with their connection) have nothing left to close.
        if !self.status().connected() {
            return Ok(());
        }
        lapin::Channel::close(&self, REPLY_SUCCESS, "Channel discarded by the pool").await?;
        Ok(())
    }
}

/// Close a channel, logging and swallowing any failure.
///
/// Cleaning up a channel must never fail the caller: a channel that cannot be closed
/// is abandoned.
pub(crate) async fn close_quietly<C: PoolableChannel>(channel: C) {
    if let Err(e) = channel.close().await {
        warn!("Failed to close a pooled RabbitMq channel: {:?}", e);
    }
}
