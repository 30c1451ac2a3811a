//! Configuration types holding the parameters of a [`ChannelPool`](super::ChannelPool).
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;
use std::time::Duration;

/// Idle channels older than this are discarded rather than reused.
pub(crate) const DEFAULT_CHANNEL_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
/// Configuration of a [`ChannelPool`](super::ChannelPool).
///
/// Every field is optional when deserializing; `ChannelPoolSettings::default()` pools channels
/// and keeps them around for five minutes.
pub struct ChannelPoolSettings {
    /// When `false`, every acquisition opens a new channel and every release closes it.
    pub pooling_enabled: bool,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    /// How long a channel may live before it is discarded, in seconds.
    ///
    /// The age is measured from the moment the channel was opened.
    pub channel_ttl_seconds: u64,
}

impl Default for ChannelPoolSettings {
    fn default() -> Self {
        Self {
            pooling_enabled: true,
            channel_ttl_seconds: DEFAULT_CHANNEL_TTL.as_secs(),
        }
    }
}

impl ChannelPoolSettings {
    /// Retrieve the time-to-live of pooled channels.
    pub fn channel_ttl(&self) -> Duration {
        Duration::from_secs(self.channel_ttl_seconds)
    }
}
