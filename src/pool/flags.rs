/// The operational mode a channel was opened in.
///
/// `ChannelFlags` is the key of the pool: a channel is only ever handed out again to callers
/// asking for exactly the same flags. Two channels with different flags never share a shelf.
///
/// ```rust
/// use carrot_cake_channel_pool::pool::ChannelFlags;
///
/// let flags = ChannelFlags::PUBLISHER_CONFIRMS.with_prefetch_count(50);
/// assert!(flags.publisher_confirms());
/// assert_eq!(Some(50), flags.prefetch_count());
/// assert_ne!(flags, ChannelFlags::PUBLISHER_CONFIRMS);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChannelFlags {
    publisher_confirms: bool,
    prefetch_count: Option<u16>,
}

impl ChannelFlags {
    /// A plain channel: no publisher confirms, no prefetch limit.
    pub const NONE: Self = Self {
        publisher_confirms: false,
        prefetch_count: None,
    };

    /// A channel with publisher confirms enabled.
    ///
    /// See <https://www.rabbitmq.com/confirms.html#publisher-confirms>.
    pub const PUBLISHER_CONFIRMS: Self = Self {
        publisher_confirms: true,
        prefetch_count: None,
    };

    /// Enable or disable publisher confirms.
    #[must_use]
    pub const fn with_publisher_confirms(self, publisher_confirms: bool) -> Self {
        Self {
            publisher_confirms,
            ..self
        }
    }

    /// Limit the number of unacknowledged deliveries on the channel.
    #[must_use]
    pub const fn with_prefetch_count(self, prefetch_count: u16) -> Self {
        Self {
            prefetch_count: Some(prefetch_count),
            ..self
        }
    }

    /// Whether channels are opened with publisher confirms enabled.
    pub const fn publisher_confirms(&self) -> bool {
        self.publisher_confirms
    }

    /// The prefetch count applied to channels, if any.
    pub const fn prefetch_count(&self) -> Option<u16> {
        self.prefetch_count
    }
}
