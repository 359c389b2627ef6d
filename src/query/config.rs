use std::time::Duration;

/// Cache behaviour of a [`QueryClient`](super::QueryClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryConfig {
    /// How long settled data counts as fresh for a *new* subscriber.
    ///
    /// `None` keeps data fresh until a tag invalidation or lifecycle event
    /// marks it stale. With `Some(d)`, a subscriber arriving more than `d`
    /// after the last fetch triggers a background refetch while still seeing
    /// the cached data.
    pub stale_time: Option<Duration>,

    /// Grace period an entry survives after its last subscriber leaves.
    ///
    /// Covers quick remounts (going back to a page you just left) without a
    /// network round trip.
    pub cache_time: Duration,

    /// Refetch active queries when the terminal regains focus.
    pub refetch_on_focus: bool,

    /// Refetch active queries when connectivity comes back.
    pub refetch_on_reconnect: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            stale_time: None,
            cache_time: Duration::from_secs(60),
            refetch_on_focus: true,
            refetch_on_reconnect: true,
        }
    }
}

impl QueryConfig {
    #[must_use]
    pub const fn new(stale_time: Option<Duration>, cache_time: Duration) -> Self {
        Self {
            stale_time,
            cache_time,
            refetch_on_focus: true,
            refetch_on_reconnect: true,
        }
    }

    #[must_use]
    pub const fn with_refetch_on_focus(mut self, enabled: bool) -> Self {
        self.refetch_on_focus = enabled;
        self
    }

    #[must_use]
    pub const fn with_refetch_on_reconnect(mut self, enabled: bool) -> Self {
        self.refetch_on_reconnect = enabled;
        self
    }
}
