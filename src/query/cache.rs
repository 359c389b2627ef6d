use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;

use crate::api::ApiError;

use super::tags::TagSet;

/// Type-erased query payload. Each endpoint always stores the same concrete
/// type, which [`Query`](super::Query) downcasts back.
pub(crate) type Payload = Arc<dyn Any + Send + Sync>;

/// Type-erased fetcher, kept on the entry so invalidation can re-run it with
/// the arguments it was created with.
pub(crate) type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, Result<Payload, ApiError>> + Send + Sync>;

/// Lifecycle of a cache entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum QueryStatus {
    /// Registered but never fetched.
    #[default]
    Idle,
    /// A fetch is in flight. Previous data, if any, is still visible.
    Loading,
    /// The last fetch succeeded.
    Success,
    /// The last fetch failed.
    Error,
}

/// What a subscriber sees of a cache entry at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<T> {
    pub status: QueryStatus,
    /// Last successful payload. Kept while a refetch is loading, cleared by an
    /// error.
    pub data: Option<T>,
    pub error: Option<ApiError>,
    /// The data is known to be outdated and a refetch is pending or running.
    pub is_stale: bool,
    pub last_fetched_at: Option<Instant>,
}

impl<T> Default for QueryResult<T> {
    fn default() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            is_stale: false,
            last_fetched_at: None,
        }
    }
}

impl<T> QueryResult<T> {
    /// Returns the data if any has been fetched, even if it is being refreshed.
    pub const fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Returns `true` while the first fetch is running and there is nothing to
    /// show yet.
    pub const fn is_loading(&self) -> bool {
        matches!(self.status, QueryStatus::Idle | QueryStatus::Loading) && self.data.is_none()
    }

    /// Returns `true` while any fetch is running, including refetches.
    pub const fn is_fetching(&self) -> bool {
        matches!(self.status, QueryStatus::Loading)
    }

    pub const fn is_success(&self) -> bool {
        matches!(self.status, QueryStatus::Success)
    }

    pub const fn is_error(&self) -> bool {
        matches!(self.status, QueryStatus::Error)
    }
}

/// One slot of the query cache.
pub(crate) struct CacheEntry {
    pub status: QueryStatus,
    pub data: Option<Payload>,
    pub error: Option<ApiError>,
    pub tags: TagSet,
    pub subscribers: usize,
    pub last_fetched_at: Option<Instant>,
    pub released_at: Option<Instant>,
    pub is_stale: bool,
    pub refetch_pending: bool,
    pub fetcher: Fetcher,
}

impl CacheEntry {
    pub fn new(tags: TagSet, fetcher: Fetcher) -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            tags,
            subscribers: 0,
            last_fetched_at: None,
            released_at: None,
            is_stale: false,
            refetch_pending: false,
            fetcher,
        }
    }

    /// Marks the entry stale if it was fetched longer than `stale_time` ago.
    pub fn check_staleness(&mut self, stale_time: Option<Duration>) -> bool {
        if let (Some(stale_time), Some(fetched)) = (stale_time, self.last_fetched_at) {
            if fetched.elapsed() > stale_time {
                self.is_stale = true;
            }
        }
        self.is_stale
    }

    pub const fn mark_stale(&mut self) {
        self.is_stale = true;
    }

    /// Whether a new subscriber should start a fetch.
    pub fn needs_fetch(&mut self, stale_time: Option<Duration>) -> bool {
        match self.status {
            QueryStatus::Idle | QueryStatus::Error => true,
            QueryStatus::Loading => false,
            QueryStatus::Success => self.check_staleness(stale_time),
        }
    }

    /// Stores the outcome of a fetch.
    pub fn settle(&mut self, result: Result<Payload, ApiError>) {
        match result {
            Ok(data) => {
                self.status = QueryStatus::Success;
                self.data = Some(data);
                self.error = None;
            }
            Err(err) => {
                self.status = QueryStatus::Error;
                self.data = None;
                self.error = Some(err);
            }
        }
        self.last_fetched_at = Some(Instant::now());
        self.is_stale = false;
    }

    /// Whether the entry has been unused for longer than `cache_time`.
    pub fn should_gc(&self, cache_time: Duration) -> bool {
        self.subscribers == 0
            && self.status != QueryStatus::Loading
            && self
                .released_at
                .is_some_and(|released| released.elapsed() >= cache_time)
    }

    /// Typed view of this entry.
    pub fn snapshot<T: Clone + 'static>(&self) -> QueryResult<T> {
        QueryResult {
            status: self.status,
            data: self.data.as_ref().and_then(|payload| {
                let any: &(dyn Any + Send + Sync) = &**payload;
                any.downcast_ref::<T>().cloned()
            }),
            error: self.error.clone(),
            is_stale: self.is_stale,
            last_fetched_at: self.last_fetched_at,
        }
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("status", &self.status)
            .field("has_data", &self.data.is_some())
            .field("error", &self.error)
            .field("tags", &self.tags)
            .field("subscribers", &self.subscribers)
            .field("is_stale", &self.is_stale)
            .field("refetch_pending", &self.refetch_pending)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::thread::sleep;

    fn entry() -> CacheEntry {
        let fetcher: Fetcher =
            Arc::new(|| async { Ok::<Payload, ApiError>(Arc::new(1_u32)) }.boxed());
        CacheEntry::new(TagSet::new(), fetcher)
    }

    #[test]
    fn test_new_entry_needs_fetch() {
        let mut entry = entry();
        assert_eq!(entry.status, QueryStatus::Idle);
        assert!(entry.needs_fetch(None));
    }

    #[test]
    fn test_settle_success_then_error_clears_data() {
        let mut entry = entry();
        entry.settle(Ok(Arc::new(7_u32)));
        assert_eq!(entry.snapshot::<u32>().data, Some(7));
        assert!(!entry.needs_fetch(None));

        entry.settle(Err(ApiError::Transport("down".into())));
        let snapshot = entry.snapshot::<u32>();
        assert!(snapshot.is_error());
        assert_eq!(snapshot.data, None);
        assert!(entry.needs_fetch(None));
    }

    #[test]
    fn test_snapshot_with_wrong_type_has_no_data() {
        let mut entry = entry();
        entry.settle(Ok(Arc::new(7_u32)));
        assert_eq!(entry.snapshot::<String>().data, None);
    }

    #[test]
    fn test_check_staleness() {
        let mut entry = entry();
        entry.settle(Ok(Arc::new(1_u32)));
        assert!(!entry.check_staleness(None));
        assert!(!entry.check_staleness(Some(Duration::from_secs(60))));

        sleep(Duration::from_millis(10));
        assert!(entry.check_staleness(Some(Duration::from_millis(5))));
        assert!(entry.needs_fetch(None));
    }

    #[test]
    fn test_loading_never_needs_fetch() {
        let mut entry = entry();
        entry.status = QueryStatus::Loading;
        entry.mark_stale();
        assert!(!entry.needs_fetch(Some(Duration::ZERO)));
    }

    #[test]
    fn test_should_gc() {
        let mut entry = entry();
        assert!(!entry.should_gc(Duration::ZERO), "never released");

        entry.released_at = Some(Instant::now());
        assert!(entry.should_gc(Duration::ZERO));
        assert!(!entry.should_gc(Duration::from_secs(60)));

        entry.subscribers = 1;
        assert!(!entry.should_gc(Duration::ZERO));

        entry.subscribers = 0;
        entry.status = QueryStatus::Loading;
        assert!(!entry.should_gc(Duration::ZERO));
    }

    #[test]
    fn test_result_predicates() {
        let loading: QueryResult<u32> = QueryResult {
            status: QueryStatus::Loading,
            ..QueryResult::default()
        };
        assert!(loading.is_loading());
        assert!(loading.is_fetching());

        let refetching = QueryResult {
            status: QueryStatus::Loading,
            data: Some(3),
            ..QueryResult::default()
        };
        assert!(!refetching.is_loading());
        assert!(refetching.is_fetching());
        assert_eq!(refetching.data(), Some(&3));
    }
}
