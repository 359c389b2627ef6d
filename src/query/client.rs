use std::sync::Arc;

use dashmap::DashMap;
use futures::StreamExt;
use futures::stream;
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

use crate::api::ApiError;
use crate::command::Command;

use super::cache::{CacheEntry, Fetcher, Payload, QueryResult, QueryStatus};
use super::config::QueryConfig;
use super::key::QueryKey;
use super::tags::TagSet;

/// The query cache.
///
/// One `QueryClient` is created at startup and shared (`Arc<QueryClient>`) by
/// every [`Query`](super::Query) and [`Mutation`](super::Mutation). It owns:
///
/// - one [`CacheEntry`] per [`QueryKey`], with its status, data, tags and
///   subscriber count,
/// - a broadcast channel announcing which key changed, which live query
///   streams listen on,
/// - the [`QueryConfig`].
///
/// Fetches run as detached tokio tasks. At most one fetch per key is in flight:
/// asking for a fetch while one is running joins it.
///
/// ```rust
/// use roster::query::{QueryClient, QueryConfig};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let config = QueryConfig::new(None, Duration::from_secs(30));
/// let client = Arc::new(QueryClient::with_config(config));
/// assert!(client.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct QueryClient {
    cache: Arc<DashMap<QueryKey, CacheEntry>>,
    changes_tx: broadcast::Sender<QueryKey>,
    config: QueryConfig,
}

impl QueryClient {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(QueryConfig::default())
    }

    #[must_use]
    pub fn with_config(config: QueryConfig) -> Self {
        let (changes_tx, _) = broadcast::channel(256);
        Self {
            cache: Arc::new(DashMap::new()),
            changes_tx,
            config,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Number of cached entries, active or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Typed snapshot of the entry for `key`.
    #[must_use]
    pub fn snapshot<T: Clone + 'static>(&self, key: &QueryKey) -> Option<QueryResult<T>> {
        self.cache.get(key).map(|entry| entry.snapshot())
    }

    #[must_use]
    pub fn status(&self, key: &QueryKey) -> Option<QueryStatus> {
        self.cache.get(key).map(|entry| entry.status)
    }

    #[must_use]
    pub fn subscriber_count(&self, key: &QueryKey) -> usize {
        self.cache.get(key).map_or(0, |entry| entry.subscribers)
    }

    /// Receiver of change notifications. Every settled fetch and every
    /// transition to `Loading` announces its key.
    pub(crate) fn changes(&self) -> broadcast::Receiver<QueryKey> {
        self.changes_tx.subscribe()
    }

    /// Registers one subscriber for `key`, creating the entry if needed.
    ///
    /// Starts a fetch when the entry is new, idle, failed or stale; a fetch
    /// that is already running is joined. The returned guard releases the
    /// subscription when dropped.
    pub(crate) fn subscribe(&self, key: QueryKey, tags: TagSet, fetcher: Fetcher) -> Subscriber {
        let fetch = {
            let mut entry = self
                .cache
                .entry(key.clone())
                .or_insert_with(|| CacheEntry::new(TagSet::new(), Arc::clone(&fetcher)));
            entry.subscribers += 1;
            entry.released_at = None;
            entry.tags = tags;
            entry.fetcher = fetcher;
            trace!(%key, subscribers = entry.subscribers, "subscribed");
            entry.needs_fetch(self.config.stale_time)
        };

        if fetch {
            self.start_fetch(&key, false);
        }

        Subscriber {
            client: self.clone(),
            key,
        }
    }

    /// Refetches every active entry carrying one of `tags`.
    ///
    /// Entries without subscribers are only marked stale; they refetch when
    /// someone subscribes again. An entry that is already loading is not
    /// fetched twice: it gets one follow-up fetch once the running one settles.
    ///
    /// Returns the number of fetches started right away.
    pub fn invalidate_tags(&self, tags: &TagSet) -> usize {
        let mut active = Vec::new();
        let mut stale = 0_usize;
        for mut entry in self.cache.iter_mut() {
            if !entry.tags.intersects(tags) {
                continue;
            }
            if entry.subscribers > 0 {
                active.push(entry.key().clone());
            } else {
                entry.mark_stale();
                // The in-flight result predates this invalidation.
                if entry.status == QueryStatus::Loading {
                    entry.refetch_pending = true;
                }
                stale += 1;
            }
        }

        let started = active
            .iter()
            .filter(|key| self.start_fetch(key, true))
            .count();
        info!(%tags, active = active.len(), started, stale, "invalidated tags");
        started
    }

    /// [`invalidate_tags`](Self::invalidate_tags) as a command, for use from
    /// `update`. Produces no messages.
    pub fn invalidate<Msg: Send + 'static>(&self, tags: TagSet) -> Command<Msg> {
        let client = self.clone();
        Command {
            stream: Some(
                stream::once(async move {
                    client.invalidate_tags(&tags);
                })
                .filter_map(|()| async { None })
                .boxed(),
            ),
        }
    }

    /// Invalidates the tags of every entry that currently has a subscriber.
    ///
    /// This is the coarse "refresh what is on screen" used on focus and
    /// reconnect. Does nothing when no entry is active.
    pub fn refetch_active(&self) -> usize {
        let mut tags = TagSet::new();
        for entry in self.cache.iter() {
            if entry.subscribers > 0 {
                tags.extend(&entry.tags);
            }
        }
        if tags.is_empty() {
            return 0;
        }
        self.invalidate_tags(&tags)
    }

    /// Drops entries that have had no subscriber for longer than the
    /// configured `cache_time`. Returns how many were removed.
    pub fn collect_garbage(&self) -> usize {
        let cache_time = self.config.cache_time;
        let mut evicted = 0;
        self.cache.retain(|key, entry| {
            let keep = !entry.should_gc(cache_time);
            if !keep {
                debug!(%key, "evicting unused entry");
                evicted += 1;
            }
            keep
        });
        evicted
    }

    /// Moves the entry to `Loading` and spawns its fetcher.
    ///
    /// Returns `false` without fetching when the entry is gone or already
    /// loading. With `invalidated`, a loading entry is flagged for one
    /// follow-up fetch instead.
    fn start_fetch(&self, key: &QueryKey, invalidated: bool) -> bool {
        let fetcher = {
            let Some(mut entry) = self.cache.get_mut(key) else {
                return false;
            };
            if invalidated {
                entry.mark_stale();
            }
            if entry.status == QueryStatus::Loading {
                if invalidated {
                    entry.refetch_pending = true;
                }
                trace!(%key, "joining in-flight fetch");
                return false;
            }
            entry.status = QueryStatus::Loading;
            entry.refetch_pending = false;
            Arc::clone(&entry.fetcher)
        };

        debug!(%key, "fetching");
        self.notify(key);

        let client = self.clone();
        let key = key.clone();
        tokio::spawn(async move {
            let result = fetcher().await;
            client.settle(&key, result);
        });
        true
    }

    /// Stores a fetch result, then tells every subscriber.
    fn settle(&self, key: &QueryKey, result: Result<Payload, ApiError>) {
        let (follow_up, idle) = {
            let Some(mut entry) = self.cache.get_mut(key) else {
                return;
            };
            match &result {
                Ok(_) => debug!(%key, "query settled"),
                Err(err) => warn!(%key, error = %err, "query failed"),
            }
            entry.settle(result);

            let pending = std::mem::take(&mut entry.refetch_pending);
            if pending {
                entry.mark_stale();
            }
            (pending && entry.subscribers > 0, entry.subscribers == 0)
        };

        self.notify(key);
        if follow_up {
            self.start_fetch(key, false);
        } else if idle {
            // Released while loading: the sweep scheduled at release skipped it.
            self.schedule_gc();
        }
    }

    fn release(&self, key: &QueryKey) {
        let idle = {
            let Some(mut entry) = self.cache.get_mut(key) else {
                return;
            };
            entry.subscribers = entry.subscribers.saturating_sub(1);
            trace!(%key, subscribers = entry.subscribers, "unsubscribed");
            if entry.subscribers == 0 {
                entry.released_at = Some(std::time::Instant::now());
                true
            } else {
                false
            }
        };

        if idle {
            self.schedule_gc();
        }
    }

    /// Sweeps the cache once the grace period after a release has passed.
    ///
    /// Outside a tokio runtime nothing is scheduled and entries stay until the
    /// next explicit [`collect_garbage`](Self::collect_garbage).
    fn schedule_gc(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let client = self.clone();
        let grace = self.config.cache_time;
        runtime.spawn(async move {
            tokio::time::sleep(grace).await;
            client.collect_garbage();
        });
    }

    fn notify(&self, key: &QueryKey) {
        // No receivers just means nobody is watching.
        let _ = self.changes_tx.send(key.clone());
    }
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new()
    }
}

/// A registered subscriber of one cache entry. Dropping it unsubscribes.
#[derive(Debug)]
pub(crate) struct Subscriber {
    client: QueryClient,
    key: QueryKey,
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        self.client.release(&self.key);
    }
}
