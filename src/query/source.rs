use std::hash::{DefaultHasher, Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt, TryFutureExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::trace;

use crate::api::ApiError;
use crate::subscription::{SubscriptionId, SubscriptionSource};

use super::cache::{Fetcher, Payload, QueryResult};
use super::client::{QueryClient, Subscriber};
use super::key::QueryKey;
use super::tags::TagSet;

/// A live view of one cache entry.
///
/// Running the subscription registers a subscriber on the entry (fetching it
/// if needed) and emits a [`QueryResult`] now and after every change to that
/// entry. Cancelling the subscription unregisters the subscriber; a fetch in
/// flight keeps running and still updates the cache.
///
/// ```rust,ignore
/// fn subscriptions(&self) -> Vec<Subscription<Message>> {
///     vec![Subscription::new(self.api.team_members(PageArgs::for_page(1, 10)))
///         .map(Message::Members)]
/// }
/// ```
pub struct Query<V> {
    key: QueryKey,
    tags: TagSet,
    fetcher: Fetcher,
    client: Arc<QueryClient>,
    _output: PhantomData<fn() -> V>,
}

impl<V> Query<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a query for `key`. Its results carry `tags`, and `fetcher`
    /// loads them from the backend.
    pub fn new<F>(key: QueryKey, tags: TagSet, fetcher: F, client: Arc<QueryClient>) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<V, ApiError>> + Send + Sync + 'static,
    {
        let fetcher: Fetcher = Arc::new(move || {
            fetcher()
                .map_ok(|value| Arc::new(value) as Payload)
                .boxed()
        });
        Self {
            key,
            tags,
            fetcher,
            client,
            _output: PhantomData,
        }
    }

    #[must_use]
    pub const fn key(&self) -> &QueryKey {
        &self.key
    }

    #[must_use]
    pub const fn tags(&self) -> &TagSet {
        &self.tags
    }
}

enum State {
    Initial,
    Watching {
        rx: broadcast::Receiver<QueryKey>,
        // Held for its Drop.
        _subscriber: Subscriber,
    },
}

impl<V> SubscriptionSource for Query<V>
where
    V: Clone + Send + Sync + 'static,
{
    type Output = QueryResult<V>;

    fn stream(&self) -> BoxStream<'static, Self::Output> {
        let key = self.key.clone();
        let tags = self.tags.clone();
        let fetcher = Arc::clone(&self.fetcher);
        let client = Arc::clone(&self.client);

        stream::unfold(State::Initial, move |state| {
            let key = key.clone();
            let tags = tags.clone();
            let fetcher = Arc::clone(&fetcher);
            let client = Arc::clone(&client);

            async move {
                match state {
                    State::Initial => {
                        // Listen before registering so the first fetch's
                        // notifications are not missed.
                        let rx = client.changes();
                        let subscriber = client.subscribe(key.clone(), tags, fetcher);
                        let result = client.snapshot::<V>(&key).unwrap_or_default();
                        Some((
                            result,
                            State::Watching {
                                rx,
                                _subscriber: subscriber,
                            },
                        ))
                    }

                    State::Watching {
                        mut rx,
                        _subscriber,
                    } => loop {
                        match rx.recv().await {
                            Ok(changed) if changed == key => {}
                            Ok(_) => continue,
                            Err(RecvError::Lagged(skipped)) => {
                                trace!(%key, skipped, "query listener lagged");
                            }
                            Err(RecvError::Closed) => return None,
                        }
                        let result = client.snapshot::<V>(&key).unwrap_or_default();
                        return Some((result, State::Watching { rx, _subscriber }));
                    },
                }
            }
        })
        .boxed()
    }

    fn id(&self) -> SubscriptionId {
        let mut hasher = DefaultHasher::new();
        self.key.hash(&mut hasher);
        SubscriptionId::of::<Self>(hasher.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{QueryStatus, Tag};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const ITEMS: Tag = Tag::new("Items");

    fn query(client: &Arc<QueryClient>, calls: &Arc<AtomicUsize>, page: u32) -> Query<String> {
        let calls = Arc::clone(calls);
        Query::new(
            QueryKey::new("getItems", json!({ "page": page })),
            TagSet::from([ITEMS]),
            move || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Ok::<_, ApiError>(format!("page {page}"))
                }
                .boxed()
            },
            Arc::clone(client),
        )
    }

    async fn next_success(stream: &mut BoxStream<'static, QueryResult<String>>) -> QueryResult<String> {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let result = stream.next().await.expect("stream is live");
                if result.is_success() {
                    return result;
                }
            }
        })
        .await
        .expect("query settled")
    }

    #[tokio::test]
    async fn test_emits_loading_then_data() {
        let client = Arc::new(QueryClient::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let mut stream = query(&client, &calls, 1).stream();

        let first = stream.next().await.expect("initial snapshot");
        assert_eq!(first.status, QueryStatus::Loading);
        assert!(first.is_loading());

        let settled = next_success(&mut stream).await;
        assert_eq!(settled.data(), Some(&"page 1".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_two_views_of_one_key_fetch_once() {
        let client = Arc::new(QueryClient::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let mut a = query(&client, &calls, 1).stream();
        let mut b = query(&client, &calls, 1).stream();

        a.next().await;
        b.next().await;
        next_success(&mut a).await;
        next_success(&mut b).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(client.subscriber_count(&QueryKey::new("getItems", json!({ "page": 1 }))), 2);
    }

    #[tokio::test]
    async fn test_invalidation_pushes_fresh_result() {
        let client = Arc::new(QueryClient::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let mut stream = query(&client, &calls, 1).stream();
        stream.next().await;
        next_success(&mut stream).await;

        client.invalidate_tags(&TagSet::from([ITEMS]));
        let refetching = stream.next().await.expect("loading snapshot");
        assert!(refetching.is_fetching());
        assert!(refetching.is_stale);
        assert_eq!(refetching.data(), Some(&"page 1".to_string()));

        let settled = next_success(&mut stream).await;
        assert!(!settled.is_stale);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dropping_stream_releases_subscriber() {
        let client = Arc::new(QueryClient::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::new("getItems", json!({ "page": 3 }));
        let mut stream = query(&client, &calls, 3).stream();
        stream.next().await;
        assert_eq!(client.subscriber_count(&key), 1);

        drop(stream);
        assert_eq!(client.subscriber_count(&key), 0);

        // The fetch started by the dropped view still lands in the cache.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(client.status(&key), Some(QueryStatus::Success));
    }

    #[test]
    fn test_id_follows_key() {
        let client = Arc::new(QueryClient::new());
        let calls = Arc::new(AtomicUsize::new(0));
        assert_eq!(query(&client, &calls, 1).id(), query(&client, &calls, 1).id());
        assert_ne!(query(&client, &calls, 1).id(), query(&client, &calls, 2).id());
    }
}
