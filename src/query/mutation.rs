//! Writes to the backend.
//!
//! A [`Mutation`] is a one-off operation: it runs as a [`Command`] and reports
//! back once. On success it invalidates its tags in the [`QueryClient`] before
//! the result is delivered, so every view holding affected data is already
//! refetching when `update` sees the outcome.

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::api::{ApiError, FieldErrors};
use crate::command::Command;

use super::client::QueryClient;
use super::tags::TagSet;

/// Where a mutation stands.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationState<O> {
    /// Not started.
    Idle,
    /// Request in flight.
    Loading,
    /// The server accepted the write.
    Success(O),
    /// The request failed. Nothing was invalidated.
    Error(ApiError),
}

/// Outcome of running a [`Mutation`].
///
/// Views keep one per write they can issue: [`loading`](Self::loading) when
/// the command is triggered, then the delivered result.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationResult<O> {
    pub state: MutationState<O>,
}

impl<O> Default for MutationResult<O> {
    fn default() -> Self {
        Self {
            state: MutationState::Idle,
        }
    }
}

impl<O> MutationResult<O> {
    #[must_use]
    pub const fn loading() -> Self {
        Self {
            state: MutationState::Loading,
        }
    }

    #[must_use]
    pub const fn success(output: O) -> Self {
        Self {
            state: MutationState::Success(output),
        }
    }

    #[must_use]
    pub const fn failure(err: ApiError) -> Self {
        Self {
            state: MutationState::Error(err),
        }
    }

    /// The server's response if the mutation succeeded.
    pub const fn data(&self) -> Option<&O> {
        match &self.state {
            MutationState::Success(data) => Some(data),
            _ => None,
        }
    }

    pub const fn error(&self) -> Option<&ApiError> {
        match &self.state {
            MutationState::Error(err) => Some(err),
            _ => None,
        }
    }

    /// Per-field messages of a rejected write.
    pub fn field_errors(&self) -> Option<FieldErrors> {
        self.error().and_then(ApiError::field_errors)
    }

    pub const fn is_idle(&self) -> bool {
        matches!(self.state, MutationState::Idle)
    }

    pub const fn is_loading(&self) -> bool {
        matches!(self.state, MutationState::Loading)
    }

    pub const fn is_success(&self) -> bool {
        matches!(self.state, MutationState::Success(_))
    }

    pub const fn is_error(&self) -> bool {
        matches!(self.state, MutationState::Error(_))
    }
}

type Performer<I, O> = Arc<dyn Fn(I) -> BoxFuture<'static, Result<O, ApiError>> + Send + Sync>;

/// A write endpoint bound to the tags it invalidates.
///
/// ```rust,ignore
/// Message::Submit(input) => self
///     .api
///     .add_team_member()
///     .trigger(input)
///     .map(Message::Saved),
/// ```
pub struct Mutation<I, O> {
    endpoint: &'static str,
    performer: Performer<I, O>,
    invalidates: TagSet,
    client: Arc<QueryClient>,
}

impl<I, O> Clone for Mutation<I, O> {
    fn clone(&self) -> Self {
        Self {
            endpoint: self.endpoint,
            performer: Arc::clone(&self.performer),
            invalidates: self.invalidates.clone(),
            client: Arc::clone(&self.client),
        }
    }
}

impl<I, O> Mutation<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub fn new<F>(endpoint: &'static str, invalidates: TagSet, performer: F, client: Arc<QueryClient>) -> Self
    where
        F: Fn(I) -> BoxFuture<'static, Result<O, ApiError>> + Send + Sync + 'static,
    {
        Self {
            endpoint,
            performer: Arc::new(performer),
            invalidates,
            client,
        }
    }

    #[must_use]
    pub const fn endpoint(&self) -> &'static str {
        self.endpoint
    }

    #[must_use]
    pub const fn invalidates(&self) -> &TagSet {
        &self.invalidates
    }

    /// Sends the write and, if it succeeds, invalidates this mutation's tags.
    pub async fn run(&self, input: I) -> MutationResult<O> {
        match (self.performer)(input).await {
            Ok(output) => {
                debug!(endpoint = self.endpoint, tags = %self.invalidates, "mutation succeeded");
                self.client.invalidate_tags(&self.invalidates);
                MutationResult::success(output)
            }
            Err(err) => {
                warn!(endpoint = self.endpoint, error = %err, "mutation failed");
                MutationResult::failure(err)
            }
        }
    }

    /// [`run`](Self::run) as a command producing the result as its message.
    pub fn trigger(&self, input: I) -> Command<MutationResult<O>> {
        let mutation = self.clone();
        Command::future(async move { mutation.run(input).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Query, QueryKey, QueryStatus, SubscriptionSource, Tag};
    use futures::{FutureExt, StreamExt};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const ITEMS: Tag = Tag::new("Items");

    fn rejecting(client: &Arc<QueryClient>) -> Mutation<String, ()> {
        Mutation::new(
            "addItem",
            TagSet::from([ITEMS]),
            |_| {
                async {
                    Err::<(), _>(ApiError::Http {
                        status: 400,
                        body: json!({ "email": ["Enter a valid email address."] }),
                    })
                }
                .boxed()
            },
            Arc::clone(client),
        )
    }

    fn accepting(client: &Arc<QueryClient>) -> Mutation<String, String> {
        Mutation::new(
            "addItem",
            TagSet::from([ITEMS]),
            |name| async move { Ok::<_, ApiError>(name) }.boxed(),
            Arc::clone(client),
        )
    }

    fn items(client: &Arc<QueryClient>, calls: &Arc<AtomicUsize>) -> Query<usize> {
        let calls = Arc::clone(calls);
        Query::new(
            QueryKey::new("getItems", json!(null)),
            TagSet::from([ITEMS]),
            move || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Ok::<_, ApiError>(n) }.boxed()
            },
            Arc::clone(client),
        )
    }

    async fn settled(view: &mut futures::stream::BoxStream<'static, crate::query::QueryResult<usize>>, want: usize) {
        tokio::time::timeout(Duration::from_secs(1), async {
            while !view.next().await.is_some_and(|r| r.data == Some(want)) {}
        })
        .await
        .expect("view settled");
    }

    #[test]
    fn test_result_predicates() {
        let idle: MutationResult<u32> = MutationResult::default();
        assert!(idle.is_idle());
        assert_eq!(idle.data(), None);

        let pending: MutationResult<u32> = MutationResult::loading();
        assert!(pending.is_loading());
        assert!(!pending.is_idle());

        let ok = MutationResult::success(4);
        assert!(ok.is_success());
        assert_eq!(ok.data(), Some(&4));
        assert!(ok.error().is_none());

        let failed: MutationResult<u32> = MutationResult::failure(ApiError::Transport("down".into()));
        assert!(failed.is_error());
        assert!(failed.field_errors().is_none());
    }

    #[tokio::test]
    async fn test_success_invalidates_tags() {
        let client = Arc::new(QueryClient::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let mut view = items(&client, &calls).stream();
        settled(&mut view, 1).await;

        let result = accepting(&client).run("new".into()).await;
        assert_eq!(result.data(), Some(&"new".to_string()));

        settled(&mut view, 2).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_leaves_cache_untouched() {
        let client = Arc::new(QueryClient::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let mut view = items(&client, &calls).stream();
        settled(&mut view, 1).await;
        let key = QueryKey::new("getItems", json!(null));
        assert_eq!(client.status(&key), Some(QueryStatus::Success));

        let result = rejecting(&client).run("bad".into()).await;
        let errors = result.field_errors().expect("field errors");
        assert_eq!(errors.first("email"), Some("Enter a valid email address."));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(client.status(&key), Some(QueryStatus::Success));
    }

    #[tokio::test]
    async fn test_trigger_delivers_one_message() {
        let client = Arc::new(QueryClient::new());
        let cmd = accepting(&client).trigger("x".into());
        let actions: Vec<_> = cmd.stream.expect("has effect").collect().await;
        assert_eq!(actions.len(), 1);
    }
}
