//! Long-lived event sources.
//!
//! A [`SubscriptionSource`] describes a stream (terminal input, a cached query,
//! a connectivity probe). [`Subscription`] erases its type and lets the
//! application map its output into messages. The [`SubscriptionManager`] keeps
//! exactly one running task per [`SubscriptionId`].

pub mod terminal;

use std::any::TypeId;
use std::collections::{HashMap, HashSet};

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::command::Action;

/// Identity of a running subscription: the source type plus a hash of its
/// parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId {
    type_id: TypeId,
    hash: u64,
}

impl SubscriptionId {
    /// Builds the id for a source of type `T` with parameter hash `hash`.
    #[must_use]
    pub fn of<T: 'static>(hash: u64) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            hash,
        }
    }
}

/// Something that can be turned into a stream of values.
pub trait SubscriptionSource: Send + 'static {
    type Output: Send + 'static;

    /// Creates a fresh stream. Called once each time the subscription starts.
    fn stream(&self) -> BoxStream<'static, Self::Output>;

    /// Stable identity used to diff subscriptions between updates.
    fn id(&self) -> SubscriptionId;
}

/// A type-erased subscription producing messages of type `Msg`.
pub struct Subscription<Msg> {
    pub(crate) id: SubscriptionId,
    pub(crate) spawn: Box<dyn Fn() -> BoxStream<'static, Msg> + Send>,
}

impl<Msg: Send + 'static> Subscription<Msg> {
    /// Wraps a source.
    pub fn new<S>(source: S) -> Self
    where
        S: SubscriptionSource<Output = Msg>,
    {
        let id = source.id();
        Self {
            id,
            spawn: Box::new(move || source.stream()),
        }
    }

    /// Converts the output of this subscription.
    ///
    /// The id is unchanged, so mapping never restarts a running subscription.
    #[must_use]
    pub fn map<N, F>(self, f: F) -> Subscription<N>
    where
        N: Send + 'static,
        F: Fn(Msg) -> N + Clone + Send + Sync + 'static,
    {
        let spawn = self.spawn;
        Subscription {
            id: self.id,
            spawn: Box::new(move || (spawn)().map(f.clone()).boxed()),
        }
    }

    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }
}

/// Handle for a running subscription task.
struct Handle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl Handle {
    /// Cancels the task and waits for it to finish.
    async fn cancel(self) {
        self.token.cancel();
        let _ = self.join.await;
    }
}

/// Starts and stops subscription tasks as the application's wishes change.
pub struct SubscriptionManager<Msg> {
    running: HashMap<SubscriptionId, Handle>,
    tx: mpsc::UnboundedSender<Action<Msg>>,
}

impl<Msg: Send + 'static> SubscriptionManager<Msg> {
    pub fn new(tx: mpsc::UnboundedSender<Action<Msg>>) -> Self {
        Self {
            running: HashMap::new(),
            tx,
        }
    }

    /// Reconciles running tasks with `subscriptions`.
    ///
    /// New ids are started, ids no longer listed are cancelled, the rest are
    /// left alone.
    pub fn update(&mut self, subscriptions: Vec<Subscription<Msg>>) {
        let mut wanted = HashSet::with_capacity(subscriptions.len());

        for subscription in subscriptions {
            wanted.insert(subscription.id);
            if !self.running.contains_key(&subscription.id) {
                let id = subscription.id;
                let handle = self.start(&subscription);
                self.running.insert(id, handle);
            }
        }

        let retired: Vec<_> = self
            .running
            .keys()
            .filter(|id| !wanted.contains(id))
            .copied()
            .collect();
        for id in retired {
            if let Some(handle) = self.running.remove(&id) {
                handle.token.cancel();
            }
        }
    }

    /// Number of running subscription tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.running.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.running.is_empty()
    }

    /// Cancels everything and waits for the tasks to wind down.
    pub async fn shutdown(&mut self) {
        for (_, handle) in self.running.drain() {
            handle.cancel().await;
        }
    }

    fn start(&self, subscription: &Subscription<Msg>) -> Handle {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let tx = self.tx.clone();
        let mut stream = (subscription.spawn)();

        let join = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancelled.cancelled() => break,
                    item = stream.next() => match item {
                        Some(msg) => {
                            if tx.send(Action::Message(msg)).is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
        });

        Handle { token, join }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::time::Duration;

    struct Numbers(u64);

    impl SubscriptionSource for Numbers {
        type Output = u64;

        fn stream(&self) -> BoxStream<'static, u64> {
            stream::iter(vec![self.0, self.0 + 1]).boxed()
        }

        fn id(&self) -> SubscriptionId {
            SubscriptionId::of::<Self>(self.0)
        }
    }

    struct Forever;

    impl SubscriptionSource for Forever {
        type Output = ();

        fn stream(&self) -> BoxStream<'static, ()> {
            stream::pending().boxed()
        }

        fn id(&self) -> SubscriptionId {
            SubscriptionId::of::<Self>(0)
        }
    }

    #[test]
    fn test_id_depends_on_type_and_hash() {
        assert_eq!(
            SubscriptionId::of::<Numbers>(1),
            SubscriptionId::of::<Numbers>(1)
        );
        assert_ne!(
            SubscriptionId::of::<Numbers>(1),
            SubscriptionId::of::<Numbers>(2)
        );
        assert_ne!(
            SubscriptionId::of::<Numbers>(0),
            SubscriptionId::of::<Forever>(0)
        );
    }

    #[tokio::test]
    async fn test_map_converts_output_and_keeps_id() {
        let sub = Subscription::new(Numbers(10));
        let id = sub.id();
        let mapped = sub.map(|n| n * 2);
        assert_eq!(mapped.id(), id);

        let values: Vec<_> = (mapped.spawn)().collect().await;
        assert_eq!(values, vec![20, 22]);
    }

    #[tokio::test]
    async fn test_manager_forwards_messages() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut manager = SubscriptionManager::new(tx);
        manager.update(vec![Subscription::new(Numbers(5))]);

        let mut received = vec![];
        for _ in 0..2 {
            let action = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .expect("message within timeout")
                .expect("channel open");
            if let Action::Message(n) = action {
                received.push(n);
            }
        }
        assert_eq!(received, vec![5, 6]);
    }

    #[tokio::test]
    async fn test_manager_keeps_same_id_and_retires_missing() {
        let (tx, _rx) = mpsc::unbounded_channel::<Action<()>>();
        let mut manager = SubscriptionManager::new(tx);

        manager.update(vec![Subscription::new(Forever)]);
        assert_eq!(manager.len(), 1);

        manager.update(vec![Subscription::new(Forever)]);
        assert_eq!(manager.len(), 1);

        manager.update(vec![]);
        assert!(manager.is_empty());

        manager.shutdown().await;
    }
}
