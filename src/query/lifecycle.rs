//! Refetching on terminal focus and network reconnect.
//!
//! [`LifecycleListeners`] turns process-wide events into cache refreshes. The
//! events come from two subscriptions the application runs for its whole life:
//! [`TerminalEvents`](crate::subscription::terminal::TerminalEvents) for focus
//! and [`Connectivity`] for reachability of the backend.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::Event;
use futures::StreamExt;
use futures::future;
use futures::stream::BoxStream;
use reqwest::Url;
use tokio::net::TcpStream;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, info};

use crate::subscription::{SubscriptionId, SubscriptionSource};

use super::client::QueryClient;
use super::config::QueryConfig;

/// Upper bound for a single reachability probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    FocusGained,
    FocusLost,
    ConnectionLost,
    Reconnected,
}

impl LifecycleEvent {
    /// The lifecycle meaning of a terminal event, if it has one.
    #[must_use]
    pub const fn from_terminal(event: &Event) -> Option<Self> {
        match event {
            Event::FocusGained => Some(Self::FocusGained),
            Event::FocusLost => Some(Self::FocusLost),
            _ => None,
        }
    }
}

/// Refreshes active queries when the user comes back or the network does.
///
/// Created once at startup; lives as long as the application.
#[derive(Debug, Clone)]
pub struct LifecycleListeners {
    client: Arc<QueryClient>,
    refetch_on_focus: bool,
    refetch_on_reconnect: bool,
}

impl LifecycleListeners {
    #[must_use]
    pub const fn install(client: Arc<QueryClient>, config: &QueryConfig) -> Self {
        Self {
            client,
            refetch_on_focus: config.refetch_on_focus,
            refetch_on_reconnect: config.refetch_on_reconnect,
        }
    }

    /// Reacts to `event`. Returns the number of refetches started.
    pub fn handle(&self, event: LifecycleEvent) -> usize {
        let refetch = match event {
            LifecycleEvent::FocusGained => self.refetch_on_focus,
            LifecycleEvent::Reconnected => self.refetch_on_reconnect,
            LifecycleEvent::FocusLost | LifecycleEvent::ConnectionLost => false,
        };
        if !refetch {
            debug!(?event, "lifecycle event ignored");
            return 0;
        }

        let started = self.client.refetch_active();
        info!(?event, started, "refetching active queries");
        started
    }
}

/// Periodically checks that the backend host accepts TCP connections.
///
/// Emits [`LifecycleEvent::ConnectionLost`] when the host stops answering (or
/// does not answer the first probe) and [`LifecycleEvent::Reconnected`] when it
/// answers again. Steady states produce nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Connectivity {
    target: String,
    interval: Duration,
}

impl Connectivity {
    /// Probes `target` (`host:port`) every `interval`.
    #[must_use]
    pub fn new(target: impl Into<String>, interval: Duration) -> Self {
        Self {
            target: target.into(),
            interval,
        }
    }

    /// Probes the host and port `url` points at. `None` when the URL has no
    /// host or no known port.
    #[must_use]
    pub fn for_url(url: &Url, interval: Duration) -> Option<Self> {
        let host = url.host_str()?;
        let port = url.port_or_known_default()?;
        Some(Self::new(format!("{host}:{port}"), interval))
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }
}

async fn probe(target: String, timeout: Duration) -> bool {
    matches!(
        tokio::time::timeout(timeout, TcpStream::connect(target.as_str())).await,
        Ok(Ok(_))
    )
}

/// The event a probe result implies, given the previous one.
const fn transition(previous: Option<bool>, online: bool) -> Option<LifecycleEvent> {
    match (previous, online) {
        (None | Some(true), false) => Some(LifecycleEvent::ConnectionLost),
        (Some(false), true) => Some(LifecycleEvent::Reconnected),
        _ => None,
    }
}

impl SubscriptionSource for Connectivity {
    type Output = LifecycleEvent;

    fn stream(&self) -> BoxStream<'static, LifecycleEvent> {
        let target = self.target.clone();
        let timeout = self.interval.min(PROBE_TIMEOUT);
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        IntervalStream::new(interval)
            .then(move |_| probe(target.clone(), timeout))
            .scan(None, |previous, online| {
                let event = transition(*previous, online);
                if event.is_some() {
                    debug!(online, "connectivity changed");
                }
                *previous = Some(online);
                future::ready(Some(event))
            })
            .filter_map(future::ready)
            .boxed()
    }

    fn id(&self) -> SubscriptionId {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        SubscriptionId::of::<Self>(hasher.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::query::{Query, QueryKey, QueryStatus, Tag, TagSet};
    use futures::FutureExt;
    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    #[test]
    fn test_transition_table() {
        assert_eq!(transition(None, true), None);
        assert_eq!(transition(None, false), Some(LifecycleEvent::ConnectionLost));
        assert_eq!(transition(Some(true), false), Some(LifecycleEvent::ConnectionLost));
        assert_eq!(transition(Some(false), true), Some(LifecycleEvent::Reconnected));
        assert_eq!(transition(Some(true), true), None);
        assert_eq!(transition(Some(false), false), None);
    }

    #[test]
    fn test_for_url_uses_default_port() {
        let url = Url::parse("https://roster.example.com/api/").expect("valid url");
        let probe = Connectivity::for_url(&url, Duration::from_secs(5)).expect("has host");
        assert_eq!(probe.target(), "roster.example.com:443");

        let url = Url::parse("http://127.0.0.1:8000/").expect("valid url");
        let probe = Connectivity::for_url(&url, Duration::from_secs(5)).expect("has host");
        assert_eq!(probe.target(), "127.0.0.1:8000");
    }

    #[test]
    fn test_terminal_focus_mapping() {
        assert_eq!(
            LifecycleEvent::from_terminal(&Event::FocusGained),
            Some(LifecycleEvent::FocusGained)
        );
        assert_eq!(LifecycleEvent::from_terminal(&Event::Resize(80, 24)), None);
    }

    #[tokio::test]
    async fn test_connectivity_reports_lost_host() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let mut events = Connectivity::new(addr.to_string(), Duration::from_millis(20)).stream();

        // Reachable: no event yet.
        assert!(timeout(Duration::from_millis(60), events.next()).await.is_err());

        drop(listener);
        let event = timeout(Duration::from_secs(2), events.next()).await.expect("event arrives");
        assert_eq!(event, Some(LifecycleEvent::ConnectionLost));
    }

    #[tokio::test]
    async fn test_handle_refetches_active_queries_only_when_enabled() {
        let client = Arc::new(QueryClient::new());
        let query = Query::new(
            QueryKey::new("getItems", json!(null)),
            TagSet::from([Tag::new("Items")]),
            || async { Ok::<_, ApiError>(1_u32) }.boxed(),
            Arc::clone(&client),
        );
        let mut view = query.stream();
        view.next().await;
        let key = QueryKey::new("getItems", json!(null));
        timeout(Duration::from_secs(1), async {
            while client.status(&key) != Some(QueryStatus::Success) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("settled");

        let listeners = LifecycleListeners::install(Arc::clone(&client), &QueryConfig::default());
        assert_eq!(listeners.handle(LifecycleEvent::FocusLost), 0);
        assert_eq!(listeners.handle(LifecycleEvent::ConnectionLost), 0);
        assert_eq!(listeners.handle(LifecycleEvent::FocusGained), 1);

        let quiet = LifecycleListeners::install(
            Arc::clone(&client),
            &QueryConfig::default().with_refetch_on_reconnect(false),
        );
        assert_eq!(quiet.handle(LifecycleEvent::Reconnected), 0);
    }

    #[test]
    fn test_connectivity_id_follows_target() {
        let a = Connectivity::new("a:1", Duration::from_secs(5));
        let b = Connectivity::new("b:1", Duration::from_secs(5));
        assert_eq!(a.id(), a.clone().id());
        assert_ne!(a.id(), b.id());
    }
}
