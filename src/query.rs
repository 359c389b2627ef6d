//! Tag-invalidated query cache.
//!
//! Reads go through [`Query`] subscriptions backed by a shared [`QueryClient`]:
//! one cache entry per endpoint and argument set, at most one fetch in flight
//! per entry, and every subscriber seeing the same settled snapshot. Writes go
//! through [`Mutation`]s, which on success invalidate the [`Tag`]s declared in
//! the [`TagTable`] so the affected entries refetch.
//!
//! ```text
//!  Query ──subscribe──▶ QueryClient ──spawn──▶ fetcher
//!    ▲                      │  ▲
//!    └──── change notify ───┘  └── invalidate_tags ◀── Mutation / lifecycle
//! ```

mod cache;
mod client;
mod config;
mod key;
pub mod lifecycle;
mod mutation;
mod source;
mod tags;

pub use crate::subscription::SubscriptionSource;
pub use cache::{QueryResult, QueryStatus};
pub use client::QueryClient;
pub use config::QueryConfig;
pub use key::QueryKey;
pub use lifecycle::{Connectivity, LifecycleEvent, LifecycleListeners};
pub use mutation::{Mutation, MutationResult, MutationState};
pub use source::Query;
pub use tags::{Tag, TagSet, TagTable, TagTableBuilder, TagTableError};
