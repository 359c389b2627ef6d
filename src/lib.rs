//! # Roster
//!
//! A terminal console for a team roster service, built on a small Elm
//! architecture runtime and a tag-invalidated query cache.
//!
//! ## Layers
//!
//! - [`runtime`], [`application`], [`command`], [`subscription`]: the event
//!   loop. An [`Application`](application::Application) turns messages into a
//!   new model plus [`Command`](command::Command)s, and declares the
//!   [`Subscription`](subscription::Subscription)s it wants.
//! - [`api`]: the HTTP client for the `teammembers/` resource.
//! - [`query`]: the cache. Reads are [`Query`](query::Query) subscriptions
//!   deduplicated per endpoint and arguments; writes are
//!   [`Mutation`](query::Mutation)s that invalidate tags on success.
//! - [`roster`]: the tag table and one factory per endpoint.
//! - [`app`]: the screens.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use roster::api::{ApiClient, PageArgs};
//! use roster::query::{QueryClient, SubscriptionSource};
//! use roster::roster::RosterApi;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use futures::StreamExt;
//!
//! let api = ApiClient::new("http://localhost:8000/".parse()?);
//! let roster = RosterApi::new(api, Arc::new(QueryClient::new()))?;
//!
//! let mut first_page = roster.team_members(PageArgs::for_page(1, 10)).stream();
//! while let Some(result) = first_page.next().await {
//!     if let Some(page) = result.data() {
//!         println!("{} members", page.count);
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod app;
pub mod application;
pub mod command;
pub mod config;
pub mod logging;
pub mod prelude;
pub mod query;
pub mod roster;
pub mod route;
pub mod runtime;
pub mod subscription;
pub mod validate;
