//! Common imports.
//!
//! ```
//! use roster::prelude::*;
//! ```

pub use crate::api::{ApiClient, ApiError, FieldErrors, Page, PageArgs, Role, TeamMember};
pub use crate::application::Application;
pub use crate::command::{Action, Command};
pub use crate::query::{Mutation, MutationResult, Query, QueryClient, QueryResult, QueryStatus, TagSet};
pub use crate::roster::RosterApi;
pub use crate::runtime::Runtime;
pub use crate::subscription::{Subscription, SubscriptionSource};
