//! Client for the remote team member resource.
//!
//! [`ApiClient`] maps a request description to `Result<_, ApiError>` and has
//! no other side effects. Caching and refetching live in [`crate::query`].

mod client;
mod error;
mod types;

pub use client::ApiClient;
pub use error::{ApiError, FieldErrors};
pub use types::{Page, PageArgs, Role, TeamMember, TeamMemberInput, TeamMemberUpdate};
