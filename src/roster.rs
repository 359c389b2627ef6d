//! The team member endpoints, wired to the query cache.
//!
//! [`RosterApi`] is the one place that knows which endpoint provides or
//! invalidates which tag. Views ask it for typed [`Query`] and [`Mutation`]
//! handles and never talk to [`ApiClient`] directly.

use std::sync::Arc;

use futures::FutureExt;
use serde_json::json;

use crate::api::{ApiClient, Page, PageArgs, TeamMember, TeamMemberInput, TeamMemberUpdate};
use crate::query::{Mutation, Query, QueryClient, QueryKey, Tag, TagSet, TagTable, TagTableError};

/// The member list, any page.
pub const TEAM_MEMBERS: Tag = Tag::new("TeamMembers");
/// A single member record.
pub const TEAM_MEMBER: Tag = Tag::new("TeamMember");

pub const GET_TEAM_MEMBERS: &str = "getTeamMembers";
pub const GET_TEAM_MEMBER: &str = "getTeamMember";
pub const ADD_TEAM_MEMBER: &str = "addTeamMember";
pub const UPDATE_TEAM_MEMBER: &str = "updateTeamMember";
pub const DELETE_TEAM_MEMBER: &str = "deleteTeamMember";

const QUERIES: [&str; 2] = [GET_TEAM_MEMBERS, GET_TEAM_MEMBER];
const MUTATIONS: [&str; 3] = [ADD_TEAM_MEMBER, UPDATE_TEAM_MEMBER, DELETE_TEAM_MEMBER];

/// Which endpoint provides and invalidates what.
///
/// # Errors
///
/// Only if the table below is inconsistent.
pub fn tag_table() -> Result<TagTable, TagTableError> {
    TagTable::builder()
        .query(GET_TEAM_MEMBERS, [TEAM_MEMBERS])
        .query(GET_TEAM_MEMBER, [TEAM_MEMBER])
        .mutation(ADD_TEAM_MEMBER, [TEAM_MEMBERS])
        .mutation(UPDATE_TEAM_MEMBER, [TEAM_MEMBERS, TEAM_MEMBER])
        .mutation(DELETE_TEAM_MEMBER, [TEAM_MEMBERS, TEAM_MEMBER])
        .build()
}

/// Endpoint factories for the roster.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use roster::api::{ApiClient, PageArgs};
/// use roster::query::QueryClient;
/// use roster::roster::RosterApi;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let api = ApiClient::new("http://localhost:8000/".parse()?);
/// let roster = RosterApi::new(api, Arc::new(QueryClient::new()))?;
/// let first_page = roster.team_members(PageArgs::for_page(1, 10));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RosterApi {
    api: ApiClient,
    queries: Arc<QueryClient>,
    tags: Arc<TagTable>,
}

impl RosterApi {
    /// Builds and checks the tag table.
    ///
    /// # Errors
    ///
    /// Fails when the table is inconsistent or misses one of the endpoints.
    pub fn new(api: ApiClient, queries: Arc<QueryClient>) -> Result<Self, TagTableError> {
        let tags = tag_table()?;
        for endpoint in QUERIES {
            tags.provided_by(endpoint)?;
        }
        for endpoint in MUTATIONS {
            tags.invalidated_by(endpoint)?;
        }
        Ok(Self {
            api,
            queries,
            tags: Arc::new(tags),
        })
    }

    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    #[must_use]
    pub const fn queries(&self) -> &Arc<QueryClient> {
        &self.queries
    }

    #[must_use]
    pub const fn tags(&self) -> &Arc<TagTable> {
        &self.tags
    }

    // Every endpoint was checked in `new`.
    fn provided(&self, endpoint: &'static str) -> TagSet {
        self.tags.provided_by(endpoint).cloned().unwrap_or_default()
    }

    fn invalidated(&self, endpoint: &'static str) -> TagSet {
        self.tags.invalidated_by(endpoint).cloned().unwrap_or_default()
    }

    /// One page of the member list.
    #[must_use]
    pub fn team_members(&self, args: PageArgs) -> Query<Page<TeamMember>> {
        let api = self.api.clone();
        Query::new(
            QueryKey::new(
                GET_TEAM_MEMBERS,
                json!({ "limit": args.limit, "offset": args.offset }),
            ),
            self.provided(GET_TEAM_MEMBERS),
            move || {
                let api = api.clone();
                async move { api.list_team_members(args).await }.boxed()
            },
            Arc::clone(&self.queries),
        )
    }

    /// A single member.
    #[must_use]
    pub fn team_member(&self, id: &str) -> Query<TeamMember> {
        let api = self.api.clone();
        let id = id.to_string();
        Query::new(
            QueryKey::new(GET_TEAM_MEMBER, json!(id)),
            self.provided(GET_TEAM_MEMBER),
            move || {
                let api = api.clone();
                let id = id.clone();
                async move { api.get_team_member(&id).await }.boxed()
            },
            Arc::clone(&self.queries),
        )
    }

    #[must_use]
    pub fn add_team_member(&self) -> Mutation<TeamMemberInput, TeamMember> {
        let api = self.api.clone();
        Mutation::new(
            ADD_TEAM_MEMBER,
            self.invalidated(ADD_TEAM_MEMBER),
            move |input: TeamMemberInput| {
                let api = api.clone();
                async move { api.create_team_member(&input).await }.boxed()
            },
            Arc::clone(&self.queries),
        )
    }

    #[must_use]
    pub fn update_team_member(&self) -> Mutation<TeamMemberUpdate, TeamMember> {
        let api = self.api.clone();
        Mutation::new(
            UPDATE_TEAM_MEMBER,
            self.invalidated(UPDATE_TEAM_MEMBER),
            move |update: TeamMemberUpdate| {
                let api = api.clone();
                async move { api.update_team_member(&update).await }.boxed()
            },
            Arc::clone(&self.queries),
        )
    }

    /// Deletes the member with the given id.
    #[must_use]
    pub fn delete_team_member(&self) -> Mutation<String, ()> {
        let api = self.api.clone();
        Mutation::new(
            DELETE_TEAM_MEMBER,
            self.invalidated(DELETE_TEAM_MEMBER),
            move |id: String| {
                let api = api.clone();
                async move { api.delete_team_member(&id).await }.boxed()
            },
            Arc::clone(&self.queries),
        )
    }
}
