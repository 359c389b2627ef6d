use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Permission level of a team member.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Cannot delete members.
    #[default]
    Regular,
    /// Can delete members.
    Admin,
}

impl Role {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Regular => Self::Admin,
            Self::Admin => Self::Regular,
        }
    }

    /// Longer description shown next to the role choice in forms.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Regular => "Regular - Can't delete members",
            Self::Admin => "Admin - Can delete members",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Regular => "regular",
            Self::Admin => "admin",
        })
    }
}

/// A team member as stored by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TeamMember {
    /// Full name, with an "(admin)" suffix for administrators.
    #[must_use]
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        match self.role {
            Role::Admin => format!("{name} (admin)"),
            Role::Regular => name,
        }
    }

    /// Phone number as `xxx-xxx-xxxx`. Anything that is not ten digits is
    /// returned unchanged.
    #[must_use]
    pub fn formatted_phone(&self) -> String {
        let phone = &self.phone;
        if phone.len() == 10 && phone.bytes().all(|b| b.is_ascii_digit()) {
            format!("{}-{}-{}", &phone[..3], &phone[3..6], &phone[6..])
        } else {
            phone.clone()
        }
    }

    /// The editable part of this record.
    #[must_use]
    pub fn input(&self) -> TeamMemberInput {
        TeamMemberInput {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            role: self.role,
        }
    }
}

/// Body of a create request: a team member without server-assigned fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMemberInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
}

/// Body of an update request: the full editable record including its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMemberUpdate {
    pub id: String,
    #[serde(flatten)]
    pub input: TeamMemberInput,
}

/// A page of a limit/offset paginated collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Number of pages of size `limit` needed for `count` items. Never zero,
    /// so an empty roster still has one (empty) page.
    #[must_use]
    pub fn page_count(&self, limit: u32) -> u64 {
        let limit = u64::from(limit.max(1));
        self.count.div_ceil(limit).max(1)
    }
}

/// Pagination arguments of the list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageArgs {
    pub limit: u32,
    pub offset: u32,
}

impl PageArgs {
    /// Arguments for the 1-based `page` of size `limit`.
    #[must_use]
    pub const fn for_page(page: u32, limit: u32) -> Self {
        let page = if page == 0 { 1 } else { page };
        Self {
            limit,
            offset: (page - 1).saturating_mul(limit),
        }
    }
}
