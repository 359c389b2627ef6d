//! The static relation between endpoints and the data tags they provide or
//! invalidate.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use thiserror::Error;

/// An opaque label grouping queries for invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(&'static str);

impl Tag {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A set of tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet(BTreeSet<Tag>);

impl TagSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, tag: Tag) -> bool {
        self.0.contains(&tag)
    }

    /// Returns `true` if the two sets share at least one tag.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        !self.0.is_disjoint(&other.0)
    }

    pub fn extend(&mut self, other: &Self) {
        self.0.extend(other.0.iter().copied());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = Tag> + '_ {
        self.0.iter().copied()
    }
}

impl<const N: usize> From<[Tag; N]> for TagSet {
    fn from(tags: [Tag; N]) -> Self {
        Self(tags.into_iter().collect())
    }
}

impl FromIterator<Tag> for TagSet {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, tag) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{tag}")?;
        }
        f.write_str("}")
    }
}

/// A tag table that failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TagTableError {
    #[error("endpoint {0} is declared more than once")]
    Duplicate(&'static str),

    #[error("endpoint {0} declares no tags")]
    Empty(&'static str),

    #[error("mutation {endpoint} invalidates {tag}, which no query provides")]
    Unprovided { endpoint: &'static str, tag: Tag },

    #[error("endpoint {0} is not in the tag table")]
    Unknown(&'static str),
}

/// Which tags each query endpoint provides and each mutation invalidates.
///
/// Built once at startup with [`TagTable::builder`] and validated by
/// [`TagTableBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct TagTable {
    provides: HashMap<&'static str, TagSet>,
    invalidates: HashMap<&'static str, TagSet>,
}

impl TagTable {
    #[must_use]
    pub fn builder() -> TagTableBuilder {
        TagTableBuilder::default()
    }

    /// Tags provided by the query `endpoint`.
    ///
    /// # Errors
    ///
    /// [`TagTableError::Unknown`] if `endpoint` is not a declared query.
    pub fn provided_by(&self, endpoint: &'static str) -> Result<&TagSet, TagTableError> {
        self.provides
            .get(endpoint)
            .ok_or(TagTableError::Unknown(endpoint))
    }

    /// Tags invalidated by the mutation `endpoint`.
    ///
    /// # Errors
    ///
    /// [`TagTableError::Unknown`] if `endpoint` is not a declared mutation.
    pub fn invalidated_by(&self, endpoint: &'static str) -> Result<&TagSet, TagTableError> {
        self.invalidates
            .get(endpoint)
            .ok_or(TagTableError::Unknown(endpoint))
    }
}

#[derive(Debug, Default)]
pub struct TagTableBuilder {
    queries: Vec<(&'static str, TagSet)>,
    mutations: Vec<(&'static str, TagSet)>,
}

impl TagTableBuilder {
    /// Declares a query endpoint and the tags its results carry.
    #[must_use]
    pub fn query(mut self, endpoint: &'static str, provides: impl Into<TagSet>) -> Self {
        self.queries.push((endpoint, provides.into()));
        self
    }

    /// Declares a mutation endpoint and the tags it invalidates on success.
    #[must_use]
    pub fn mutation(mut self, endpoint: &'static str, invalidates: impl Into<TagSet>) -> Self {
        self.mutations.push((endpoint, invalidates.into()));
        self
    }

    /// Validates and freezes the table.
    ///
    /// # Errors
    ///
    /// Fails if an endpoint appears twice (as query or mutation), declares an
    /// empty tag set, or if a mutation invalidates a tag no query provides.
    pub fn build(self) -> Result<TagTable, TagTableError> {
        let mut table = TagTable::default();

        for (endpoint, tags) in self.queries {
            if tags.is_empty() {
                return Err(TagTableError::Empty(endpoint));
            }
            if table.provides.insert(endpoint, tags).is_some() {
                return Err(TagTableError::Duplicate(endpoint));
            }
        }

        let mut provided = TagSet::new();
        for tags in table.provides.values() {
            provided.extend(tags);
        }

        for (endpoint, tags) in self.mutations {
            if tags.is_empty() {
                return Err(TagTableError::Empty(endpoint));
            }
            if table.provides.contains_key(endpoint) {
                return Err(TagTableError::Duplicate(endpoint));
            }
            if let Some(tag) = tags.iter().find(|tag| !provided.contains(*tag)) {
                return Err(TagTableError::Unprovided { endpoint, tag });
            }
            if table.invalidates.insert(endpoint, tags).is_some() {
                return Err(TagTableError::Duplicate(endpoint));
            }
        }

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POSTS: Tag = Tag::new("Posts");
    const POST: Tag = Tag::new("Post");

    #[test]
    fn test_intersects() {
        let list = TagSet::from([POSTS]);
        let both = TagSet::from([POSTS, POST]);
        let single = TagSet::from([POST]);
        assert!(list.intersects(&both));
        assert!(!list.intersects(&single));
        assert!(!TagSet::new().intersects(&both));
    }

    #[test]
    fn test_build_and_lookup() {
        let table = TagTable::builder()
            .query("getPosts", [POSTS])
            .query("getPost", [POST])
            .mutation("deletePost", [POSTS, POST])
            .build()
            .expect("valid table");

        assert_eq!(table.provided_by("getPosts"), Ok(&TagSet::from([POSTS])));
        assert_eq!(table.invalidated_by("deletePost").map(TagSet::len), Ok(2));
        assert_eq!(table.provided_by("deletePost"), Err(TagTableError::Unknown("deletePost")));
    }

    #[test]
    fn test_rejects_duplicates() {
        let err = TagTable::builder()
            .query("getPosts", [POSTS])
            .query("getPosts", [POST])
            .build()
            .unwrap_err();
        assert_eq!(err, TagTableError::Duplicate("getPosts"));

        let err = TagTable::builder()
            .query("getPosts", [POSTS])
            .mutation("getPosts", [POSTS])
            .build()
            .unwrap_err();
        assert_eq!(err, TagTableError::Duplicate("getPosts"));
    }

    #[test]
    fn test_rejects_unprovided_and_empty() {
        let err = TagTable::builder()
            .query("getPosts", [POSTS])
            .mutation("deletePost", [POST])
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            TagTableError::Unprovided {
                endpoint: "deletePost",
                tag: POST
            }
        );

        let err = TagTable::builder()
            .query("getPosts", TagSet::new())
            .build()
            .unwrap_err();
        assert_eq!(err, TagTableError::Empty("getPosts"));
    }

    #[test]
    fn test_display() {
        assert_eq!(TagSet::from([POSTS, POST]).to_string(), "{Post, Posts}");
    }
}
