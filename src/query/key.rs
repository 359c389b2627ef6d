use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;
use serde_json::Value;

/// Identity of a read request: endpoint name plus its arguments.
///
/// Two keys are equal when the endpoint and the arguments are deeply equal, so
/// `{"limit": 10, "offset": 0}` and `{"offset": 0, "limit": 10}` name the same
/// cache entry while `{"limit": 10, "offset": 10}` names another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryKey {
    endpoint: &'static str,
    args: Value,
}

impl QueryKey {
    #[must_use]
    pub const fn new(endpoint: &'static str, args: Value) -> Self {
        Self { endpoint, args }
    }

    /// Builds a key from any serializable argument value.
    ///
    /// # Errors
    ///
    /// Fails when `args` cannot be represented as JSON (for example a map with
    /// non-string keys).
    pub fn from_args<A: Serialize + ?Sized>(
        endpoint: &'static str,
        args: &A,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(endpoint, serde_json::to_value(args)?))
    }

    #[must_use]
    pub const fn endpoint(&self) -> &'static str {
        self.endpoint
    }

    #[must_use]
    pub const fn args(&self) -> &Value {
        &self.args
    }
}

impl Hash for QueryKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.endpoint.hash(state);
        // Object keys are sorted, so equal values render identically.
        self.args.to_string().hash(state);
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.endpoint, self.args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[derive(Serialize)]
    struct Args {
        offset: u32,
        limit: u32,
    }

    #[test]
    fn test_equal_args_are_one_key() {
        let a = QueryKey::new("getTeamMembers", json!({"limit": 10, "offset": 0}));
        let b = QueryKey::from_args("getTeamMembers", &Args { offset: 0, limit: 10 }).expect("serializes");
        assert_eq!(a, b);

        let keys: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn test_different_args_or_endpoint_differ() {
        let page1 = QueryKey::new("getTeamMembers", json!({"limit": 10, "offset": 0}));
        let page2 = QueryKey::new("getTeamMembers", json!({"limit": 10, "offset": 10}));
        let other = QueryKey::new("getTeamMember", json!({"limit": 10, "offset": 0}));
        assert_ne!(page1, page2);
        assert_ne!(page1, other);
    }

    #[test]
    fn test_display() {
        let key = QueryKey::new("getTeamMember", json!("42"));
        assert_eq!(key.to_string(), "getTeamMember(\"42\")");
    }
}
