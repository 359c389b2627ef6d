use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Why a request to the roster service did not produce a usable response.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    ///
    /// `body` is the parsed JSON error body, or the raw text as a JSON string
    /// when it was not JSON. Use [`ApiError::field_errors`] to read it as
    /// per-field messages.
    #[error("server rejected the request with status {status}")]
    Http { status: u16, body: Value },

    /// No response was obtained: connection refused, DNS failure, reset,
    /// transport timeout.
    #[error("network error: {0}")]
    Transport(String),

    /// A 2xx response whose body did not have the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// HTTP status of a rejected request.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The error body read as field -> messages, when it has that shape.
    #[must_use]
    pub fn field_errors(&self) -> Option<FieldErrors> {
        match self {
            Self::Http { body, .. } => FieldErrors::from_body(body),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Ordered messages per form field, as returned by the server on a 400 or
/// produced by client-side validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads an error body of the form `{"field": ["message", ...]}`.
    ///
    /// A bare string value is taken as a single message. Returns `None` when the
    /// body is not an object or holds anything else.
    #[must_use]
    pub fn from_body(body: &Value) -> Option<Self> {
        let object = body.as_object()?;
        let mut errors = Self::new();
        for (field, messages) in object {
            match messages {
                Value::String(message) => errors.push(field, message.clone()),
                Value::Array(items) => {
                    for item in items {
                        errors.push(field, item.as_str()?.to_string());
                    }
                }
                _ => return None,
            }
        }
        Some(errors)
    }

    /// Appends a message for `field`.
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// All messages for `field`, in server order.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// The message shown next to a form field.
    #[must_use]
    pub fn first(&self, field: &str) -> Option<&str> {
        self.get(field)?.first().map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}
