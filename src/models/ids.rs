//! Identifier newtypes.
//!
//! All identifiers are opaque strings. Generated identifiers are `UUIDv7`,
//! so lexical order follows creation order.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from an existing string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generates a new time-ordered identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::now_v7().to_string())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

define_id!(
    /// Unique identifier for a user.
    UserId
);

define_id!(
    /// Unique identifier for a genre.
    GenreId
);

define_id!(
    /// Unique identifier for a keyword node.
    KeywordId
);

define_id!(
    /// Unique identifier for a submitted project.
    ProjectId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_time_ordered() {
        let first = KeywordId::generate();
        let second = KeywordId::generate();
        assert!(first < second);
    }

    #[test]
    fn test_id_preserves_string() {
        let id = GenreId::new("genre-1");
        assert_eq!(id.as_str(), "genre-1");
        assert_eq!(id.to_string(), "genre-1");
        assert_eq!(GenreId::from("genre-1"), id);
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = UserId::new("u1");
        assert_eq!(serde_json::to_string(&id).unwrap_or_default(), "\"u1\"");
    }
}
