// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier newtypes used across the orchestrator.

/// Define a newtype ID wrapper around `String`.
///
/// Generates `new()`, `as_str()`, `Display`, `From<String>`, `From<&str>`,
/// `PartialEq<str>`, `PartialEq<&str>`, and `Borrow<str>` implementations.
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
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

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

crate::define_id! {
    /// Identifier of one supervised agent session.
    ///
    /// Stable across daemon restarts; allocated as `{project prefix}-{n}`
    /// by the session manager (or by external-PR adoption).
    pub struct SessionId;
}

impl SessionId {
    /// Build the canonical `{prefix}-{n}` id.
    pub fn numbered(prefix: &str, n: u64) -> Self {
        Self::new(format!("{}-{}", prefix, n))
    }

    /// Parse the numeric suffix of a `{prefix}-{n}` id, if it has one.
    pub fn sequence(&self, prefix: &str) -> Option<u64> {
        self.0
            .strip_prefix(prefix)?
            .strip_prefix('-')?
            .parse()
            .ok()
    }
}

crate::define_id! {
    /// Identifier of a configured project.
    pub struct ProjectId;
}

crate::define_id! {
    /// Identifier of a tracker issue.
    pub struct IssueId;
}

crate::define_id! {
    /// Identifier of an orchestrator event.
    pub struct EventId;
}

impl EventId {
    /// Generate a fresh random event id.
    pub fn generate() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
