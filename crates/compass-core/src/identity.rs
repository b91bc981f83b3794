//! # Domain Identity Newtypes
//!
//! Newtype wrappers for all domain identifiers in Compass. These prevent
//! accidental identifier confusion — you cannot pass a `ControlId` where a
//! `PolicyId` is expected, even though both wrap a UUID.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a compliance framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameworkId(pub Uuid);

/// Unique identifier for a category within a framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub Uuid);

/// Unique identifier for a control within a framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControlId(pub Uuid);

/// Unique identifier for an organizational policy.
///
/// Policies themselves are owned by the surrounding application; Compass
/// only ever sees them as the source end of a mapping record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyId(pub Uuid);

/// Unique identifier for a policy-control mapping record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MappingId(pub Uuid);

/// Unique identifier for one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalysisId(pub Uuid);

/// Reference to the user who triggered an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

macro_rules! impl_id {
    ($name:ident, $prefix:literal) => {
        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

impl_id!(FrameworkId, "framework");
impl_id!(CategoryId, "category");
impl_id!(ControlId, "control");
impl_id!(PolicyId, "policy");
impl_id!(MappingId, "mapping");
impl_id!(AnalysisId, "analysis");
impl_id!(UserId, "user");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_are_distinct() {
        assert_ne!(ControlId::new(), ControlId::new());
        assert_ne!(AnalysisId::new(), AnalysisId::new());
    }

    #[test]
    fn display_carries_namespace_prefix() {
        let id = FrameworkId::new();
        assert!(id.to_string().starts_with("framework:"));
        assert!(PolicyId::new().to_string().starts_with("policy:"));
    }

    #[test]
    fn serde_roundtrip() {
        let id = MappingId::new();
        let json = serde_json::to_string(&id).unwrap();
        let parsed: MappingId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn serializes_as_bare_uuid() {
        let id = ControlId::new();
        let json = serde_json::to_string(&id).unwrap();
        // The newtype is transparent on the wire.
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
    }
}
