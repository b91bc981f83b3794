//! # compass-core — Foundational Types for Compass
//!
//! This crate is the bedrock of the Compass stack. It defines the domain
//! primitives every other crate builds on: identifier newtypes, the ordered
//! coverage-level and severity enumerations, the immutable framework model,
//! and policy-control mapping records. Every other crate in the workspace
//! depends on `compass-core`; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `FrameworkId`, `ControlId`,
//!    `PolicyId`, `AnalysisId` — all newtypes. No bare UUIDs in domain
//!    signatures, so a control identifier can never be passed where a policy
//!    identifier is expected.
//!
//! 2. **Ordered enumerations, not strings.** `CoverageLevel` carries an
//!    explicit total order (`None < Partial < Full`) so the max-rule for
//!    effective coverage is `Ord::max`, never string comparison. `Severity`
//!    is ordered the same way for deterministic gap sorting.
//!
//! 3. **Immutable framework model.** A [`Framework`] is built once from a
//!    [`FrameworkDefinition`] through a validating constructor that rejects
//!    duplicate codes, unknown parents, and category cycles. After load it is
//!    read-only: categories live in an arena addressed by id, children and
//!    control ownership are derived indexes, and lookups are O(1).
//!
//! ## Crate Policy
//!
//! - No dependencies on other `compass-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug` and `Clone`; wire/storage shapes
//!   additionally implement `Serialize`/`Deserialize`. The frozen
//!   [`Framework`] model is deliberately not serialized — persistence always
//!   stores the [`FrameworkDefinition`] and rebuilds the model on load.

pub mod coverage;
pub mod error;
pub mod framework;
pub mod identity;
pub mod mapping;
pub mod severity;

// Re-export primary types for ergonomic imports.
pub use coverage::{CoverageLevel, VerificationState};
pub use error::FrameworkError;
pub use framework::{
    Category, CategoryDefinition, Control, ControlDefinition, ControlRef, Framework,
    FrameworkDefinition,
};
pub use identity::{AnalysisId, CategoryId, ControlId, FrameworkId, MappingId, PolicyId, UserId};
pub use mapping::{MappingSnapshot, PolicyControlMapping};
pub use severity::Severity;
