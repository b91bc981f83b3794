//! # Framework Validation Errors
//!
//! Errors raised while building the immutable framework model from a
//! definition. All errors use `thiserror` for derive-based `Display` and
//! `Error` implementations and name the offending code so an operator can
//! fix the definition without spelunking.

use thiserror::Error;

/// Error validating a framework definition at load time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameworkError {
    /// Two categories share the same code.
    #[error("duplicate category code: {code}")]
    DuplicateCategory {
        /// The duplicated category code.
        code: String,
    },

    /// Two controls share the same code.
    #[error("duplicate control code: {code}")]
    DuplicateControl {
        /// The duplicated control code.
        code: String,
    },

    /// A category references a parent code that does not exist.
    #[error("category {code} references unknown parent {parent}")]
    UnknownParent {
        /// The child category code.
        code: String,
        /// The missing parent code.
        parent: String,
    },

    /// The parent chain starting at a category loops back on itself.
    #[error("category hierarchy contains a cycle through {code}")]
    CategoryCycle {
        /// A category on the cycle.
        code: String,
    },

    /// A required field is empty.
    #[error("framework field {field} must not be empty")]
    EmptyField {
        /// Name of the empty field.
        field: &'static str,
    },
}
