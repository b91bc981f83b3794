//! # Coverage Levels
//!
//! Defines [`CoverageLevel`], the ordered enumeration at the heart of the
//! scoring algorithm, and [`VerificationState`] for mapping records.
//!
//! ## Ordering Invariant
//!
//! `None < Partial < Full` is the derived `Ord`, and the variant declaration
//! order below is what makes it true. The effective-coverage max-rule
//! (`Ord::max` across a control's mappings) depends on this order — do not
//! reorder variants.

use serde::{Deserialize, Serialize};

/// How well a single policy covers a single control.
///
/// The derived total order is `None < Partial < Full`. A control's
/// *effective* coverage is the maximum level across all of its mappings,
/// since any single adequately-covering policy satisfies the control.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum CoverageLevel {
    /// The policy does not address the control. Also the effective level
    /// of a control with no mappings at all.
    #[default]
    None,
    /// The policy addresses the control incompletely.
    Partial,
    /// The policy fully satisfies the control.
    Full,
}

impl CoverageLevel {
    /// Contribution of this level to a coverage score, in control-units.
    ///
    /// Full counts 1.0, partial counts 0.5, none counts 0.0.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Full => 1.0,
            Self::Partial => 0.5,
            Self::None => 0.0,
        }
    }

    /// Return the string representation of this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Partial => "partial",
            Self::Full => "full",
        }
    }

    /// Parse a stored string back into a level. Unknown strings map to
    /// `None` — the conservative reading for coverage data.
    pub fn parse(s: &str) -> Self {
        match s {
            "full" => Self::Full,
            "partial" => Self::Partial,
            _ => Self::None,
        }
    }
}

impl std::fmt::Display for CoverageLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a mapping has been verified by a reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerificationState {
    /// The mapping was entered but has not been reviewed.
    #[default]
    Unverified,
    /// A reviewer has confirmed the mapping.
    Verified,
}

impl VerificationState {
    /// Return the string representation of this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unverified => "unverified",
            Self::Verified => "verified",
        }
    }
}

impl std::fmt::Display for VerificationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
