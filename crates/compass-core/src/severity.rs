//! # Gap Severity
//!
//! The severity scale assigned to coverage gaps. Ordered so that sorting a
//! gap list descending by severity puts critical items first.

use serde::{Deserialize, Serialize};

/// Severity of a coverage gap.
///
/// The derived total order is `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational; no near-term action required.
    Low,
    /// Partially covered control.
    Medium,
    /// Uncovered control.
    High,
    /// Uncovered control in a high-priority category.
    Critical,
}

impl Severity {
    /// Return the string representation of this severity.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Parse a stored string back into a severity. Unknown strings map
    /// to `Low`.
    pub fn parse(s: &str) -> Self {
        match s {
            "critical" => Self::Critical,
            "high" => Self::High,
            "medium" => Self::Medium,
            _ => Self::Low,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
