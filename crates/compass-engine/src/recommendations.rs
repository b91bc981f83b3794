//! # Recommendation Synthesizer
//!
//! Folds the gap list into a short, prioritized set of remediation
//! recommendations. One recommendation summarizes one policy-type group;
//! only groups containing at least one critical or high gap qualify.
//!
//! ## Priority Order
//!
//! Immediate-timeframe groups first, then larger groups before smaller ones,
//! then policy type alphabetically so the order is total and reproducible.
//! Priorities are assigned 1, 2, 3… in that order. The list is capped at
//! [`MAX_RECOMMENDATIONS`]: whole lower-priority groups are dropped, never
//! truncated mid-group.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use compass_core::Severity;

use crate::gaps::Gap;

/// Maximum number of recommendations emitted per analysis. Groups beyond
/// the cap are dropped whole to keep the list actionable.
pub const MAX_RECOMMENDATIONS: usize = 10;

/// Urgency bucket for a recommendation.
///
/// Declaration order is priority order: `Immediate` sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    /// At least one related gap is critical.
    Immediate,
    /// At least one related gap is high.
    ShortTerm,
    /// Everything else.
    MediumTerm,
}

impl Timeframe {
    /// Return the string representation of this timeframe.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::ShortTerm => "short_term",
            Self::MediumTerm => "medium_term",
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One remediation recommendation, summarizing a policy-type group of gaps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    /// 1-based rank; lower is more urgent.
    pub priority: u32,
    /// The policy type this recommendation is about.
    pub suggested_policy_type: String,
    /// Human-readable summary of the group.
    pub summary: String,
    /// Codes of every related gap control.
    pub related_controls: Vec<String>,
    /// Urgency bucket.
    pub timeframe: Timeframe,
}

/// Synthesize prioritized recommendations from a severity-sorted gap list.
pub fn synthesize_recommendations(gaps: &[Gap]) -> Vec<Recommendation> {
    // BTreeMap keeps group iteration order independent of gap order.
    let mut groups: BTreeMap<&str, Vec<&Gap>> = BTreeMap::new();
    for gap in gaps {
        groups
            .entry(gap.suggested_policy_type.as_str())
            .or_default()
            .push(gap);
    }

    let mut qualified: Vec<(Timeframe, &str, Vec<&Gap>)> = groups
        .into_iter()
        .filter(|(_, members)| members.iter().any(|g| g.severity >= Severity::High))
        .map(|(policy_type, members)| {
            let timeframe = if members.iter().any(|g| g.severity == Severity::Critical) {
                Timeframe::Immediate
            } else if members.iter().any(|g| g.severity == Severity::High) {
                Timeframe::ShortTerm
            } else {
                Timeframe::MediumTerm
            };
            (timeframe, policy_type, members)
        })
        .collect();

    qualified.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then_with(|| b.2.len().cmp(&a.2.len()))
            .then_with(|| a.1.cmp(b.1))
    });

    qualified
        .into_iter()
        .take(MAX_RECOMMENDATIONS)
        .enumerate()
        .map(|(rank, (timeframe, policy_type, members))| {
            let related_controls: Vec<String> =
                members.iter().map(|g| g.control_code.clone()).collect();
            let summary = format!(
                "Establish or strengthen the {} policy to close {} control gap{} ({})",
                policy_type,
                members.len(),
                if members.len() == 1 { "" } else { "s" },
                related_controls.join(", ")
            );
            Recommendation {
                priority: rank as u32 + 1,
                suggested_policy_type: policy_type.to_string(),
                summary,
                related_controls,
                timeframe,
            }
        })
        .collect()
}
