//! # Gap Detector
//!
//! Emits one gap item for every control whose effective coverage is less
//! than `full`, with a deterministic severity and a deterministic ordering.
//!
//! ## Severity Assignment
//!
//! | Effective coverage | Category flag   | Severity   |
//! |--------------------|-----------------|------------|
//! | none               | high-priority   | `Critical` |
//! | none               | —               | `High`     |
//! | partial            | any             | `Medium`   |
//!
//! The high-priority flag is framework-supplied metadata on the owning
//! category; when absent there is no escalation.
//!
//! ## Ordering
//!
//! Gaps sort by severity descending, then category sort order, then control
//! sort order. Ties cannot survive: the framework model guarantees a total
//! order over (category, control), so two runs over identical input produce
//! byte-identical gap lists.
//!
//! The detector reads the framework model; it never mutates or reorders it.

use serde::{Deserialize, Serialize};

use compass_core::{Category, Control, CoverageLevel, Framework, PolicyControlMapping, Severity};

use crate::aggregator::effective_coverage;

/// One uncovered or partially-covered control.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Gap {
    /// Reference code of the control.
    pub control_code: String,
    /// Title of the control.
    pub control_title: String,
    /// Reference code of the owning category.
    pub category_code: String,
    /// Assigned severity.
    pub severity: Severity,
    /// Human-readable statement of the gap.
    pub description: String,
    /// Suggested remediation action.
    pub remediation: String,
    /// Kind of policy that would close the gap. Used by the recommendation
    /// synthesizer as the grouping key.
    pub suggested_policy_type: String,
}

/// Detect all coverage gaps in a framework against a mapping set.
///
/// Returns the ordered gap list described in the module documentation.
/// A framework with zero controls simply yields an empty list here; the
/// aggregator is the stage that rejects unscorable frameworks.
pub fn detect_gaps(framework: &Framework, mappings: &[PolicyControlMapping]) -> Vec<Gap> {
    let effective = effective_coverage(framework, mappings);

    let mut gaps = Vec::new();
    for category in framework.categories() {
        for control in &category.controls {
            let level = effective.get(&control.id).copied().unwrap_or_default();
            if level == CoverageLevel::Full {
                continue;
            }
            gaps.push(build_gap(category, control, level));
        }
    }

    // Generation order is already (category order, control order); a stable
    // sort by severity descending yields the required total order.
    gaps.sort_by(|a, b| b.severity.cmp(&a.severity));
    gaps
}

/// The policy type that would address a control: the authored hint when
/// present, otherwise the owning category's name.
pub fn suggested_policy_type(category: &Category, control: &Control) -> String {
    control
        .suggested_policy_type
        .clone()
        .unwrap_or_else(|| category.name.clone())
}

/// Build the gap item for a control below full coverage. The caller has
/// already filtered out `Full`.
fn build_gap(category: &Category, control: &Control, level: CoverageLevel) -> Gap {
    let policy_type = suggested_policy_type(category, control);
    let (severity, description, remediation) = if level == CoverageLevel::Partial {
        (
            Severity::Medium,
            format!(
                "Control {} ({}) is only partially covered by existing policies",
                control.code, control.title
            ),
            format!(
                "Extend the mapped {} policy to fully satisfy control {}",
                policy_type, control.code
            ),
        )
    } else {
        (
            if category.high_priority {
                Severity::Critical
            } else {
                Severity::High
            },
            format!(
                "No policy addresses control {} ({})",
                control.code, control.title
            ),
            format!(
                "Establish a {} policy covering control {}",
                policy_type, control.code
            ),
        )
    };

    Gap {
        control_code: control.code.clone(),
        control_title: control.title.clone(),
        category_code: category.code.clone(),
        severity,
        description,
        remediation,
        suggested_policy_type: policy_type,
    }
}
