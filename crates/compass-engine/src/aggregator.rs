//! # Coverage Aggregator
//!
//! Pure function from (framework model, mapping set) to per-category scores
//! and an overall score.
//!
//! ## Scoring Rules
//!
//! - A control's effective coverage is the **maximum** coverage level across
//!   all of its mappings; a control with no mappings is `none`.
//! - Category score = `(fully*1.0 + partially*0.5) / total * 100`, one
//!   decimal. A category with zero controls has no score at all (`None`) —
//!   it is excluded from overall aggregation rather than counted as zero,
//!   so empty categories neither divide by zero nor drag the result down.
//! - The overall score applies the same formula across every control in the
//!   framework. It is **not** a re-average of category scores; that would
//!   double-weight small categories.
//!
//! Output category scores preserve the framework's category sort order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use compass_core::{ControlId, CoverageLevel, Framework, PolicyControlMapping};

use crate::error::EngineError;

/// Coverage counts and score for one category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryScore {
    /// Category reference code.
    pub category_code: String,
    /// Category display name.
    pub category_name: String,
    /// Number of controls directly in the category.
    pub total_controls: u32,
    /// Controls with effective coverage `full`.
    pub fully_covered: u32,
    /// Controls with effective coverage `partial`.
    pub partially_covered: u32,
    /// Controls with effective coverage `none`.
    pub not_covered: u32,
    /// Coverage score 0–100 at one decimal. `None` when the category has
    /// zero controls (undefined, not zero).
    pub score: Option<f64>,
}

/// The aggregator's full output: framework-wide counts, overall score, and
/// ordered category scores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoverageSummary {
    /// Controls across all categories.
    pub total_controls: u32,
    /// Controls with effective coverage `full`.
    pub fully_covered: u32,
    /// Controls with effective coverage `partial`.
    pub partially_covered: u32,
    /// Controls with effective coverage `none`.
    pub not_covered: u32,
    /// Framework-wide coverage score, 0–100 at one decimal.
    pub overall_score: f64,
    /// Per-category scores in framework category order.
    pub category_scores: Vec<CategoryScore>,
}

/// Compute the effective coverage of every control in the framework.
///
/// Every control starts at [`CoverageLevel::None`]; each mapping raises its
/// control to the maximum of the current and mapped levels. Mappings that
/// reference controls outside this framework are ignored — they belong to a
/// different framework or to a control that has since been removed.
pub fn effective_coverage(
    framework: &Framework,
    mappings: &[PolicyControlMapping],
) -> HashMap<ControlId, CoverageLevel> {
    let mut effective: HashMap<ControlId, CoverageLevel> = framework
        .controls()
        .map(|control| (control.id, CoverageLevel::None))
        .collect();

    for mapping in mappings {
        match effective.get_mut(&mapping.control_id) {
            Some(level) => *level = (*level).max(mapping.coverage_level),
            None => {
                tracing::debug!(
                    mapping_id = %mapping.id,
                    control_id = %mapping.control_id,
                    "mapping references a control outside the framework; ignored"
                );
            }
        }
    }

    effective
}

/// Aggregate coverage for a framework against a mapping set.
///
/// # Errors
///
/// Returns [`EngineError::EmptyFramework`] when the framework has zero
/// controls across all categories.
pub fn aggregate(
    framework: &Framework,
    mappings: &[PolicyControlMapping],
) -> Result<CoverageSummary, EngineError> {
    if framework.control_count() == 0 {
        return Err(EngineError::EmptyFramework {
            code: framework.code().to_string(),
        });
    }

    let effective = effective_coverage(framework, mappings);

    let mut total = 0u32;
    let mut fully = 0u32;
    let mut partially = 0u32;
    let mut category_scores = Vec::with_capacity(framework.categories().len());

    for category in framework.categories() {
        let mut cat_fully = 0u32;
        let mut cat_partially = 0u32;
        let cat_total = category.controls.len() as u32;

        for control in &category.controls {
            match effective.get(&control.id).copied().unwrap_or_default() {
                CoverageLevel::Full => cat_fully += 1,
                CoverageLevel::Partial => cat_partially += 1,
                CoverageLevel::None => {}
            }
        }

        category_scores.push(CategoryScore {
            category_code: category.code.clone(),
            category_name: category.name.clone(),
            total_controls: cat_total,
            fully_covered: cat_fully,
            partially_covered: cat_partially,
            not_covered: cat_total - cat_fully - cat_partially,
            score: score_of(cat_fully, cat_partially, cat_total),
        });

        total += cat_total;
        fully += cat_fully;
        partially += cat_partially;
    }

    // total > 0 was established above, so the overall score is defined.
    let overall_score = score_of(fully, partially, total).unwrap_or(0.0);

    Ok(CoverageSummary {
        total_controls: total,
        fully_covered: fully,
        partially_covered: partially,
        not_covered: total - fully - partially,
        overall_score,
        category_scores,
    })
}

/// `(fully*1.0 + partially*0.5) / total * 100`, one decimal. `None` when
/// there is nothing to score.
fn score_of(fully: u32, partially: u32, total: u32) -> Option<f64> {
    if total == 0 {
        return None;
    }
    let raw = (f64::from(fully) + 0.5 * f64::from(partially)) / f64::from(total) * 100.0;
    Some(round_one_decimal(raw))
}

/// Round to one decimal place.
fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
