//! # compass-engine — The Compliance Analysis Engine
//!
//! Computes a point-in-time coverage assessment of an organization's policy
//! set against a compliance framework: per-category scores, an overall
//! score, a prioritized gap list, and remediation recommendations.
//!
//! ## Pipeline
//!
//! ```text
//! Framework + mappings ──▶ aggregator ──▶ gaps ──▶ recommendations ──▶ AnalysisOutcome
//! ```
//!
//! Every stage is a pure, synchronous function over in-memory data: no I/O,
//! no clocks, no randomness. Given identical input the engine produces
//! identical output, including ordering — that determinism is load-bearing
//! for the audit story and is covered by property tests.
//!
//! The [`analysis`] module holds the other half of the crate: the
//! `pending → running → completed/failed` record state machine that the
//! orchestration layer drives. Terminal records are immutable; re-running an
//! assessment always creates a new record.
//!
//! ## Crate Policy
//!
//! - Depends only on `compass-core` internally.
//! - No `unsafe` code, no `panic!()` or `.unwrap()` outside tests.
//! - Scoring stages never mutate or reorder the framework model.

pub mod aggregator;
pub mod analysis;
pub mod error;
pub mod gaps;
pub mod recommendations;

pub use aggregator::{aggregate, effective_coverage, CategoryScore, CoverageSummary};
pub use analysis::{AnalysisError, AnalysisOutcome, AnalysisRecord, AnalysisStatus};
pub use error::EngineError;
pub use gaps::{detect_gaps, Gap};
pub use recommendations::{synthesize_recommendations, Recommendation, Timeframe, MAX_RECOMMENDATIONS};

use compass_core::{Framework, MappingSnapshot, PolicyControlMapping};

/// Run the full analysis pipeline over an in-memory framework and mapping set.
///
/// Stages execute strictly in sequence — aggregate, detect gaps, synthesize
/// recommendations — and the mapping set is snapshotted into the outcome for
/// reproducibility.
///
/// # Errors
///
/// Returns [`EngineError::EmptyFramework`] when the framework has zero
/// controls across all categories; scoring is undefined in that case.
pub fn analyze(
    framework: &Framework,
    mappings: &[PolicyControlMapping],
) -> Result<AnalysisOutcome, EngineError> {
    let summary = aggregate(framework, mappings)?;
    let gaps = detect_gaps(framework, mappings);
    let recommendations = synthesize_recommendations(&gaps);
    let mapping_snapshot: Vec<MappingSnapshot> =
        mappings.iter().map(MappingSnapshot::from).collect();

    Ok(AnalysisOutcome {
        total_controls: summary.total_controls,
        fully_covered: summary.fully_covered,
        partially_covered: summary.partially_covered,
        not_covered: summary.not_covered,
        overall_score: summary.overall_score,
        category_scores: summary.category_scores,
        gaps,
        recommendations,
        mapping_snapshot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_core::{
        CategoryDefinition, ControlDefinition, CoverageLevel, Framework, FrameworkDefinition,
        FrameworkId, MappingId, PolicyControlMapping, PolicyId, VerificationState,
    };

    fn control(code: &str, sort_order: i32) -> ControlDefinition {
        ControlDefinition {
            code: code.to_string(),
            title: format!("Control {code}"),
            description: String::new(),
            sort_order,
            suggested_policy_type: None,
        }
    }

    /// Framework from the acceptance scenario: category A with controls
    /// A1/A2, category B with control B1.
    fn scenario_framework() -> Framework {
        let def = FrameworkDefinition {
            code: "SCEN".to_string(),
            name: "Scenario".to_string(),
            version: "1".to_string(),
            categories: vec![
                CategoryDefinition {
                    code: "A".to_string(),
                    name: "Access".to_string(),
                    sort_order: 1,
                    parent_code: None,
                    high_priority: false,
                    controls: vec![control("A1", 1), control("A2", 2)],
                },
                CategoryDefinition {
                    code: "B".to_string(),
                    name: "Backup".to_string(),
                    sort_order: 2,
                    parent_code: None,
                    high_priority: false,
                    controls: vec![control("B1", 1)],
                },
            ],
        };
        Framework::from_definition(FrameworkId::new(), &def).unwrap()
    }

    fn mapping(framework: &Framework, code: &str, level: CoverageLevel) -> PolicyControlMapping {
        let control = framework.controls().find(|c| c.code == code).unwrap();
        PolicyControlMapping {
            id: MappingId::new(),
            policy_id: PolicyId::new(),
            control_id: control.id,
            coverage_level: level,
            verification: VerificationState::Unverified,
            notes: None,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn scenario_two_categories() {
        // A1 full, A2 none, B1 partial ⇒ A = 50.0, B = 50.0, overall = 50.0,
        // counts 1/1/1, gaps = [A2 high, B1 medium].
        let fw = scenario_framework();
        let mappings = vec![
            mapping(&fw, "A1", CoverageLevel::Full),
            mapping(&fw, "B1", CoverageLevel::Partial),
        ];

        let outcome = analyze(&fw, &mappings).unwrap();
        assert_eq!(outcome.total_controls, 3);
        assert_eq!(outcome.fully_covered, 1);
        assert_eq!(outcome.partially_covered, 1);
        assert_eq!(outcome.not_covered, 1);
        assert_eq!(outcome.overall_score, 50.0);

        let scores: Vec<(String, Option<f64>)> = outcome
            .category_scores
            .iter()
            .map(|s| (s.category_code.clone(), s.score))
            .collect();
        assert_eq!(
            scores,
            vec![
                ("A".to_string(), Some(50.0)),
                ("B".to_string(), Some(50.0))
            ]
        );

        let gap_codes: Vec<&str> = outcome.gaps.iter().map(|g| g.control_code.as_str()).collect();
        assert_eq!(gap_codes, vec!["A2", "B1"]);
        assert_eq!(outcome.gaps[0].severity, compass_core::Severity::High);
        assert_eq!(outcome.gaps[1].severity, compass_core::Severity::Medium);
    }

    #[test]
    fn single_unmapped_control_scores_zero_but_succeeds() {
        let def = FrameworkDefinition {
            code: "ONE".to_string(),
            name: "One".to_string(),
            version: "1".to_string(),
            categories: vec![CategoryDefinition {
                code: "C".to_string(),
                name: "Only".to_string(),
                sort_order: 1,
                parent_code: None,
                high_priority: false,
                controls: vec![control("C1", 1)],
            }],
        };
        let fw = Framework::from_definition(FrameworkId::new(), &def).unwrap();

        let outcome = analyze(&fw, &[]).unwrap();
        assert_eq!(outcome.overall_score, 0.0);
        assert_eq!(outcome.gaps.len(), 1);
        assert_eq!(outcome.not_covered, 1);
    }

    #[test]
    fn empty_framework_is_rejected() {
        let def = FrameworkDefinition {
            code: "EMPTY".to_string(),
            name: "Empty".to_string(),
            version: "1".to_string(),
            categories: vec![],
        };
        let fw = Framework::from_definition(FrameworkId::new(), &def).unwrap();
        let err = analyze(&fw, &[]).unwrap_err();
        assert!(matches!(err, EngineError::EmptyFramework { .. }));
    }

    #[test]
    fn outcome_snapshots_the_mapping_set() {
        let fw = scenario_framework();
        let mappings = vec![
            mapping(&fw, "A1", CoverageLevel::Full),
            mapping(&fw, "B1", CoverageLevel::Partial),
        ];
        let outcome = analyze(&fw, &mappings).unwrap();
        assert_eq!(outcome.mapping_snapshot.len(), 2);
        assert_eq!(outcome.mapping_snapshot[0].mapping_id, mappings[0].id);
    }
}
