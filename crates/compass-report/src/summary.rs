//! # Plain-Text Assessment Summary
//!
//! A human-readable rendering of a completed analysis: headline score,
//! coverage counts, per-category table, and the prioritized recommendation
//! list. This is the text that lands in terminal output and notification
//! bodies; richer renderings (PDF and friends) live outside this crate and
//! consume the same record.

use std::fmt::Write as _;

use compass_engine::AnalysisRecord;

use crate::{require_completed, ReportError};

/// Render a completed analysis as a plain-text summary.
pub fn text_summary(record: &AnalysisRecord) -> Result<String, ReportError> {
    require_completed(record)?;

    let mut out = String::new();
    // Writing into a String cannot fail; the discarded results below are
    // the fmt::Write contract, not fallibility.
    let _ = writeln!(out, "Compliance coverage assessment {}", record.id);
    let _ = writeln!(out, "Framework: {}", record.framework_id);
    if let Some(score) = record.overall_score {
        let _ = writeln!(out, "Overall score: {score:.1} / 100");
    }
    let _ = writeln!(
        out,
        "Controls: {} total, {} fully covered, {} partially covered, {} not covered",
        record.total_controls,
        record.fully_covered,
        record.partially_covered,
        record.not_covered
    );

    let _ = writeln!(out, "\nPer-category scores:");
    for score in &record.category_scores {
        match score.score {
            Some(value) => {
                let _ = writeln!(
                    out,
                    "  {:<12} {:>5.1}  ({}/{} covered)",
                    score.category_code,
                    value,
                    score.fully_covered,
                    score.total_controls
                );
            }
            None => {
                let _ = writeln!(out, "  {:<12}   n/a  (no controls)", score.category_code);
            }
        }
    }

    if record.gaps.is_empty() {
        let _ = writeln!(out, "\nNo coverage gaps.");
    } else {
        let _ = writeln!(out, "\nGaps ({}):", record.gaps.len());
        for gap in &record.gaps {
            let _ = writeln!(
                out,
                "  [{}] {} — {}",
                gap.severity, gap.control_code, gap.description
            );
        }
    }

    if !record.recommendations.is_empty() {
        let _ = writeln!(out, "\nRecommendations:");
        for rec in &record.recommendations {
            let _ = writeln!(
                out,
                "  {}. ({}) {}",
                rec.priority, rec.timeframe, rec.summary
            );
        }
    }

    Ok(out)
}
