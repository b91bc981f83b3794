//! # CSV Exports
//!
//! RFC 4180-style CSV rendering for the gap list and the per-category
//! coverage table. Fields containing commas, quotes, or line breaks are
//! quoted; quotes are doubled.

use compass_engine::AnalysisRecord;

use crate::{require_completed, ReportError};

/// Render the gap list of a completed analysis as CSV.
///
/// Columns: control code, control title, category code, severity,
/// description, remediation, suggested policy type. Rows preserve the gap
/// list's severity-then-taxonomy order.
pub fn gaps_csv(record: &AnalysisRecord) -> Result<String, ReportError> {
    require_completed(record)?;

    let mut out = String::from(
        "control_code,control_title,category_code,severity,description,remediation,suggested_policy_type\n",
    );
    for gap in &record.gaps {
        push_row(
            &mut out,
            &[
                &gap.control_code,
                &gap.control_title,
                &gap.category_code,
                gap.severity.as_str(),
                &gap.description,
                &gap.remediation,
                &gap.suggested_policy_type,
            ],
        );
    }
    Ok(out)
}

/// Render the per-category coverage table of a completed analysis as CSV.
///
/// Columns: category code, name, total/fully/partially/not-covered counts,
/// score. Categories with no controls render an empty score field — never a
/// fabricated zero.
pub fn coverage_csv(record: &AnalysisRecord) -> Result<String, ReportError> {
    require_completed(record)?;

    let mut out = String::from(
        "category_code,category_name,total_controls,fully_covered,partially_covered,not_covered,score\n",
    );
    for score in &record.category_scores {
        let rendered_score = score
            .score
            .map(|s| format!("{s:.1}"))
            .unwrap_or_default();
        push_row(
            &mut out,
            &[
                &score.category_code,
                &score.category_name,
                &score.total_controls.to_string(),
                &score.fully_covered.to_string(),
                &score.partially_covered.to_string(),
                &score.not_covered.to_string(),
                &rendered_score,
            ],
        );
    }
    Ok(out)
}

fn push_row(out: &mut String, fields: &[&str]) {
    for (position, field) in fields.iter().enumerate() {
        if position > 0 {
            out.push(',');
        }
        out.push_str(&escape(field));
    }
    out.push('\n');
}

fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{completed_record, running_record};

    #[test]
    fn gaps_csv_has_header_and_one_row_per_gap() {
        let record = completed_record();
        let csv = gaps_csv(&record).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 1 + record.gaps.len());
        assert!(lines[0].starts_with("control_code,"));
        assert!(lines[1].starts_with("A2,"));
    }

    #[test]
    fn fields_with_commas_are_quoted() {
        let record = completed_record();
        let csv = gaps_csv(&record).unwrap();
        // "Session, timeout" must arrive as one field.
        assert!(csv.contains("\"Session, timeout\""));
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        let record = completed_record();
        let csv = coverage_csv(&record).unwrap();
        assert!(csv.contains("\"Access, \"\"Control\"\"\""));
    }

    #[test]
    fn empty_category_score_field_is_blank() {
        let record = completed_record();
        let csv = coverage_csv(&record).unwrap();
        let empty_row = csv.lines().find(|l| l.starts_with("E,")).unwrap();
        assert!(empty_row.ends_with(",0,0,0,0,"));
    }

    #[test]
    fn scores_render_with_one_decimal() {
        let record = completed_record();
        let csv = coverage_csv(&record).unwrap();
        assert!(csv.contains(",50.0\n"));
    }

    #[test]
    fn non_completed_records_are_rejected() {
        let record = running_record();
        assert!(gaps_csv(&record).is_err());
        assert!(coverage_csv(&record).is_err());
    }
}
