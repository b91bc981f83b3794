//! # compass-report — Export Formatting
//!
//! Pure, read-only transformations from a **completed** analysis record to
//! exportable documents: a gaps CSV, a coverage CSV, and a plain-text
//! assessment summary.
//!
//! Every entry point rejects records that are not `completed` — a pending,
//! running, or failed analysis has nothing trustworthy to export, and the
//! refusal is an error, not an empty file.

pub mod csv;
pub mod summary;

pub use csv::{coverage_csv, gaps_csv};
pub use summary::text_summary;

use compass_engine::{AnalysisRecord, AnalysisStatus};
use thiserror::Error;

/// Error producing an export.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// The analysis has not completed; exports are only defined for
    /// committed snapshots.
    #[error("analysis is {status}, not completed; nothing to export")]
    NotCompleted {
        /// The record's actual status.
        status: AnalysisStatus,
    },
}

/// Guard shared by all exporters: only completed records are exportable.
pub(crate) fn require_completed(record: &AnalysisRecord) -> Result<(), ReportError> {
    if record.status != AnalysisStatus::Completed {
        return Err(ReportError::NotCompleted {
            status: record.status,
        });
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_record_is_rejected() {
        let record = fixtures::running_record();
        let err = require_completed(&record).unwrap_err();
        assert_eq!(
            err,
            ReportError::NotCompleted {
                status: AnalysisStatus::Running
            }
        );
    }

    #[test]
    fn failed_record_is_rejected() {
        let mut record = fixtures::running_record();
        record.fail("boom").unwrap();
        assert!(require_completed(&record).is_err());
    }

    #[test]
    fn completed_record_is_accepted() {
        let record = fixtures::completed_record();
        assert!(require_completed(&record).is_ok());
    }
}
