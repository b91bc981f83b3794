//! # Analysis Record State Machine
//!
//! Models the lifecycle of one analysis run.
//!
//! ## States
//!
//! ```text
//! Pending ──▶ Running ──▶ Completed (terminal)
//!                │
//!                └──▶ Failed (terminal)
//! ```
//!
//! Exactly one terminal write is possible per record: once a record reaches
//! `Completed` or `Failed` every further transition is rejected, so a
//! crashed-and-retried job cannot overwrite an already-committed result.
//! Re-running an assessment produces a new record; history is append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use compass_core::{AnalysisId, FrameworkId, MappingSnapshot, UserId};

use crate::aggregator::CategoryScore;
use crate::gaps::Gap;
use crate::recommendations::Recommendation;

/// Error messages stored on a failed record are truncated to this length.
pub const MAX_ERROR_MESSAGE_LEN: usize = 500;

// ─── Status ──────────────────────────────────────────────────────────

/// The lifecycle state of an analysis record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Record created; computation not yet started.
    Pending,
    /// Computation in progress.
    Running,
    /// Computation finished and the snapshot is committed (terminal).
    Completed,
    /// Computation ended in an error (terminal).
    Failed,
}

impl AnalysisStatus {
    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Return the string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse a stored string back into a status. Unknown strings map to
    /// `Failed` — the conservative reading for a record of unknown state.
    pub fn parse(s: &str) -> Self {
        match s {
            "pending" => Self::Pending,
            "running" => Self::Running,
            "completed" => Self::Completed,
            _ => Self::Failed,
        }
    }
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors that can occur during analysis lifecycle transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// Attempted transition is not valid from the current state.
    #[error("invalid analysis transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state.
        from: AnalysisStatus,
        /// Attempted target state.
        to: AnalysisStatus,
    },

    /// The record is already in a terminal state.
    #[error("analysis is in terminal state {state}")]
    TerminalState {
        /// The terminal state.
        state: AnalysisStatus,
    },
}

// ─── Outcome ─────────────────────────────────────────────────────────

/// The complete computed result of one analysis run.
///
/// Written to the record atomically by [`AnalysisRecord::complete`] — there
/// is no partially-scored observable state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisOutcome {
    /// Controls across all categories.
    pub total_controls: u32,
    /// Controls with effective coverage `full`.
    pub fully_covered: u32,
    /// Controls with effective coverage `partial`.
    pub partially_covered: u32,
    /// Controls with effective coverage `none`.
    pub not_covered: u32,
    /// Framework-wide score, 0–100 at one decimal.
    pub overall_score: f64,
    /// Per-category scores in framework category order.
    pub category_scores: Vec<CategoryScore>,
    /// Ordered gap list.
    pub gaps: Vec<Gap>,
    /// Prioritized recommendations.
    pub recommendations: Vec<Recommendation>,
    /// The mapping set the scores were computed from.
    pub mapping_snapshot: Vec<MappingSnapshot>,
}

// ─── Record ──────────────────────────────────────────────────────────

/// One analysis run: lifecycle state plus, once completed, the scored
/// snapshot.
///
/// Enforces valid state transitions with structured error reporting, in the
/// same shape as the other lifecycle records in the stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    /// Unique identifier of this run.
    pub id: AnalysisId,
    /// The framework that was assessed.
    pub framework_id: FrameworkId,
    /// The user who triggered the run.
    pub triggered_by: UserId,
    /// Current lifecycle state.
    pub status: AnalysisStatus,
    /// Controls across all categories. Zero until completed.
    pub total_controls: u32,
    /// Fully covered controls. Zero until completed.
    pub fully_covered: u32,
    /// Partially covered controls. Zero until completed.
    pub partially_covered: u32,
    /// Uncovered controls. Zero until completed.
    pub not_covered: u32,
    /// Overall score. `None` until the record completes.
    pub overall_score: Option<f64>,
    /// Per-category scores. Empty until completed.
    pub category_scores: Vec<CategoryScore>,
    /// Ordered gap list. Empty until completed.
    pub gaps: Vec<Gap>,
    /// Prioritized recommendations. Empty until completed.
    pub recommendations: Vec<Recommendation>,
    /// Mapping set used for the computation. Empty until completed.
    pub mapping_snapshot: Vec<MappingSnapshot>,
    /// Sanitized error message for failed records.
    pub error_message: Option<String>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When computation started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the record reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
}

impl AnalysisRecord {
    /// Create a new pending record for a triggering event.
    pub fn new_pending(framework_id: FrameworkId, triggered_by: UserId) -> Self {
        Self {
            id: AnalysisId::new(),
            framework_id,
            triggered_by,
            status: AnalysisStatus::Pending,
            total_controls: 0,
            fully_covered: 0,
            partially_covered: 0,
            not_covered: 0,
            overall_score: None,
            category_scores: Vec::new(),
            gaps: Vec::new(),
            recommendations: Vec::new(),
            mapping_snapshot: Vec::new(),
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Begin computation (PENDING → RUNNING). Records the start timestamp.
    pub fn start(&mut self) -> Result<(), AnalysisError> {
        self.require_state(AnalysisStatus::Pending, AnalysisStatus::Running)?;
        self.status = AnalysisStatus::Running;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Commit a successful computation (RUNNING → COMPLETED).
    ///
    /// All computed fields land in one assignment; a reader never observes a
    /// completed record with partial data.
    pub fn complete(&mut self, outcome: AnalysisOutcome) -> Result<(), AnalysisError> {
        self.require_state(AnalysisStatus::Running, AnalysisStatus::Completed)?;
        self.total_controls = outcome.total_controls;
        self.fully_covered = outcome.fully_covered;
        self.partially_covered = outcome.partially_covered;
        self.not_covered = outcome.not_covered;
        self.overall_score = Some(outcome.overall_score);
        self.category_scores = outcome.category_scores;
        self.gaps = outcome.gaps;
        self.recommendations = outcome.recommendations;
        self.mapping_snapshot = outcome.mapping_snapshot;
        self.status = AnalysisStatus::Completed;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Record a computation failure (RUNNING → FAILED).
    ///
    /// The message is sanitized and truncated before storage; no partial
    /// score data is ever written.
    pub fn fail(&mut self, message: &str) -> Result<(), AnalysisError> {
        self.require_state(AnalysisStatus::Running, AnalysisStatus::Failed)?;
        self.error_message = Some(sanitize_error(message));
        self.status = AnalysisStatus::Failed;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Whether the record is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Validate that the record is in the expected state.
    fn require_state(
        &self,
        expected: AnalysisStatus,
        target: AnalysisStatus,
    ) -> Result<(), AnalysisError> {
        if self.status.is_terminal() {
            return Err(AnalysisError::TerminalState { state: self.status });
        }
        if self.status != expected {
            return Err(AnalysisError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }
        Ok(())
    }
}

/// Collapse whitespace runs and truncate to [`MAX_ERROR_MESSAGE_LEN`]
/// characters for storage.
fn sanitize_error(message: &str) -> String {
    let collapsed = message.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(MAX_ERROR_MESSAGE_LEN).collect()
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> AnalysisRecord {
        AnalysisRecord::new_pending(FrameworkId::new(), UserId::new())
    }

    fn outcome() -> AnalysisOutcome {
        AnalysisOutcome {
            total_controls: 3,
            fully_covered: 1,
            partially_covered: 1,
            not_covered: 1,
            overall_score: 50.0,
            category_scores: vec![],
            gaps: vec![],
            recommendations: vec![],
            mapping_snapshot: vec![],
        }
    }

    // ── Happy-path lifecycle tests ───────────────────────────────────

    #[test]
    fn new_record_is_pending_and_unscored() {
        let record = pending();
        assert_eq!(record.status, AnalysisStatus::Pending);
        assert!(record.overall_score.is_none());
        assert!(record.started_at.is_none());
        assert!(record.completed_at.is_none());
        assert!(!record.is_terminal());
    }

    #[test]
    fn pending_to_running_records_start_time() {
        let mut record = pending();
        record.start().unwrap();
        assert_eq!(record.status, AnalysisStatus::Running);
        assert!(record.started_at.is_some());
        // Still no score while running.
        assert!(record.overall_score.is_none());
    }

    #[test]
    fn running_to_completed_commits_the_snapshot() {
        let mut record = pending();
        record.start().unwrap();
        record.complete(outcome()).unwrap();
        assert_eq!(record.status, AnalysisStatus::Completed);
        assert_eq!(record.overall_score, Some(50.0));
        assert_eq!(
            record.fully_covered + record.partially_covered + record.not_covered,
            record.total_controls
        );
        assert!(record.completed_at.is_some());
        assert!(record.is_terminal());
    }

    #[test]
    fn running_to_failed_records_the_message() {
        let mut record = pending();
        record.start().unwrap();
        record.fail("framework FW contains no controls").unwrap();
        assert_eq!(record.status, AnalysisStatus::Failed);
        assert_eq!(
            record.error_message.as_deref(),
            Some("framework FW contains no controls")
        );
        assert!(record.overall_score.is_none());
        assert!(record.is_terminal());
    }

    // ── Invalid transition tests ─────────────────────────────────────

    #[test]
    fn cannot_complete_from_pending() {
        let mut record = pending();
        let err = record.complete(outcome()).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InvalidTransition {
                from: AnalysisStatus::Pending,
                to: AnalysisStatus::Completed,
            }
        );
    }

    #[test]
    fn cannot_fail_from_pending() {
        let mut record = pending();
        assert!(record.fail("boom").is_err());
    }

    #[test]
    fn cannot_start_twice() {
        let mut record = pending();
        record.start().unwrap();
        assert!(record.start().is_err());
    }

    #[test]
    fn completed_record_rejects_all_transitions() {
        let mut record = pending();
        record.start().unwrap();
        record.complete(outcome()).unwrap();

        let before = record.clone();
        assert!(matches!(
            record.start(),
            Err(AnalysisError::TerminalState { .. })
        ));
        assert!(record.complete(outcome()).is_err());
        assert!(record.fail("late failure").is_err());

        // The terminal record is byte-for-byte unchanged.
        assert_eq!(record.status, before.status);
        assert_eq!(record.overall_score, before.overall_score);
        assert_eq!(record.error_message, before.error_message);
        assert_eq!(record.completed_at, before.completed_at);
    }

    #[test]
    fn failed_record_rejects_all_transitions() {
        let mut record = pending();
        record.start().unwrap();
        record.fail("boom").unwrap();

        assert!(record.start().is_err());
        assert!(record.complete(outcome()).is_err());
        assert!(record.fail("again").is_err());
        assert_eq!(record.error_message.as_deref(), Some("boom"));
    }

    // ── Sanitization ─────────────────────────────────────────────────

    #[test]
    fn error_message_is_truncated() {
        let mut record = pending();
        record.start().unwrap();
        let long = "x".repeat(2 * MAX_ERROR_MESSAGE_LEN);
        record.fail(&long).unwrap();
        assert_eq!(
            record.error_message.as_ref().map(|m| m.chars().count()),
            Some(MAX_ERROR_MESSAGE_LEN)
        );
    }

    #[test]
    fn error_message_whitespace_is_collapsed() {
        let mut record = pending();
        record.start().unwrap();
        record.fail("load\n\tfailed:   connection reset").unwrap();
        assert_eq!(
            record.error_message.as_deref(),
            Some("load failed: connection reset")
        );
    }

    // ── Display / serde ──────────────────────────────────────────────

    #[test]
    fn status_display_is_lowercase() {
        assert_eq!(AnalysisStatus::Pending.to_string(), "pending");
        assert_eq!(AnalysisStatus::Running.to_string(), "running");
        assert_eq!(AnalysisStatus::Completed.to_string(), "completed");
        assert_eq!(AnalysisStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn status_parse_roundtrips() {
        for status in [
            AnalysisStatus::Pending,
            AnalysisStatus::Running,
            AnalysisStatus::Completed,
            AnalysisStatus::Failed,
        ] {
            assert_eq!(AnalysisStatus::parse(status.as_str()), status);
        }
    }

    #[test]
    fn record_serde_roundtrip() {
        let mut record = pending();
        record.start().unwrap();
        record.complete(outcome()).unwrap();
        let json = serde_json::to_string(&record).unwrap();
        let parsed: AnalysisRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, record.id);
        assert_eq!(parsed.status, AnalysisStatus::Completed);
        assert_eq!(parsed.overall_score, Some(50.0));
    }
}
