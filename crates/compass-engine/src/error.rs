//! # Engine Errors
//!
//! Errors raised by the scoring pipeline. Kept separate from the state
//! machine errors in [`crate::analysis`] — a pipeline error describes *why*
//! a job failed, a state machine error describes an illegal lifecycle move.

use thiserror::Error;

/// Error from the analysis pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The framework has no controls anywhere, so a score is undefined.
    #[error("framework {code} contains no controls; coverage analysis is undefined")]
    EmptyFramework {
        /// Code of the offending framework.
        code: String,
    },
}
