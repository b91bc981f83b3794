//! # Policy-Control Mapping Records
//!
//! A mapping links one organizational policy to one framework control with a
//! coverage level. Controls do not own mappings; mappings reference controls
//! by id, and several policies may map to the same control.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coverage::{CoverageLevel, VerificationState};
use crate::identity::{ControlId, MappingId, PolicyId};

/// A link from an organizational policy to a framework control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyControlMapping {
    /// Unique identifier of this mapping record.
    pub id: MappingId,
    /// The policy addressing the control.
    pub policy_id: PolicyId,
    /// The control being addressed.
    pub control_id: ControlId,
    /// How well the policy covers the control.
    pub coverage_level: CoverageLevel,
    /// Whether a reviewer has confirmed the mapping.
    pub verification: VerificationState,
    /// Free-form reviewer notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// When the mapping was recorded.
    pub created_at: DateTime<Utc>,
}

/// Frozen copy of a mapping as it stood when an analysis ran.
///
/// Stored inside the analysis record so a completed assessment stays
/// reproducible and auditable after the live mapping set changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MappingSnapshot {
    /// Identifier of the source mapping record.
    pub mapping_id: MappingId,
    /// The policy end of the mapping.
    pub policy_id: PolicyId,
    /// The control end of the mapping.
    pub control_id: ControlId,
    /// Coverage level at analysis time.
    pub coverage_level: CoverageLevel,
    /// Verification state at analysis time.
    pub verification: VerificationState,
}

impl From<&PolicyControlMapping> for MappingSnapshot {
    fn from(mapping: &PolicyControlMapping) -> Self {
        Self {
            mapping_id: mapping.id,
            policy_id: mapping.policy_id,
            control_id: mapping.control_id,
            coverage_level: mapping.coverage_level,
            verification: mapping.verification,
        }
    }
}
