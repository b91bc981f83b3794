//! # Analyze Subcommand
//!
//! One-shot coverage analysis: framework definition JSON plus a mapping
//! file in, assessment summary out. The mapping file references controls by
//! code rather than derived id, since ids only exist once a definition is
//! loaded.
//!
//! ```json
//! [
//!   {"control_code": "CC1.1", "coverage_level": "full"},
//!   {"control_code": "CC1.2", "coverage_level": "partial", "verification": "verified"}
//! ]
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Args;
use serde::Deserialize;
use uuid::Uuid;

use compass_core::{
    CoverageLevel, Framework, FrameworkDefinition, FrameworkId, MappingId, PolicyControlMapping,
    PolicyId, UserId, VerificationState,
};
use compass_engine::AnalysisRecord;

/// Arguments for the `compass analyze` subcommand.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Path to a framework definition JSON file.
    #[arg(value_name = "FRAMEWORK")]
    pub framework: PathBuf,

    /// Path to a mapping file (JSON array of {control_code, coverage_level, ...}).
    /// Omitted means no mappings: every control scores as uncovered.
    #[arg(long)]
    pub mappings: Option<PathBuf>,

    /// Write the gap list CSV to this path.
    #[arg(long, value_name = "PATH")]
    pub gaps_csv: Option<PathBuf>,

    /// Write the per-category coverage CSV to this path.
    #[arg(long, value_name = "PATH")]
    pub coverage_csv: Option<PathBuf>,
}

/// One mapping entry as authored in the mapping file.
#[derive(Debug, Deserialize)]
struct MappingInput {
    /// Code of the control being addressed.
    control_code: String,
    /// How well the policy covers the control.
    coverage_level: CoverageLevel,
    /// Whether a reviewer has confirmed the mapping.
    #[serde(default)]
    verification: Option<VerificationState>,
    /// The policy end of the mapping; a fresh id is minted when absent.
    #[serde(default)]
    policy_id: Option<Uuid>,
    /// Free-form reviewer notes.
    #[serde(default)]
    notes: Option<String>,
}

/// Execute the analyze subcommand.
///
/// Returns exit code: 0 on a completed assessment, 1 when the framework is
/// unscorable or a mapping references an unknown control.
pub fn run_analyze(args: &AnalyzeArgs) -> Result<u8> {
    let raw = std::fs::read_to_string(&args.framework)
        .with_context(|| format!("failed to read {}", args.framework.display()))?;
    let definition: FrameworkDefinition = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a framework definition", args.framework.display()))?;

    let framework_id = FrameworkId::new();
    let framework = match Framework::from_definition(framework_id, &definition) {
        Ok(model) => model,
        Err(err) => {
            println!("FAIL: {} — {err}", args.framework.display());
            return Ok(1);
        }
    };

    let mappings = match &args.mappings {
        Some(path) => load_mappings(path, &framework)?,
        None => Vec::new(),
    };

    let outcome = match compass_engine::analyze(&framework, &mappings) {
        Ok(outcome) => outcome,
        Err(err) => {
            println!("FAIL: {err}");
            return Ok(1);
        }
    };

    // The report layer only accepts committed records, so the one-shot run
    // drives a record through the same lifecycle the orchestrator uses.
    let mut record = AnalysisRecord::new_pending(framework.id(), UserId::new());
    record
        .start()
        .and_then(|()| record.complete(outcome))
        .context("failed to commit the one-shot analysis record")?;

    print!("{}", compass_report::text_summary(&record)?);

    if let Some(path) = &args.gaps_csv {
        std::fs::write(path, compass_report::gaps_csv(&record)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Wrote gap list to {}", path.display());
    }
    if let Some(path) = &args.coverage_csv {
        std::fs::write(path, compass_report::coverage_csv(&record)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Wrote coverage table to {}", path.display());
    }

    Ok(0)
}

/// Load the mapping file and resolve control codes against the framework.
fn load_mappings(path: &PathBuf, framework: &Framework) -> Result<Vec<PolicyControlMapping>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let inputs: Vec<MappingInput> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a mapping file", path.display()))?;

    let mut mappings = Vec::with_capacity(inputs.len());
    for input in inputs {
        let Some(control) = framework
            .controls()
            .find(|c| c.code == input.control_code)
        else {
            bail!(
                "mapping references unknown control {} (framework {})",
                input.control_code,
                framework.code()
            );
        };
        mappings.push(PolicyControlMapping {
            id: MappingId::new(),
            policy_id: input.policy_id.map(PolicyId).unwrap_or_default(),
            control_id: control.id,
            coverage_level: input.coverage_level,
            verification: input.verification.unwrap_or_default(),
            notes: input.notes,
            created_at: Utc::now(),
        });
    }
    Ok(mappings)
}
