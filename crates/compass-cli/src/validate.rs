//! # Validate Subcommand
//!
//! Framework definition validation. Authors iterate on a JSON definition
//! file; this command gives them the same verdict the registration endpoint
//! would, without standing up the service.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use compass_core::{Framework, FrameworkDefinition, FrameworkId};

/// Arguments for the `compass validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to a framework definition JSON file.
    #[arg(value_name = "PATH")]
    pub path: PathBuf,
}

/// Execute the validate subcommand.
///
/// Returns exit code: 0 when the definition loads, 1 when it is rejected.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let raw = std::fs::read_to_string(&args.path)
        .with_context(|| format!("failed to read {}", args.path.display()))?;
    let definition: FrameworkDefinition = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a framework definition", args.path.display()))?;

    // The id only seeds derived identifiers; any value exercises the same
    // validation path the registration endpoint runs.
    match Framework::from_definition(FrameworkId::new(), &definition) {
        Ok(model) => {
            println!(
                "OK: {} {} ({} categories, {} controls)",
                model.code(),
                model.version(),
                model.categories().len(),
                model.control_count()
            );
            if model.control_count() == 0 {
                println!("WARN: definition has no controls; analyses of it will fail");
            }
            Ok(0)
        }
        Err(err) => {
            println!("FAIL: {} — {err}", args.path.display());
            Ok(1)
        }
    }
}
