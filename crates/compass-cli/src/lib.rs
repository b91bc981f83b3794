//! # compass-cli — CLI Tool for Compass
//!
//! Provides the `compass` command-line interface for working with framework
//! definitions outside the API service: authoring-time validation and
//! one-shot coverage analyses over JSON inputs.
//!
//! ## Subcommands
//!
//! - `compass validate` — Check a framework definition file against the
//!   structural rules (duplicate codes, unknown parents, category cycles).
//! - `compass analyze` — Run the full scoring pipeline over a framework
//!   definition and a mapping file, print the assessment summary, and
//!   optionally write the gap and coverage CSVs.
//!
//! ```bash
//! compass validate soc2.json
//! compass analyze soc2.json --mappings mappings.json --gaps-csv gaps.csv
//! ```
//!
//! Both subcommands run entirely in-process: no server, no database. The
//! same engine the API service drives is invoked directly, so a CLI run and
//! an API run over identical inputs produce identical scores.

pub mod analyze;
pub mod validate;
