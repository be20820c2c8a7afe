// Extraction logic lives in payslip-core.
// This crate adds upload staging and result packaging around it.

pub mod bundle;

// Re-export core types for convenience
pub use payslip_core::*;

pub use bundle::{extract_upload, package_output, resolve_archive_root, stage_input, StagedInput};
