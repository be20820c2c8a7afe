// Payslip Core Library
//
// Finds one employee's pages across a multi-year payroll PDF archive and
// rebuilds them into one file per source document.
// Main interface: PayslipProcessor::process.

pub mod types;
pub mod error;
pub mod config;
pub mod naming;
pub mod year_filter;
pub mod pdf;
pub mod matcher;
pub mod writer;
pub mod pool;
pub mod reconciler;
pub mod processor;

// Re-export main types and functions for easy use
pub use types::*;
pub use error::{ExtractError, Result};
pub use config::{CollisionPolicy, ExtractionConfig};
pub use naming::{ArtifactNaming, OutputAssignment};
pub use matcher::PageMatcher;
pub use pdf::{PageSource, PdfDocument};
pub use pool::WorkerPool;
pub use reconciler::Reconciler;
pub use processor::{PayslipProcessor, StepProfiler};
pub use year_filter::YearFilter;
