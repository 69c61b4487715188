//! Output generation: text tables, the assembled report, and audit records.
//!
//! # Submodules
//!
//! - [`table`]: fixed-width category and record tables
//! - [`report`]: placeholder substitution into the body template
//! - [`audit`]: the JSON document written for every run

pub mod audit;
pub mod report;
pub mod table;
