//! Convenience re-exports for common test utilities.
//!
//! ```rust,ignore
//! use pidff_test_helpers::prelude::*;
//! ```

pub use crate::assertions::{assert_no_report, assert_report_ids, hex_lines, only_report, report_ids};
pub use crate::fixtures::*;
pub use crate::must::{must, must_err, must_some, must_with};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;
