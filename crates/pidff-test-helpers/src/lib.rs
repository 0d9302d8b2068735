//! Shared test utilities for the PIDFF workspace.
//!
//! # Modules
//!
//! - [`mod@must`] - Unwrap helpers with good error messages and `#[track_caller]`
//! - [`fixtures`] - Capability tables of reference devices
//! - [`assertions`] - Report assertions
//! - [`prelude`] - Convenience re-exports
//!
//! ```rust,ignore
//! use pidff_test_helpers::prelude::*;
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![allow(clippy::unwrap_used, clippy::panic)]

pub mod assertions;
pub mod fixtures;
pub mod must;
pub mod prelude;

pub use must::*;
