//! Error kinds for the PIDFF effect engine
//!
//! Every public engine operation is synchronous and returns either one of
//! the hard failures in [`PidError`] or an informational [`Outcome`].
//!
//! # Architecture
//!
//! - [`error`]: the hard-failure kinds and their classification
//! - [`transport`]: opaque failures of the write/read collaborator
//! - [`outcome`]: success-shaped results (`NoEffect`, `Skipped`, `MoreData`)
//! - [`prelude`]: convenience re-exports
//!
//! # Example
//!
//! ```
//! use pidff_errors::prelude::*;
//!
//! fn check_gain(gain: u32) -> Result<Outcome> {
//!     if gain > 10_000 {
//!         return Err(PidError::invalid_parameter(format!("gain {gain} exceeds 10000")));
//!     }
//!     Ok(Outcome::Done)
//! }
//!
//! assert!(check_gain(20_000).is_err());
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod error;
pub mod outcome;
pub mod prelude;
pub mod transport;

pub use error::{ErrorCategory, PidError};
pub use outcome::{Outcome, ReadStatus};
pub use transport::TransportError;

/// A specialized `Result` type for engine operations.
pub type Result<T> = std::result::Result<T, PidError>;

/// A specialized `Result` type for transport primitives.
pub type TransportResult<T> = std::result::Result<T, TransportError>;
