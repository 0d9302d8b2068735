//! Prelude module for convenient error handling imports.

pub use crate::{
    ErrorCategory, Outcome, PidError, ReadStatus, Result, TransportError, TransportResult,
};
