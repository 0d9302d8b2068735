//! I/O-free codec for USB HID PID force feedback devices
//!
//! This crate turns device-independent effect parameters into bit-exact
//! PID reports for one device, and decodes what the device sends back. It
//! holds no state and performs no I/O; the session layer lives in
//! `pidff-engine`.
//!
//! # Modules
//!
//! - [`scale`]: truncating rescale, clamping, sign-aware bit packing
//! - [`direction`]: Cartesian / Polar / Spherical conversion
//! - [`caps`]: the per-device capability table (serde-loadable)
//! - [`params`]: effect kinds, parameters and parameter deltas
//! - [`report`]: bit-level report writer and reader
//! - [`encode`]: parameters and commands to reports
//! - [`decode`]: Block Load replies and PID State input reports
//! - [`status`]: device and effect status bitmasks
//! - [`quirks`]: per-device workarounds
//! - [`usage`]: standard selector values of the PID usage tables
//!
//! # Example
//!
//! ```
//! use pidff_common::scale::scale;
//!
//! // device gain 1000 of 10000 on a 0..255 field
//! assert_eq!(scale(1000, 0, 10_000, 0, 255), 25);
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]

pub mod caps;
pub mod decode;
pub mod direction;
pub mod encode;
pub mod params;
pub mod quirks;
pub mod report;
pub mod scale;
pub mod status;
pub mod usage;

pub use caps::{DeviceCapabilities, DeviceCommand, FieldLayout, PoolMode};
pub use direction::{DirectionRepr, DirectionVector};
pub use encode::{EffectOperation, ReportEncoder};
pub use params::{EffectKind, EffectParameters, EffectPayload, ParamGroups, ParameterDelta};
pub use quirks::DeviceQuirks;
pub use report::{Report, ReportKind};
pub use status::{EffectStatus, ForceFeedbackState};
