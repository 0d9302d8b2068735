//! Effect engine for USB HID PID force feedback devices
//!
//! [`PidDevice`] owns one device session: it tracks effect objects, turns
//! parameter changes into the minimal set of PID reports, and writes them
//! through a [`PidTransport`]. Inbound Device State reports are fed to a
//! [`StatusSink`] from any thread.
//!
//! ```
//! use pidff_engine::prelude::*;
//! use pidff_engine::transport::mock::MockTransport;
//! # fn run(caps: pidff_common::DeviceCapabilities) -> pidff_errors::Result<()> {
//! let device = PidDevice::new(caps, MockTransport::new())?;
//! device.acquire(AccessMode::Exclusive)?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]

pub mod device;
pub mod effect;
pub mod pool;
pub mod prelude;
pub mod status;
pub mod transport;

pub use device::{AccessMode, EffectInfo, PidDevice, SetFlags, StartFlags};
pub use pool::EffectHandle;
pub use status::{EffectState, StatusSink};
pub use transport::PidTransport;
