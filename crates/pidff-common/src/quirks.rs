//! Device quirks for PID devices that deviate from the usage tables
//!
//! Quirks are part of the capability table, so a device file can switch
//! them on without code changes.

use serde::{Deserialize, Serialize};

/// Device-specific workarounds applied by the encoder and the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceQuirks {
    /// Swap positive/negative coefficients and saturations for condition
    /// effects (Spring, Damper, Inertia, Friction)
    pub fix_conditional_direction: bool,

    /// Send the autocenter setting before the reset command on acquire
    ///
    /// Some firmwares re-enable autocenter on reset and ignore a setting
    /// written afterwards.
    pub autocenter_before_reset: bool,
}
