//! Caller-visible status bitmasks.

use bitflags::bitflags;

bitflags! {
    /// Device-level force feedback state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ForceFeedbackState: u32 {
        /// No effects are created on the device
        const EMPTY = 0x0000_0001;
        /// No effect is playing
        const STOPPED = 0x0000_0002;
        const PAUSED = 0x0000_0004;
        const ACTUATORS_ON = 0x0000_0010;
        const ACTUATORS_OFF = 0x0000_0020;
        const POWER_ON = 0x0000_0040;
        const POWER_OFF = 0x0000_0080;
        const SAFETY_SWITCH_ON = 0x0000_0100;
        const SAFETY_SWITCH_OFF = 0x0000_0200;
        const USER_FF_SWITCH_ON = 0x0000_0400;
        const USER_FF_SWITCH_OFF = 0x0000_0800;
        const DEVICE_LOST = 0x8000_0000;
    }
}

bitflags! {
    /// Per-effect status.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EffectStatus: u32 {
        const PLAYING = 0x0000_0001;
        const EMULATED = 0x0000_0002;
    }
}

impl ForceFeedbackState {
    /// Pick the on or off flag of a pair.
    pub fn pair(on: bool, on_flag: Self, off_flag: Self) -> Self {
        if on { on_flag } else { off_flag }
    }
}
