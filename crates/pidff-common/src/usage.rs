//! Standard selector values from the HID PID usage tables.
//!
//! Devices built to the tables use these as logical values of the
//! corresponding array fields. Capability tables may override every one of
//! them; these are the defaults used by the builders.

use std::collections::BTreeMap;

use crate::caps::{BlockLoadValues, DeviceCommand, OperationValues};
use crate::params::EffectKind;

/// Generic desktop X axis
pub const USAGE_X: u16 = 0x30;
/// Generic desktop Y axis
pub const USAGE_Y: u16 = 0x31;
/// Generic desktop Z axis
pub const USAGE_Z: u16 = 0x32;
pub const USAGE_RX: u16 = 0x33;
pub const USAGE_RY: u16 = 0x34;
pub const USAGE_RZ: u16 = 0x35;

/// Effect Operation: Op Effect Start / Start Solo / Stop
pub const STANDARD_OPERATIONS: OperationValues = OperationValues {
    start: 1,
    start_solo: 2,
    stop: 3,
};

/// Block Load Status: Success / Full / Error
pub const STANDARD_BLOCK_LOAD: BlockLoadValues = BlockLoadValues {
    success: 1,
    full: 2,
    error: 3,
};

/// Effect Type array index of `kind` in the usage-table order.
pub fn standard_effect_type(kind: EffectKind) -> u32 {
    match kind {
        EffectKind::ConstantForce => 1,
        EffectKind::RampForce => 2,
        EffectKind::Square => 3,
        EffectKind::Sine => 4,
        EffectKind::Triangle => 5,
        EffectKind::SawtoothUp => 6,
        EffectKind::SawtoothDown => 7,
        EffectKind::Spring => 8,
        EffectKind::Damper => 9,
        EffectKind::Inertia => 10,
        EffectKind::Friction => 11,
    }
}

/// PID Device Control array index of `command`.
pub fn standard_device_command(command: DeviceCommand) -> u32 {
    match command {
        DeviceCommand::ActuatorsOn => 1,
        DeviceCommand::ActuatorsOff => 2,
        DeviceCommand::StopAll => 3,
        DeviceCommand::Reset => 4,
        DeviceCommand::Pause => 5,
        DeviceCommand::Continue => 6,
    }
}

/// Effect type map covering every kind.
pub fn all_effect_types() -> BTreeMap<EffectKind, u32> {
    EffectKind::ALL
        .iter()
        .map(|&kind| (kind, standard_effect_type(kind)))
        .collect()
}

/// Device control map covering every command.
pub fn all_device_commands() -> BTreeMap<DeviceCommand, u32> {
    DeviceCommand::ALL
        .iter()
        .map(|&command| (command, standard_device_command(command)))
        .collect()
}
