//! Capability tables of reference devices.
//!
//! Layouts follow the example report descriptor of the PID usage tables,
//! with byte-aligned fields so expected bytes are easy to read.

use pidff_common::caps::{
    AutocenterSupport, AxisDescriptor, BlockFreeLayout, BlockLoadLayout, ConditionLayout,
    ConstantForceLayout, CreateNewEffectLayout, DeviceCapabilities, DeviceControlLayout,
    DeviceGainLayout, DeviceStateLayout, EffectControlLayout, EnvelopeLayout, FieldLayout,
    PeriodicLayout, PoolLayout, PoolMode, RampForceLayout, SetEffectLayout, ToggleLayout,
};
use pidff_common::params::EffectKind;
use pidff_common::quirks::DeviceQuirks;
use pidff_common::usage::{
    STANDARD_BLOCK_LOAD, STANDARD_OPERATIONS, USAGE_RZ, USAGE_X, USAGE_Y, USAGE_Z,
    all_device_commands, all_effect_types,
};

pub const SET_EFFECT: u8 = 0x01;
pub const SET_ENVELOPE: u8 = 0x02;
pub const SET_CONDITION: u8 = 0x03;
pub const SET_PERIODIC: u8 = 0x04;
pub const SET_CONSTANT_FORCE: u8 = 0x05;
pub const SET_RAMP_FORCE: u8 = 0x06;
pub const EFFECT_OPERATION: u8 = 0x0A;
pub const BLOCK_FREE: u8 = 0x0B;
pub const DEVICE_CONTROL: u8 = 0x0C;
pub const DEVICE_GAIN: u8 = 0x0D;
pub const AUTOCENTER: u8 = 0x0E;
pub const CREATE_NEW_EFFECT: u8 = 0x11;
pub const BLOCK_LOAD: u8 = 0x12;
/// Input report
pub const PID_STATE: u8 = 0x02;

const fn byte(index: u16) -> FieldLayout {
    FieldLayout::new(index * 8, 8, 0, 255)
}

const fn signed_byte(index: u16) -> FieldLayout {
    FieldLayout::new(index * 8, 8, -128, 127)
}

const fn time(bit_offset: u16) -> FieldLayout {
    FieldLayout::new(bit_offset, 16, 0, 0x7FFF).with_unit_exponent(-3)
}

fn axis(usage: u16, input_byte: u16, enable_bit: Option<u16>) -> AxisDescriptor {
    AxisDescriptor {
        usage,
        input: FieldLayout::new(input_byte * 16, 16, 0, 0xFFFF),
        actuator_enable: enable_bit.map(FieldLayout::flag),
    }
}

/// Three force feedback axes (X, Y, Z) plus an RZ axis without an
/// actuator; host-managed pool of 8 effects; persistent autocenter.
///
/// Every kind except Inertia is mapped.
pub fn three_axis_wheel() -> DeviceCapabilities {
    let mut effect_types = all_effect_types();
    effect_types.remove(&EffectKind::Inertia);

    DeviceCapabilities {
        name: "Reference Wheel".to_string(),
        axes: vec![
            axis(USAGE_X, 0, Some(96)),
            axis(USAGE_Y, 1, Some(97)),
            axis(USAGE_Z, 2, Some(98)),
            axis(USAGE_RZ, 3, None),
        ],
        effect_types,
        set_effect: SetEffectLayout {
            report_id: SET_EFFECT,
            len: 15,
            block_index: byte(0),
            effect_type: FieldLayout::new(8, 8, 1, 11),
            duration: Some(time(16)),
            trigger_repeat_interval: Some(time(32)),
            sample_period: Some(time(48)),
            start_delay: Some(time(64)),
            gain: Some(byte(10)),
            trigger_button: Some(FieldLayout::new(88, 8, 1, 8)),
            direction_enable: Some(FieldLayout::flag(99)),
            direction: vec![
                byte(13).with_physical(0, 36_000),
                byte(14).with_physical(0, 36_000),
            ],
        },
        periodic: Some(PeriodicLayout {
            report_id: SET_PERIODIC,
            len: 6,
            block_index: byte(0),
            magnitude: byte(1),
            offset: Some(signed_byte(2)),
            phase: Some(byte(3).with_physical(0, 36_000)),
            period: Some(time(32)),
        }),
        envelope: Some(EnvelopeLayout {
            report_id: SET_ENVELOPE,
            len: 7,
            block_index: byte(0),
            attack_level: byte(1),
            fade_level: byte(2),
            attack_time: time(24),
            fade_time: time(40),
        }),
        condition: Some(ConditionLayout {
            report_id: SET_CONDITION,
            len: 8,
            block_index: byte(0),
            parameter_block_offset: Some(FieldLayout::new(8, 4, 0, 1)),
            center_point_offset: signed_byte(2).with_physical(-10_000, 10_000),
            positive_coefficient: signed_byte(3).with_physical(-10_000, 10_000),
            negative_coefficient: Some(signed_byte(4).with_physical(-10_000, 10_000)),
            positive_saturation: Some(byte(5)),
            negative_saturation: Some(byte(6)),
            dead_band: Some(byte(7)),
            records: 2,
        }),
        constant_force: Some(ConstantForceLayout {
            report_id: SET_CONSTANT_FORCE,
            len: 3,
            block_index: byte(0),
            magnitude: FieldLayout::new(8, 16, -10_000, 10_000),
        }),
        ramp_force: Some(RampForceLayout {
            report_id: SET_RAMP_FORCE,
            len: 5,
            block_index: byte(0),
            start: FieldLayout::new(8, 16, -10_000, 10_000),
            end: FieldLayout::new(24, 16, -10_000, 10_000),
        }),
        effect_control: EffectControlLayout {
            report_id: EFFECT_OPERATION,
            len: 3,
            block_index: byte(0),
            operation: FieldLayout::new(8, 8, 1, 3),
            loop_count: Some(byte(2)),
            operations: STANDARD_OPERATIONS,
        },
        device_control: Some(DeviceControlLayout {
            report_id: DEVICE_CONTROL,
            len: 1,
            control: FieldLayout::new(0, 8, 1, 6),
            commands: all_device_commands(),
        }),
        device_gain: Some(DeviceGainLayout {
            report_id: DEVICE_GAIN,
            len: 1,
            gain: byte(0),
        }),
        device_state: Some(DeviceStateLayout {
            report_id: PID_STATE,
            len: 2,
            paused: Some(FieldLayout::flag(0)),
            actuators_enabled: Some(FieldLayout::flag(1)),
            safety_switch: Some(FieldLayout::flag(2)),
            override_switch: Some(FieldLayout::flag(3)),
            actuator_power: Some(FieldLayout::flag(4)),
            effect_playing: Some(FieldLayout::flag(8)),
            block_index: Some(FieldLayout::new(9, 7, 1, 40)),
        }),
        pool_mode: PoolMode::HostManaged,
        pool: None,
        max_effects: 8,
        autocenter: AutocenterSupport::Persistent,
        quirks: DeviceQuirks::default(),
    }
}

/// [`three_axis_wheel`] with a device-managed pool of `capacity` blocks
/// and a per-acquire autocenter report.
pub fn device_managed_wheel(capacity: u8) -> DeviceCapabilities {
    DeviceCapabilities {
        name: "Reference Wheel (device pool)".to_string(),
        pool_mode: PoolMode::DeviceManaged,
        pool: Some(PoolLayout {
            create_new_effect: CreateNewEffectLayout {
                report_id: CREATE_NEW_EFFECT,
                len: 1,
                effect_type: FieldLayout::new(0, 8, 1, 11),
                byte_count: None,
            },
            block_load: BlockLoadLayout {
                report_id: BLOCK_LOAD,
                len: 4,
                block_index: FieldLayout::new(0, 8, 1, 40),
                status: FieldLayout::new(8, 8, 1, 3),
                pool_available: Some(FieldLayout::new(16, 16, 0, 0xFFFF)),
                statuses: STANDARD_BLOCK_LOAD,
            },
            block_free: BlockFreeLayout {
                report_id: BLOCK_FREE,
                len: 1,
                block_index: FieldLayout::new(0, 8, 1, 40),
            },
        }),
        max_effects: capacity,
        autocenter: AutocenterSupport::PerAcquire(ToggleLayout {
            report_id: AUTOCENTER,
            len: 1,
            enable: FieldLayout::flag(0),
        }),
        ..three_axis_wheel()
    }
}

/// Single X axis with constant force only and no device control report.
pub fn minimal_joystick() -> DeviceCapabilities {
    let wheel = three_axis_wheel();
    DeviceCapabilities {
        name: "Minimal Joystick".to_string(),
        axes: vec![axis(USAGE_X, 0, Some(96))],
        effect_types: [(EffectKind::ConstantForce, 1)].into_iter().collect(),
        periodic: None,
        envelope: None,
        condition: None,
        ramp_force: None,
        device_control: None,
        device_gain: None,
        device_state: None,
        autocenter: AutocenterSupport::Unsupported,
        ..wheel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_validate() {
        for caps in [three_axis_wheel(), device_managed_wheel(4), minimal_joystick()] {
            assert!(caps.validate().is_ok(), "{} failed validation", caps.name);
        }
    }

    #[test]
    fn test_reference_wheel_shape() {
        let caps = three_axis_wheel();
        assert_eq!(caps.actuator_count(), 3);
        assert!(caps.supports_kind(EffectKind::Sine));
        assert!(!caps.supports_kind(EffectKind::Inertia));
    }
}
