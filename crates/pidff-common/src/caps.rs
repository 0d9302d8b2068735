//! Per-device capability table.
//!
//! The table is produced by an external report-descriptor parser (or loaded
//! from a YAML/JSON file) and is immutable for the lifetime of a device
//! session. It tells the encoder where every PID field lives in which
//! report, and what logical/physical range it declares.

use std::collections::BTreeMap;

use pidff_errors::{PidError, Result};
use serde::{Deserialize, Serialize};

use crate::params::EffectKind;
use crate::quirks::DeviceQuirks;

/// Default unit exponent for PID time fields (milliseconds).
pub const DEFAULT_TIME_UNIT_EXPONENT: i8 = -3;

/// Inclusive value range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: i32,
    pub max: i32,
}

impl ValueRange {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }
}

/// Location and ranges of one field inside a report.
///
/// `bit_offset` counts from the first bit after the report id byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldLayout {
    pub bit_offset: u16,
    pub bit_size: u8,
    pub logical_min: i32,
    pub logical_max: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical: Option<ValueRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_exponent: Option<i8>,
}

impl FieldLayout {
    pub const fn new(bit_offset: u16, bit_size: u8, logical_min: i32, logical_max: i32) -> Self {
        Self {
            bit_offset,
            bit_size,
            logical_min,
            logical_max,
            physical: None,
            unit_exponent: None,
        }
    }

    /// A one-bit boolean field.
    pub const fn flag(bit_offset: u16) -> Self {
        Self::new(bit_offset, 1, 0, 1)
    }

    pub const fn with_physical(mut self, min: i32, max: i32) -> Self {
        self.physical = Some(ValueRange::new(min, max));
        self
    }

    pub const fn with_unit_exponent(mut self, exponent: i8) -> Self {
        self.unit_exponent = Some(exponent);
        self
    }

    pub fn is_signed(&self) -> bool {
        self.logical_min < 0
    }

    pub fn logical(&self) -> ValueRange {
        ValueRange::new(self.logical_min, self.logical_max)
    }

    /// Last bit (exclusive) occupied by the field.
    pub fn end_bit(&self) -> usize {
        usize::from(self.bit_offset) + usize::from(self.bit_size)
    }

    fn validate(&self, what: &str, report_len: usize) -> Result<()> {
        if self.bit_size == 0 || self.bit_size > 32 {
            return Err(PidError::invalid_parameter(format!(
                "{what}: bit size {} outside 1..=32",
                self.bit_size
            )));
        }
        if self.logical_min > self.logical_max {
            return Err(PidError::invalid_parameter(format!(
                "{what}: logical range {}..{} is inverted",
                self.logical_min, self.logical_max
            )));
        }
        if let Some(physical) = self.physical {
            if physical.min > physical.max {
                return Err(PidError::invalid_parameter(format!(
                    "{what}: physical range {}..{} is inverted",
                    physical.min, physical.max
                )));
            }
        }
        if self.end_bit() > report_len.saturating_mul(8) {
            return Err(PidError::invalid_parameter(format!(
                "{what}: bits {}..{} overflow a {report_len}-byte report",
                self.bit_offset,
                self.end_bit()
            )));
        }
        Ok(())
    }
}

/// One axis of the device, as described by the input report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisDescriptor {
    /// HID usage on the generic desktop page (X = 0x30, ...)
    pub usage: u16,
    /// Field carrying the axis position in the input report
    pub input: FieldLayout,
    /// Actuator enable bit in the Set Effect report; absent for axes
    /// without force feedback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actuator_enable: Option<FieldLayout>,
}

impl AxisDescriptor {
    pub fn is_actuator(&self) -> bool {
        self.actuator_enable.is_some()
    }
}

/// Set Effect / Update Effect report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetEffectLayout {
    pub report_id: u8,
    pub len: usize,
    pub block_index: FieldLayout,
    pub effect_type: FieldLayout,
    #[serde(default)]
    pub duration: Option<FieldLayout>,
    #[serde(default)]
    pub trigger_repeat_interval: Option<FieldLayout>,
    #[serde(default)]
    pub sample_period: Option<FieldLayout>,
    #[serde(default)]
    pub start_delay: Option<FieldLayout>,
    #[serde(default)]
    pub gain: Option<FieldLayout>,
    #[serde(default)]
    pub trigger_button: Option<FieldLayout>,
    #[serde(default)]
    pub direction_enable: Option<FieldLayout>,
    /// Direction instances (ordinals 1..N)
    #[serde(default)]
    pub direction: Vec<FieldLayout>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodicLayout {
    pub report_id: u8,
    pub len: usize,
    pub block_index: FieldLayout,
    pub magnitude: FieldLayout,
    #[serde(default)]
    pub offset: Option<FieldLayout>,
    #[serde(default)]
    pub phase: Option<FieldLayout>,
    #[serde(default)]
    pub period: Option<FieldLayout>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeLayout {
    pub report_id: u8,
    pub len: usize,
    pub block_index: FieldLayout,
    pub attack_level: FieldLayout,
    pub attack_time: FieldLayout,
    pub fade_level: FieldLayout,
    pub fade_time: FieldLayout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionLayout {
    pub report_id: u8,
    pub len: usize,
    pub block_index: FieldLayout,
    #[serde(default)]
    pub parameter_block_offset: Option<FieldLayout>,
    pub center_point_offset: FieldLayout,
    pub positive_coefficient: FieldLayout,
    #[serde(default)]
    pub negative_coefficient: Option<FieldLayout>,
    #[serde(default)]
    pub positive_saturation: Option<FieldLayout>,
    #[serde(default)]
    pub negative_saturation: Option<FieldLayout>,
    #[serde(default)]
    pub dead_band: Option<FieldLayout>,
    /// Condition records the device stores per effect (1 = shared record)
    pub records: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantForceLayout {
    pub report_id: u8,
    pub len: usize,
    pub block_index: FieldLayout,
    pub magnitude: FieldLayout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RampForceLayout {
    pub report_id: u8,
    pub len: usize,
    pub block_index: FieldLayout,
    pub start: FieldLayout,
    pub end: FieldLayout,
}

/// Selector values of the Effect Operation usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationValues {
    pub start: u32,
    pub start_solo: u32,
    pub stop: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectControlLayout {
    pub report_id: u8,
    pub len: usize,
    pub block_index: FieldLayout,
    pub operation: FieldLayout,
    #[serde(default)]
    pub loop_count: Option<FieldLayout>,
    pub operations: OperationValues,
}

/// Host-level device commands carried by the Device Control report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceCommand {
    Reset,
    StopAll,
    Pause,
    Continue,
    ActuatorsOn,
    ActuatorsOff,
}

impl DeviceCommand {
    pub const ALL: [DeviceCommand; 6] = [
        DeviceCommand::Reset,
        DeviceCommand::StopAll,
        DeviceCommand::Pause,
        DeviceCommand::Continue,
        DeviceCommand::ActuatorsOn,
        DeviceCommand::ActuatorsOff,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DeviceCommand::Reset => "reset",
            DeviceCommand::StopAll => "stop-all",
            DeviceCommand::Pause => "pause",
            DeviceCommand::Continue => "continue",
            DeviceCommand::ActuatorsOn => "actuators-on",
            DeviceCommand::ActuatorsOff => "actuators-off",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceControlLayout {
    pub report_id: u8,
    pub len: usize,
    pub control: FieldLayout,
    /// Selector value for each supported command
    pub commands: BTreeMap<DeviceCommand, u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceGainLayout {
    pub report_id: u8,
    pub len: usize,
    pub gain: FieldLayout,
}

/// Single boolean report, used for autocenter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleLayout {
    pub report_id: u8,
    pub len: usize,
    pub enable: FieldLayout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateNewEffectLayout {
    pub report_id: u8,
    pub len: usize,
    pub effect_type: FieldLayout,
    #[serde(default)]
    pub byte_count: Option<FieldLayout>,
}

/// Status values reported in the Block Load feature report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockLoadValues {
    pub success: u32,
    pub full: u32,
    pub error: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockLoadLayout {
    pub report_id: u8,
    pub len: usize,
    pub block_index: FieldLayout,
    pub status: FieldLayout,
    #[serde(default)]
    pub pool_available: Option<FieldLayout>,
    pub statuses: BlockLoadValues,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockFreeLayout {
    pub report_id: u8,
    pub len: usize,
    pub block_index: FieldLayout,
}

/// Reports only device-managed pools need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolLayout {
    pub create_new_effect: CreateNewEffectLayout,
    pub block_load: BlockLoadLayout,
    pub block_free: BlockFreeLayout,
}

/// PID State input report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStateLayout {
    pub report_id: u8,
    pub len: usize,
    #[serde(default)]
    pub paused: Option<FieldLayout>,
    #[serde(default)]
    pub actuators_enabled: Option<FieldLayout>,
    #[serde(default)]
    pub safety_switch: Option<FieldLayout>,
    #[serde(default)]
    pub override_switch: Option<FieldLayout>,
    #[serde(default)]
    pub actuator_power: Option<FieldLayout>,
    #[serde(default)]
    pub effect_playing: Option<FieldLayout>,
    #[serde(default)]
    pub block_index: Option<FieldLayout>,
}

/// Who allocates effect storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolMode {
    /// The host assigns fixed indices; the effect handle is the index
    #[default]
    HostManaged,
    /// The device allocates blocks through Create New Effect / Block Load
    DeviceManaged,
}

/// How the device exposes autocenter.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "report", rename_all = "snake_case")]
pub enum AutocenterSupport {
    #[default]
    Unsupported,
    /// The device keeps the setting; nothing is written per session
    Persistent,
    /// The setting is re-sent on every exclusive acquire
    PerAcquire(ToggleLayout),
}

/// Capability table of one PID device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    pub name: String,
    pub axes: Vec<AxisDescriptor>,
    /// Effect Type selector value for each kind the device can play
    pub effect_types: BTreeMap<EffectKind, u32>,
    pub set_effect: SetEffectLayout,
    #[serde(default)]
    pub periodic: Option<PeriodicLayout>,
    #[serde(default)]
    pub envelope: Option<EnvelopeLayout>,
    #[serde(default)]
    pub condition: Option<ConditionLayout>,
    #[serde(default)]
    pub constant_force: Option<ConstantForceLayout>,
    #[serde(default)]
    pub ramp_force: Option<RampForceLayout>,
    pub effect_control: EffectControlLayout,
    #[serde(default)]
    pub device_control: Option<DeviceControlLayout>,
    #[serde(default)]
    pub device_gain: Option<DeviceGainLayout>,
    #[serde(default)]
    pub device_state: Option<DeviceStateLayout>,
    #[serde(default)]
    pub pool_mode: PoolMode,
    #[serde(default)]
    pub pool: Option<PoolLayout>,
    /// Effects the device (or host index space) can hold at once
    pub max_effects: u8,
    #[serde(default)]
    pub autocenter: AutocenterSupport,
    #[serde(default)]
    pub quirks: DeviceQuirks,
}

impl DeviceCapabilities {
    /// Load a capability table from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let caps: Self = serde_yaml::from_str(text)
            .map_err(|e| PidError::invalid_parameter(format!("capability table: {e}")))?;
        caps.validate()?;
        Ok(caps)
    }

    /// Load a capability table from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let caps: Self = serde_json::from_str(text)
            .map_err(|e| PidError::invalid_parameter(format!("capability table: {e}")))?;
        caps.validate()?;
        Ok(caps)
    }

    pub fn supports_gain(&self) -> bool {
        self.device_gain.is_some()
    }

    pub fn supports_autocenter(&self) -> bool {
        !matches!(self.autocenter, AutocenterSupport::Unsupported)
    }

    /// Number of axes that can carry force feedback.
    pub fn actuator_count(&self) -> usize {
        self.axes.iter().filter(|axis| axis.is_actuator()).count()
    }

    pub fn axis(&self, index: u8) -> Option<&AxisDescriptor> {
        self.axes.get(usize::from(index))
    }

    /// Effect Type selector for `kind`, or `DeviceNotRegistered`.
    pub fn effect_type_value(&self, kind: EffectKind) -> Result<u32> {
        self.effect_types
            .get(&kind)
            .copied()
            .ok_or_else(|| PidError::DeviceNotRegistered(kind.name().to_string()))
    }

    /// Whether the device has both a type selector and a payload report for `kind`.
    pub fn supports_kind(&self, kind: EffectKind) -> bool {
        use crate::params::PayloadKind;

        self.effect_types.contains_key(&kind)
            && match kind.payload_kind() {
                PayloadKind::Periodic => self.periodic.is_some(),
                PayloadKind::Condition => self.condition.is_some(),
                PayloadKind::ConstantForce => self.constant_force.is_some(),
                PayloadKind::RampForce => self.ramp_force.is_some(),
            }
    }

    /// Check the table is self-consistent.
    pub fn validate(&self) -> Result<()> {
        if self.max_effects == 0 {
            return Err(PidError::invalid_parameter("max_effects must be at least 1"));
        }

        for (i, axis) in self.axes.iter().enumerate() {
            if let Some(enable) = &axis.actuator_enable {
                enable.validate(&format!("axis {i} actuator enable"), self.set_effect.len)?;
            }
        }

        let set = &self.set_effect;
        check_report_id("set effect", set.report_id)?;
        let mut fields = vec![("block index", Some(set.block_index)), ("effect type", Some(set.effect_type))];
        fields.extend([
            ("duration", set.duration),
            ("trigger repeat interval", set.trigger_repeat_interval),
            ("sample period", set.sample_period),
            ("start delay", set.start_delay),
            ("gain", set.gain),
            ("trigger button", set.trigger_button),
            ("direction enable", set.direction_enable),
        ]);
        validate_fields("set effect", set.len, &fields)?;
        for (i, field) in set.direction.iter().enumerate() {
            field.validate(&format!("set effect: direction {i}"), set.len)?;
        }

        if let Some(l) = &self.periodic {
            check_report_id("set periodic", l.report_id)?;
            validate_fields(
                "set periodic",
                l.len,
                &[
                    ("block index", Some(l.block_index)),
                    ("magnitude", Some(l.magnitude)),
                    ("offset", l.offset),
                    ("phase", l.phase),
                    ("period", l.period),
                ],
            )?;
        }
        if let Some(l) = &self.envelope {
            check_report_id("set envelope", l.report_id)?;
            validate_fields(
                "set envelope",
                l.len,
                &[
                    ("block index", Some(l.block_index)),
                    ("attack level", Some(l.attack_level)),
                    ("attack time", Some(l.attack_time)),
                    ("fade level", Some(l.fade_level)),
                    ("fade time", Some(l.fade_time)),
                ],
            )?;
        }
        if let Some(l) = &self.condition {
            check_report_id("set condition", l.report_id)?;
            if l.records == 0 {
                return Err(PidError::invalid_parameter(
                    "set condition: records must be at least 1",
                ));
            }
            validate_fields(
                "set condition",
                l.len,
                &[
                    ("block index", Some(l.block_index)),
                    ("parameter block offset", l.parameter_block_offset),
                    ("center point offset", Some(l.center_point_offset)),
                    ("positive coefficient", Some(l.positive_coefficient)),
                    ("negative coefficient", l.negative_coefficient),
                    ("positive saturation", l.positive_saturation),
                    ("negative saturation", l.negative_saturation),
                    ("dead band", l.dead_band),
                ],
            )?;
        }
        if let Some(l) = &self.constant_force {
            check_report_id("set constant force", l.report_id)?;
            validate_fields(
                "set constant force",
                l.len,
                &[("block index", Some(l.block_index)), ("magnitude", Some(l.magnitude))],
            )?;
        }
        if let Some(l) = &self.ramp_force {
            check_report_id("set ramp force", l.report_id)?;
            validate_fields(
                "set ramp force",
                l.len,
                &[
                    ("block index", Some(l.block_index)),
                    ("ramp start", Some(l.start)),
                    ("ramp end", Some(l.end)),
                ],
            )?;
        }

        let l = &self.effect_control;
        check_report_id("effect operation", l.report_id)?;
        validate_fields(
            "effect operation",
            l.len,
            &[
                ("block index", Some(l.block_index)),
                ("operation", Some(l.operation)),
                ("loop count", l.loop_count),
            ],
        )?;

        if let Some(l) = &self.device_control {
            check_report_id("device control", l.report_id)?;
            validate_fields("device control", l.len, &[("control", Some(l.control))])?;
        }
        if let Some(l) = &self.device_gain {
            check_report_id("device gain", l.report_id)?;
            validate_fields("device gain", l.len, &[("gain", Some(l.gain))])?;
        }
        if let AutocenterSupport::PerAcquire(l) = &self.autocenter {
            check_report_id("autocenter", l.report_id)?;
            validate_fields("autocenter", l.len, &[("enable", Some(l.enable))])?;
        }
        if let Some(l) = &self.device_state {
            check_report_id("device state", l.report_id)?;
            validate_fields(
                "device state",
                l.len,
                &[
                    ("paused", l.paused),
                    ("actuators enabled", l.actuators_enabled),
                    ("safety switch", l.safety_switch),
                    ("override switch", l.override_switch),
                    ("actuator power", l.actuator_power),
                    ("effect playing", l.effect_playing),
                    ("block index", l.block_index),
                ],
            )?;
        }

        match (self.pool_mode, &self.pool) {
            (PoolMode::DeviceManaged, None) => {
                return Err(PidError::invalid_parameter(
                    "device-managed pool needs create new effect, block load and block free reports",
                ));
            }
            (_, Some(pool)) => {
                let c = &pool.create_new_effect;
                check_report_id("create new effect", c.report_id)?;
                validate_fields(
                    "create new effect",
                    c.len,
                    &[("effect type", Some(c.effect_type)), ("byte count", c.byte_count)],
                )?;
                let b = &pool.block_load;
                check_report_id("block load", b.report_id)?;
                validate_fields(
                    "block load",
                    b.len,
                    &[
                        ("block index", Some(b.block_index)),
                        ("status", Some(b.status)),
                        ("pool available", b.pool_available),
                    ],
                )?;
                let f = &pool.block_free;
                check_report_id("block free", f.report_id)?;
                validate_fields("block free", f.len, &[("block index", Some(f.block_index))])?;
            }
            (PoolMode::HostManaged, None) => {}
        }

        Ok(())
    }
}

fn check_report_id(report: &str, report_id: u8) -> Result<()> {
    if report_id == 0 {
        return Err(PidError::invalid_parameter(format!(
            "{report}: report id 0 is reserved"
        )));
    }
    Ok(())
}

fn validate_fields(report: &str, len: usize, fields: &[(&str, Option<FieldLayout>)]) -> Result<()> {
    for (name, field) in fields {
        if let Some(field) = field {
            field.validate(&format!("{report}: {name}"), len)?;
        }
    }
    Ok(())
}
