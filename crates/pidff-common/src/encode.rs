//! Encoding of effect parameters and commands into wire reports.
//!
//! Every value is rescaled from its device-independent range (the field's
//! physical range when declared) into the field's logical range with the
//! truncating [`scale`]. Time values are first converted from microseconds
//! to the field's unit.

use pidff_errors::{PidError, Result};

use crate::caps::{
    AutocenterSupport, DEFAULT_TIME_UNIT_EXPONENT, DeviceCapabilities, DeviceCommand, FieldLayout,
    PoolLayout, ValueRange,
};
use crate::direction::FULL_CIRCLE;
use crate::params::{
    Condition, ConstantForce, Duration, EffectKind, EffectParameters, EffectPayload, Envelope,
    NOMINAL_MAX, Periodic, RampForce, TriggerButton,
};
use crate::report::{Report, ReportKind, ReportWriter};
use crate::scale::{micros_to_unit, scale};

/// Unsigned levels: magnitude, gain, envelope levels, saturation, deadband.
pub const UNSIGNED_LEVEL: ValueRange = ValueRange::new(0, NOMINAL_MAX);
/// Signed levels: offsets, coefficients, constant/ramp forces.
pub const SIGNED_LEVEL: ValueRange = ValueRange::new(-NOMINAL_MAX, NOMINAL_MAX);
/// Angles in hundredths of a degree.
pub const ANGLE: ValueRange = ValueRange::new(0, FULL_CIRCLE);

/// Effect Operation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectOperation {
    Start,
    StartSolo,
    Stop,
}

/// Logical value for `value` given in `nominal` units.
pub fn level_value(field: &FieldLayout, value: i64, nominal: ValueRange) -> i64 {
    let source = field.physical.unwrap_or(nominal);
    scale(
        value,
        i64::from(source.min),
        i64::from(source.max),
        i64::from(field.logical_min),
        i64::from(field.logical_max),
    )
}

/// Logical value for a level that must stay non-negative on the wire.
///
/// Both ranges are cut at zero, so negative inputs clamp to the bottom of
/// the unsigned part of the logical range.
pub fn unsigned_level_value(field: &FieldLayout, value: i64, nominal: ValueRange) -> i64 {
    let source = field.physical.unwrap_or(nominal);
    scale(
        value,
        i64::from(source.min.max(0)),
        i64::from(source.max),
        i64::from(field.logical_min.max(0)),
        i64::from(field.logical_max),
    )
}

/// Logical value for a time given in microseconds.
pub fn time_value(field: &FieldLayout, micros: u32) -> i64 {
    let exponent = field.unit_exponent.unwrap_or(DEFAULT_TIME_UNIT_EXPONENT);
    let units = micros_to_unit(i64::from(micros), exponent);
    match field.physical {
        Some(physical) => scale(
            units,
            i64::from(physical.min),
            i64::from(physical.max),
            i64::from(field.logical_min),
            i64::from(field.logical_max),
        ),
        None => units,
    }
}

/// Fail when `button` lies outside the trigger button field's logical range.
pub fn check_trigger_button(field: &FieldLayout, button: u8) -> Result<()> {
    let button = i32::from(button);
    if button < field.logical_min || button > field.logical_max {
        return Err(PidError::invalid_parameter(format!(
            "trigger button {button} outside {}..={}",
            field.logical_min, field.logical_max
        )));
    }
    Ok(())
}

/// Turns parameters into reports for one device.
#[derive(Debug, Clone, Copy)]
pub struct ReportEncoder<'a> {
    caps: &'a DeviceCapabilities,
}

impl<'a> ReportEncoder<'a> {
    pub fn new(caps: &'a DeviceCapabilities) -> Self {
        Self { caps }
    }

    pub fn caps(&self) -> &'a DeviceCapabilities {
        self.caps
    }

    fn pool(&self) -> Result<&'a PoolLayout> {
        self.caps
            .pool
            .as_ref()
            .ok_or_else(|| PidError::usage_not_found("create new effect / block load / block free"))
    }

    /// Set Effect report: type, axes, direction, timing, gain, trigger.
    pub fn set_effect(&self, index: u8, kind: EffectKind, params: &EffectParameters) -> Result<Report> {
        let layout = &self.caps.set_effect;
        let mut writer = ReportWriter::new(layout.report_id, layout.len);
        writer.put(&layout.block_index, i64::from(index));
        writer.put(&layout.effect_type, i64::from(self.caps.effect_type_value(kind)?));

        if let Some(field) = &layout.duration {
            match params.duration {
                Duration::Infinite => writer.put_null(field),
                Duration::Finite(micros) => writer.put(field, time_value(field, micros)),
            };
        }
        if let Some(field) = &layout.trigger_repeat_interval {
            writer.put(field, time_value(field, params.trigger_repeat_interval));
        }
        if let Some(field) = &layout.sample_period {
            writer.put(field, time_value(field, params.sample_period));
        }
        if let Some(field) = &layout.start_delay {
            writer.put(field, time_value(field, params.start_delay));
        }
        if let Some(field) = &layout.gain {
            writer.put(field, level_value(field, i64::from(params.gain), UNSIGNED_LEVEL));
        }
        if let Some(field) = &layout.trigger_button {
            match params.trigger_button {
                TriggerButton::None => writer.put_null(field),
                TriggerButton::Button(button) => {
                    check_trigger_button(field, button)?;
                    writer.put(field, i64::from(button))
                }
            };
        }

        for &axis in &params.axes {
            let enable = self
                .caps
                .axis(axis)
                .and_then(|descriptor| descriptor.actuator_enable.as_ref())
                .ok_or_else(|| {
                    PidError::invalid_parameter(format!("axis {axis} has no force feedback actuator"))
                })?;
            writer.put_flag(enable, true);
        }
        if let Some(field) = &layout.direction_enable {
            writer.put_flag(field, params.axes.len() >= 2);
        }
        for (field, angle) in layout.direction.iter().zip(params.direction.spherical_angles()) {
            writer.put(field, level_value(field, i64::from(angle), ANGLE));
        }

        Ok(writer.finish(ReportKind::Output))
    }

    /// Type-specific report(s) for `payload`.
    pub fn payload(&self, index: u8, kind: EffectKind, payload: &EffectPayload) -> Result<Vec<Report>> {
        match payload {
            EffectPayload::Periodic(periodic) => Ok(vec![self.periodic(index, kind, periodic)?]),
            EffectPayload::Condition(records) => self.condition(index, kind, records),
            EffectPayload::ConstantForce(force) => Ok(vec![self.constant_force(index, kind, force)?]),
            EffectPayload::RampForce(ramp) => Ok(vec![self.ramp_force(index, kind, ramp)?]),
        }
    }

    pub fn periodic(&self, index: u8, kind: EffectKind, periodic: &Periodic) -> Result<Report> {
        let layout = self
            .caps
            .periodic
            .as_ref()
            .ok_or_else(|| PidError::DeviceNotRegistered(kind.name().to_string()))?;
        let mut writer = ReportWriter::new(layout.report_id, layout.len);
        writer.put(&layout.block_index, i64::from(index));
        writer.put(
            &layout.magnitude,
            level_value(&layout.magnitude, i64::from(periodic.magnitude), UNSIGNED_LEVEL),
        );
        if let Some(field) = &layout.offset {
            writer.put(field, level_value(field, i64::from(periodic.offset), SIGNED_LEVEL));
        }
        if let Some(field) = &layout.phase {
            writer.put(field, level_value(field, i64::from(periodic.phase), ANGLE));
        }
        if let Some(field) = &layout.period {
            writer.put(field, time_value(field, periodic.period));
        }
        Ok(writer.finish(ReportKind::Output))
    }

    /// Set Envelope report; `None` sends zero levels and times.
    pub fn envelope(&self, index: u8, envelope: Option<&Envelope>) -> Result<Report> {
        let layout = self
            .caps
            .envelope
            .as_ref()
            .ok_or_else(|| PidError::usage_not_found("set envelope"))?;
        let envelope = envelope.copied().unwrap_or_default();
        let mut writer = ReportWriter::new(layout.report_id, layout.len);
        writer.put(&layout.block_index, i64::from(index));
        writer.put(
            &layout.attack_level,
            level_value(&layout.attack_level, i64::from(envelope.attack_level), UNSIGNED_LEVEL),
        );
        writer.put(&layout.attack_time, time_value(&layout.attack_time, envelope.attack_time));
        writer.put(
            &layout.fade_level,
            level_value(&layout.fade_level, i64::from(envelope.fade_level), UNSIGNED_LEVEL),
        );
        writer.put(&layout.fade_time, time_value(&layout.fade_time, envelope.fade_time));
        Ok(writer.finish(ReportKind::Output))
    }

    /// One Set Condition report per record the device stores.
    pub fn condition(&self, index: u8, kind: EffectKind, records: &[Condition]) -> Result<Vec<Report>> {
        let layout = self
            .caps
            .condition
            .as_ref()
            .ok_or_else(|| PidError::DeviceNotRegistered(kind.name().to_string()))?;
        let swap = self.caps.quirks.fix_conditional_direction;

        records
            .iter()
            .take(usize::from(layout.records))
            .enumerate()
            .map(|(ordinal, record)| {
                let (pos_coeff, neg_coeff, pos_sat, neg_sat) = if swap {
                    (
                        record.negative_coefficient,
                        record.positive_coefficient,
                        record.negative_saturation,
                        record.positive_saturation,
                    )
                } else {
                    (
                        record.positive_coefficient,
                        record.negative_coefficient,
                        record.positive_saturation,
                        record.negative_saturation,
                    )
                };

                let mut writer = ReportWriter::new(layout.report_id, layout.len);
                writer.put(&layout.block_index, i64::from(index));
                if let Some(field) = &layout.parameter_block_offset {
                    writer.put(field, i64::try_from(ordinal).unwrap_or(i64::MAX));
                }
                writer.put(
                    &layout.center_point_offset,
                    level_value(&layout.center_point_offset, i64::from(record.offset), SIGNED_LEVEL),
                );
                writer.put(
                    &layout.positive_coefficient,
                    level_value(&layout.positive_coefficient, i64::from(pos_coeff), SIGNED_LEVEL),
                );
                if let Some(field) = &layout.negative_coefficient {
                    writer.put(field, level_value(field, i64::from(neg_coeff), SIGNED_LEVEL));
                }
                if let Some(field) = &layout.positive_saturation {
                    writer.put(field, unsigned_level_value(field, i64::from(pos_sat), UNSIGNED_LEVEL));
                }
                if let Some(field) = &layout.negative_saturation {
                    writer.put(field, unsigned_level_value(field, i64::from(neg_sat), UNSIGNED_LEVEL));
                }
                if let Some(field) = &layout.dead_band {
                    writer.put(
                        field,
                        unsigned_level_value(field, i64::from(record.deadband), UNSIGNED_LEVEL),
                    );
                }
                Ok(writer.finish(ReportKind::Output))
            })
            .collect()
    }

    pub fn constant_force(&self, index: u8, kind: EffectKind, force: &ConstantForce) -> Result<Report> {
        let layout = self
            .caps
            .constant_force
            .as_ref()
            .ok_or_else(|| PidError::DeviceNotRegistered(kind.name().to_string()))?;
        let mut writer = ReportWriter::new(layout.report_id, layout.len);
        writer.put(&layout.block_index, i64::from(index));
        writer.put(
            &layout.magnitude,
            level_value(&layout.magnitude, i64::from(force.magnitude), SIGNED_LEVEL),
        );
        Ok(writer.finish(ReportKind::Output))
    }

    pub fn ramp_force(&self, index: u8, kind: EffectKind, ramp: &RampForce) -> Result<Report> {
        let layout = self
            .caps
            .ramp_force
            .as_ref()
            .ok_or_else(|| PidError::DeviceNotRegistered(kind.name().to_string()))?;
        let mut writer = ReportWriter::new(layout.report_id, layout.len);
        writer.put(&layout.block_index, i64::from(index));
        writer.put(&layout.start, level_value(&layout.start, i64::from(ramp.start), SIGNED_LEVEL));
        writer.put(&layout.end, level_value(&layout.end, i64::from(ramp.end), SIGNED_LEVEL));
        Ok(writer.finish(ReportKind::Output))
    }

    /// Effect Operation report. `u32::MAX` iterations means "loop forever"
    /// and encodes as the loop count's logical maximum.
    pub fn effect_control(&self, index: u8, operation: EffectOperation, iterations: u32) -> Report {
        let layout = &self.caps.effect_control;
        let selector = match operation {
            EffectOperation::Start => layout.operations.start,
            EffectOperation::StartSolo => layout.operations.start_solo,
            EffectOperation::Stop => layout.operations.stop,
        };
        let mut writer = ReportWriter::new(layout.report_id, layout.len);
        writer.put(&layout.block_index, i64::from(index));
        writer.put(&layout.operation, i64::from(selector));
        if let Some(field) = &layout.loop_count {
            let count = match operation {
                EffectOperation::Stop => 0,
                _ if iterations == u32::MAX => i64::from(field.logical_max),
                _ => i64::from(iterations),
            };
            writer.put(field, count);
        }
        writer.finish(ReportKind::Output)
    }

    pub fn device_control(&self, command: DeviceCommand) -> Result<Report> {
        let layout = self
            .caps
            .device_control
            .as_ref()
            .ok_or_else(|| PidError::usage_not_found("device control"))?;
        let selector = layout
            .commands
            .get(&command)
            .ok_or_else(|| PidError::usage_not_found(format!("device control: {}", command.name())))?;
        let mut writer = ReportWriter::new(layout.report_id, layout.len);
        writer.put(&layout.control, i64::from(*selector));
        Ok(writer.finish(ReportKind::Output))
    }

    pub fn device_gain(&self, gain: u32) -> Result<Report> {
        let layout = self
            .caps
            .device_gain
            .as_ref()
            .ok_or_else(|| PidError::usage_not_found("device gain"))?;
        let mut writer = ReportWriter::new(layout.report_id, layout.len);
        writer.put(&layout.gain, level_value(&layout.gain, i64::from(gain), UNSIGNED_LEVEL));
        Ok(writer.finish(ReportKind::Output))
    }

    /// Autocenter report, or `None` when the device keeps the setting itself.
    pub fn autocenter(&self, enabled: bool) -> Result<Option<Report>> {
        match &self.caps.autocenter {
            AutocenterSupport::Unsupported => Err(PidError::usage_not_found("autocenter")),
            AutocenterSupport::Persistent => Ok(None),
            AutocenterSupport::PerAcquire(layout) => {
                let mut writer = ReportWriter::new(layout.report_id, layout.len);
                writer.put_flag(&layout.enable, enabled);
                Ok(Some(writer.finish(ReportKind::Output)))
            }
        }
    }

    /// Create New Effect feature report for a device-managed pool.
    pub fn create_new_effect(&self, kind: EffectKind) -> Result<Report> {
        let layout = &self.pool()?.create_new_effect;
        let mut writer = ReportWriter::new(layout.report_id, layout.len);
        writer.put(&layout.effect_type, i64::from(self.caps.effect_type_value(kind)?));
        Ok(writer.finish(ReportKind::Feature))
    }

    pub fn block_free(&self, index: u8) -> Result<Report> {
        let layout = &self.pool()?.block_free;
        let mut writer = ReportWriter::new(layout.report_id, layout.len);
        writer.put(&layout.block_index, i64::from(index));
        Ok(writer.finish(ReportKind::Output))
    }

    /// Report id and full length (id included) of the Block Load reply.
    pub fn block_load_request(&self) -> Result<(u8, usize)> {
        let layout = &self.pool()?.block_load;
        Ok((layout.report_id, layout.len.saturating_add(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_value_uses_physical_range() {
        let field = FieldLayout::new(0, 8, 0, 255).with_physical(0, 36_000);
        assert_eq!(level_value(&field, 3000, UNSIGNED_LEVEL), 21);
        let field = FieldLayout::new(0, 8, 0, 255);
        assert_eq!(level_value(&field, 1000, UNSIGNED_LEVEL), 25);
    }

    #[test]
    fn test_unsigned_level_clamps_negative_to_zero() {
        let field = FieldLayout::new(0, 8, -128, 127);
        assert_eq!(unsigned_level_value(&field, -11_000, UNSIGNED_LEVEL), 0);
        assert_eq!(
            unsigned_level_value(&field, 11_000, UNSIGNED_LEVEL),
            unsigned_level_value(&field, 10_000, UNSIGNED_LEVEL)
        );
        assert_eq!(unsigned_level_value(&field, 10_000, UNSIGNED_LEVEL), 127);
    }

    #[test]
    fn test_time_value_default_milliseconds() {
        let field = FieldLayout::new(0, 16, 0, 0x7FFF);
        assert_eq!(time_value(&field, 2_000), 2);
        let field = field.with_unit_exponent(-6);
        assert_eq!(time_value(&field, 2_000), 2_000);
    }

    #[test]
    fn test_trigger_button_must_fit_logical_range() {
        let field = FieldLayout::new(0, 8, 1, 8);
        assert!(check_trigger_button(&field, 1).is_ok());
        assert!(check_trigger_button(&field, 8).is_ok());
        assert!(matches!(
            check_trigger_button(&field, 0),
            Err(PidError::InvalidParameter(_))
        ));
        assert!(matches!(
            check_trigger_button(&field, 255),
            Err(PidError::InvalidParameter(_))
        ));
    }
}
