//! Command implementations for pidffctl

pub mod check;
pub mod decode;
pub mod download;

use pidff_common::caps::DeviceCapabilities;

/// Human name of a report id in this device's table.
pub fn report_name(caps: &DeviceCapabilities, report_id: u8) -> &'static str {
    let mut names: Vec<(u8, &'static str)> = vec![
        (caps.set_effect.report_id, "Set Effect"),
        (caps.effect_control.report_id, "Effect Operation"),
    ];
    if let Some(layout) = &caps.periodic {
        names.push((layout.report_id, "Set Periodic"));
    }
    if let Some(layout) = &caps.envelope {
        names.push((layout.report_id, "Set Envelope"));
    }
    if let Some(layout) = &caps.condition {
        names.push((layout.report_id, "Set Condition"));
    }
    if let Some(layout) = &caps.constant_force {
        names.push((layout.report_id, "Set Constant Force"));
    }
    if let Some(layout) = &caps.ramp_force {
        names.push((layout.report_id, "Set Ramp Force"));
    }
    if let Some(layout) = &caps.device_control {
        names.push((layout.report_id, "Device Control"));
    }
    if let Some(layout) = &caps.device_gain {
        names.push((layout.report_id, "Device Gain"));
    }
    if let Some(layout) = &caps.device_state {
        names.push((layout.report_id, "PID State"));
    }
    if let Some(pool) = &caps.pool {
        names.push((pool.create_new_effect.report_id, "Create New Effect"));
        names.push((pool.block_load.report_id, "Block Load"));
        names.push((pool.block_free.report_id, "Block Free"));
    }
    names
        .into_iter()
        .find(|(id, _)| *id == report_id)
        .map_or("Unknown", |(_, name)| name)
}
