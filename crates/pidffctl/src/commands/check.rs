//! `pidffctl check`: load and validate a capability table.

use std::path::Path;

use anyhow::Result;
use pidff_common::caps::PoolMode;
use pidff_engine::PidDevice;
use pidff_engine::effect::group_names;
use pidff_engine::transport::mock::MockTransport;
use serde::Serialize;
use tracing::info;

use crate::files::load_capabilities;
use crate::output;

#[derive(Debug, Serialize)]
pub struct EffectSummary {
    pub kind: String,
    pub groups: String,
}

#[derive(Debug, Serialize)]
pub struct CheckSummary {
    pub name: String,
    pub axes: usize,
    pub actuators: usize,
    pub pool_mode: String,
    pub max_effects: u8,
    pub gain: bool,
    pub autocenter: bool,
    pub effects: Vec<EffectSummary>,
}

pub fn execute(caps_path: &Path, json: bool) -> Result<()> {
    let caps = load_capabilities(caps_path)?;
    info!("Loaded capability table for {}", caps.name);

    let device = PidDevice::new(caps, MockTransport::new())?;
    let caps = device.caps();
    let summary = CheckSummary {
        name: caps.name.clone(),
        axes: caps.axes.len(),
        actuators: caps.actuator_count(),
        pool_mode: match caps.pool_mode {
            PoolMode::HostManaged => "host_managed",
            PoolMode::DeviceManaged => "device_managed",
        }
        .to_string(),
        max_effects: caps.max_effects,
        gain: caps.supports_gain(),
        autocenter: caps.supports_autocenter(),
        effects: device
            .supported_effects()
            .into_iter()
            .map(|info| EffectSummary {
                kind: info.kind.name().to_string(),
                groups: group_names(info.groups),
            })
            .collect(),
    };

    output::print_check(&summary, json);
    Ok(())
}
