//! `pidffctl decode`: decode an inbound report against a capability table.

use std::path::Path;

use anyhow::Result;
use pidff_common::decode::{BlockLoadStatus, InputReport, decode_block_load, decode_input};
use serde::Serialize;
use tracing::warn;

use crate::error::CliError;
use crate::files::{load_capabilities, parse_hex};
use crate::output;

#[derive(Debug, Serialize)]
#[serde(tag = "report", rename_all = "snake_case")]
pub enum Decoded {
    DeviceState {
        paused: Option<bool>,
        actuators_enabled: Option<bool>,
        safety_switch: Option<bool>,
        override_switch: Option<bool>,
        actuator_power: Option<bool>,
        effect_playing: Option<bool>,
        block_index: Option<u8>,
        flags: Vec<String>,
    },
    BlockLoad {
        block_index: u8,
        status: String,
        pool_available: Option<u32>,
    },
    Unknown {
        report_id: u8,
    },
}

pub fn execute(caps_path: &Path, hex: &str, json: bool) -> Result<()> {
    let caps = load_capabilities(caps_path)?;
    let bytes = parse_hex(hex)?;

    let block_load_id = caps.pool.as_ref().map(|pool| pool.block_load.report_id);
    let decoded = if bytes.first().copied() == block_load_id {
        let load = decode_block_load(&caps, &bytes).map_err(CliError::from)?;
        Decoded::BlockLoad {
            block_index: load.block_index,
            status: match load.status {
                BlockLoadStatus::Success => "success",
                BlockLoadStatus::Full => "full",
                BlockLoadStatus::Error => "error",
            }
            .to_string(),
            pool_available: load.pool_available,
        }
    } else {
        match decode_input(&caps, &bytes) {
            InputReport::DeviceState(state) => Decoded::DeviceState {
                paused: state.paused,
                actuators_enabled: state.actuators_enabled,
                safety_switch: state.safety_switch,
                override_switch: state.override_switch,
                actuator_power: state.actuator_power,
                effect_playing: state.effect_playing,
                block_index: state.block_index,
                flags: state
                    .flags()
                    .iter_names()
                    .map(|(name, _)| name.to_string())
                    .collect(),
            },
            InputReport::Unknown { report_id } => {
                warn!("{} has no input report {:#04x}", caps.name, report_id);
                Decoded::Unknown { report_id }
            }
        }
    };

    output::print_decoded(&decoded, json);
    Ok(())
}
