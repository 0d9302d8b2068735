//! Decoding of inbound reports: Block Load replies and PID State input.

use pidff_errors::{PidError, Result, TransportError};

use crate::caps::{DeviceCapabilities, DeviceStateLayout, FieldLayout};
use crate::report::ReportReader;
use crate::status::ForceFeedbackState;

/// Outcome of a Create New Effect request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockLoadStatus {
    Success,
    Full,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLoad {
    pub block_index: u8,
    pub status: BlockLoadStatus,
    pub pool_available: Option<u32>,
}

/// Decode a Block Load feature reply (report id at byte 0).
pub fn decode_block_load(caps: &DeviceCapabilities, bytes: &[u8]) -> Result<BlockLoad> {
    let layout = &caps
        .pool
        .as_ref()
        .ok_or_else(|| PidError::usage_not_found("block load"))?
        .block_load;
    let reader = ReportReader::new(bytes);
    let short = || {
        PidError::Transport(TransportError::ShortReport {
            report_id: layout.report_id,
            expected: layout.len.saturating_add(1),
            actual: bytes.len(),
        })
    };

    match reader.report_id() {
        Some(id) if id == layout.report_id => {}
        Some(id) => {
            return Err(PidError::Transport(TransportError::read(
                layout.report_id,
                format!("unexpected report id {id:#04x} in block load reply"),
            )));
        }
        None => return Err(short()),
    }

    let block_index = reader.get(&layout.block_index).ok_or_else(short)?;
    let status = reader.get_raw(&layout.status).ok_or_else(short)?;
    let status = if status == layout.statuses.success {
        BlockLoadStatus::Success
    } else if status == layout.statuses.full {
        BlockLoadStatus::Full
    } else {
        BlockLoadStatus::Error
    };
    let pool_available = layout
        .pool_available
        .as_ref()
        .and_then(|field| reader.get_raw(field));

    Ok(BlockLoad {
        block_index: u8::try_from(block_index).unwrap_or(0),
        status,
        pool_available,
    })
}

/// Decoded PID State input report. Absent fields are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceStateReport {
    pub paused: Option<bool>,
    pub actuators_enabled: Option<bool>,
    pub safety_switch: Option<bool>,
    pub override_switch: Option<bool>,
    pub actuator_power: Option<bool>,
    pub effect_playing: Option<bool>,
    pub block_index: Option<u8>,
}

impl DeviceStateReport {
    fn decode(layout: &DeviceStateLayout, reader: &ReportReader<'_>) -> Self {
        let flag = |field: &Option<FieldLayout>| field.as_ref().and_then(|f| reader.get_flag(f));
        Self {
            paused: flag(&layout.paused),
            actuators_enabled: flag(&layout.actuators_enabled),
            safety_switch: flag(&layout.safety_switch),
            override_switch: flag(&layout.override_switch),
            actuator_power: flag(&layout.actuator_power),
            effect_playing: flag(&layout.effect_playing),
            block_index: layout
                .block_index
                .as_ref()
                .and_then(|f| reader.get(f))
                .and_then(|index| u8::try_from(index).ok()),
        }
    }

    /// Flags carried by this report, `STOPPED` included when the reported
    /// block is not playing. `EMPTY` is never set here.
    pub fn flags(&self) -> ForceFeedbackState {
        let mut state = self.device_flags();
        if self.effect_playing == Some(false) {
            state |= ForceFeedbackState::STOPPED;
        }
        state
    }

    /// Device-wide flags only. The playing bit belongs to `block_index`
    /// and is left out.
    pub fn device_flags(&self) -> ForceFeedbackState {
        use ForceFeedbackState as S;

        let mut state = S::empty();
        if self.paused == Some(true) {
            state |= S::PAUSED;
        }
        if let Some(on) = self.actuators_enabled {
            state |= S::pair(on, S::ACTUATORS_ON, S::ACTUATORS_OFF);
        }
        if let Some(on) = self.actuator_power {
            state |= S::pair(on, S::POWER_ON, S::POWER_OFF);
        }
        if let Some(on) = self.safety_switch {
            state |= S::pair(on, S::SAFETY_SWITCH_ON, S::SAFETY_SWITCH_OFF);
        }
        if let Some(on) = self.override_switch {
            state |= S::pair(on, S::USER_FF_SWITCH_ON, S::USER_FF_SWITCH_OFF);
        }
        state
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputReport {
    DeviceState(DeviceStateReport),
    /// Report id the device state layout does not describe
    Unknown { report_id: u8 },
}

/// Decode an input report. Never fails: unknown reports are returned as such.
pub fn decode_input(caps: &DeviceCapabilities, bytes: &[u8]) -> InputReport {
    let reader = ReportReader::new(bytes);
    let report_id = reader.report_id().unwrap_or(0);
    match &caps.device_state {
        Some(layout) if layout.report_id == report_id => {
            InputReport::DeviceState(DeviceStateReport::decode(layout, &reader))
        }
        _ => InputReport::Unknown { report_id },
    }
}
