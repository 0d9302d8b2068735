//! Last known device and effect status.
//!
//! Guarded by its own lock so inbound decoding never waits on a caller's
//! report writes, and the other way round.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use pidff_common::caps::DeviceCapabilities;
use pidff_common::decode::{DeviceStateReport, InputReport, decode_input};
use pidff_common::status::{EffectStatus, ForceFeedbackState};
use pidff_errors::{PidError, Result};
use tracing::{trace, warn};

use crate::pool::EffectHandle;

/// Lifecycle state of one effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectState {
    Created,
    Downloaded,
    Playing,
    Paused,
    Stopped,
}

impl EffectState {
    /// Whether the device holds a copy of the effect.
    pub fn is_loaded(self) -> bool {
        !matches!(self, EffectState::Created)
    }
}

#[derive(Debug, Default)]
struct StatusInner {
    /// Device-wide flags from the last Device State report
    device: ForceFeedbackState,
    paused: bool,
    actuators: Option<bool>,
    device_lost: bool,
    effects: HashMap<EffectHandle, EffectState>,
    by_index: HashMap<u8, EffectHandle>,
}

/// Shared status cache of one device session.
#[derive(Debug, Clone, Default)]
pub struct StatusCache {
    inner: Arc<RwLock<StatusInner>>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, handle: EffectHandle) {
        self.inner.write().effects.insert(handle, EffectState::Created);
    }

    pub fn remove(&self, handle: EffectHandle) {
        let mut inner = self.inner.write();
        inner.effects.remove(&handle);
        inner.by_index.retain(|_, h| *h != handle);
    }

    pub fn state(&self, handle: EffectHandle) -> Option<EffectState> {
        self.inner.read().effects.get(&handle).copied()
    }

    pub fn set_state(&self, handle: EffectHandle, state: EffectState) {
        if let Some(slot) = self.inner.write().effects.get_mut(&handle) {
            *slot = state;
        }
    }

    /// Mark the effect loaded at wire `index`.
    pub fn loaded(&self, handle: EffectHandle, index: u8) {
        let mut inner = self.inner.write();
        if let Some(slot) = inner.effects.get_mut(&handle) {
            if *slot == EffectState::Created {
                *slot = EffectState::Downloaded;
            }
        }
        inner.by_index.insert(index, handle);
    }

    /// Mark the effect back to `Created` and forget its wire index.
    pub fn unloaded(&self, handle: EffectHandle) {
        let mut inner = self.inner.write();
        if let Some(slot) = inner.effects.get_mut(&handle) {
            *slot = EffectState::Created;
        }
        inner.by_index.retain(|_, h| *h != handle);
    }

    /// Apply `f` to every loaded effect's state.
    pub fn update_loaded(&self, f: impl Fn(EffectState) -> EffectState) {
        let mut inner = self.inner.write();
        for state in inner.effects.values_mut().filter(|s| s.is_loaded()) {
            *state = f(*state);
        }
    }

    /// Playing and stopped effects other than `except` become stopped.
    pub fn stop_others(&self, except: EffectHandle) {
        let mut inner = self.inner.write();
        for (handle, state) in inner.effects.iter_mut() {
            if *handle != except && matches!(state, EffectState::Playing | EffectState::Paused) {
                *state = EffectState::Stopped;
            }
        }
    }

    pub fn set_paused(&self, paused: bool) {
        self.inner.write().paused = paused;
    }

    pub fn set_actuators(&self, enabled: bool) {
        self.inner.write().actuators = Some(enabled);
    }

    pub fn mark_device_lost(&self) {
        self.inner.write().device_lost = true;
    }

    /// Reset session flags; effect entries are kept.
    pub fn reset_session(&self) {
        let mut inner = self.inner.write();
        inner.paused = false;
        inner.actuators = None;
        inner.device = ForceFeedbackState::empty();
    }

    /// Per-effect status bits. Fails when the effect was never downloaded.
    pub fn effect_status(&self, handle: EffectHandle) -> Result<EffectStatus> {
        match self.state(handle) {
            None => Err(PidError::EffectNotFound(handle.get())),
            Some(EffectState::Created) => Err(PidError::NotDownloaded),
            Some(EffectState::Playing) => Ok(EffectStatus::PLAYING),
            Some(_) => Ok(EffectStatus::empty()),
        }
    }

    /// Device flags combined with what the session knows.
    pub fn device_state(&self) -> ForceFeedbackState {
        use ForceFeedbackState as S;

        let inner = self.inner.read();
        let mut state = inner.device;
        if inner.effects.is_empty() {
            state |= S::EMPTY;
        }
        if !inner.effects.values().any(|s| *s == EffectState::Playing) {
            state |= S::STOPPED;
        }
        if inner.paused {
            state |= S::PAUSED;
        }
        if let Some(on) = inner.actuators {
            state.remove(S::ACTUATORS_ON | S::ACTUATORS_OFF);
            state |= S::pair(on, S::ACTUATORS_ON, S::ACTUATORS_OFF);
        }
        if inner.device_lost {
            state |= S::DEVICE_LOST;
        }
        state
    }

    /// Fold one Device State report into the cache.
    ///
    /// A report naming a block no live effect holds is dropped whole.
    fn apply_device_state(&self, state: &DeviceStateReport) {
        let mut inner = self.inner.write();
        if let Some(index) = state.block_index {
            let Some(handle) = inner.by_index.get(&index).copied() else {
                warn!("Ignoring status for unknown effect block {}", index);
                return;
            };
            if let (Some(playing), Some(slot)) =
                (state.effect_playing, inner.effects.get_mut(&handle))
            {
                *slot = if playing {
                    EffectState::Playing
                } else {
                    EffectState::Stopped
                };
                trace!("Effect {} at block {} now {:?}", handle, index, slot);
            }
        }

        inner.device = state.device_flags();
        if let Some(paused) = state.paused {
            inner.paused = paused;
        }
        if let Some(on) = state.actuators_enabled {
            inner.actuators = Some(on);
        }
    }
}

/// Feeds inbound reports into a session's status cache.
///
/// Cheap to clone and safe to move to a reader thread.
#[derive(Debug, Clone)]
pub struct StatusSink {
    caps: Arc<DeviceCapabilities>,
    cache: StatusCache,
}

impl StatusSink {
    pub(crate) fn new(caps: Arc<DeviceCapabilities>, cache: StatusCache) -> Self {
        Self { caps, cache }
    }

    /// Decode one input report (report id at byte 0) and update the cache.
    ///
    /// Unknown reports, and reports naming a block no live effect holds,
    /// are logged and dropped without touching the device flags.
    pub fn handle_input(&self, bytes: &[u8]) -> InputReport {
        let report = decode_input(&self.caps, bytes);
        match &report {
            InputReport::DeviceState(state) => self.cache.apply_device_state(state),
            InputReport::Unknown { report_id } => {
                warn!("Ignoring input report with unknown id {:#04x}", report_id);
            }
        }
        report
    }
}
