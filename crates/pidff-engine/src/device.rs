//! Device session: acquisition, device-level reports and effect lifecycle.
//!
//! Every operation takes the session lock for its whole encode-and-write
//! sequence and releases it before returning. Inbound status goes through
//! [`StatusSink`] and only touches the status cache.
//!
//! Lock order is session, then status. The status lock is never held while
//! writing to the transport.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use pidff_common::caps::{AutocenterSupport, DeviceCapabilities, DeviceCommand, PoolMode};
use pidff_common::decode::{BlockLoadStatus, decode_block_load};
use pidff_common::direction::{DirectionRead, DirectionRepr};
use pidff_common::encode::{EffectOperation, ReportEncoder, check_trigger_button};
use pidff_common::params::{EffectKind, NOMINAL_MAX, ParamGroups, ParameterDelta, TriggerButton};
use pidff_common::report::Report;
use pidff_common::status::{EffectStatus, ForceFeedbackState};
use pidff_errors::{Outcome, PidError, Result, TransportError};
use tracing::{debug, info, warn};

use crate::effect::{Effect, group_names};
use crate::pool::{EffectHandle, HandleAllocator};
use crate::status::{EffectState, StatusCache, StatusSink};
use crate::transport::PidTransport;

/// Default device gain: full scale.
pub const DEFAULT_GAIN: u32 = NOMINAL_MAX.unsigned_abs();

/// How a session holds the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Reports are written; effects can be downloaded and played
    Exclusive,
    /// Read-only: nothing is written to the device
    Shared,
}

/// Flags of [`PidDevice::set_parameters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SetFlags {
    /// Buffer the change without touching the device
    pub no_download: bool,
    /// Start the effect once the change is on the device
    pub start: bool,
}

/// Flags of [`PidDevice::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StartFlags {
    /// Stop every other effect
    pub solo: bool,
    /// Fail instead of downloading an effect the device does not have
    pub no_download: bool,
}

/// An effect kind the device can play, and the groups it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectInfo {
    pub kind: EffectKind,
    pub groups: ParamGroups,
}

struct Session<T> {
    transport: T,
    effects: BTreeMap<EffectHandle, Effect>,
    allocator: HandleAllocator,
    access: Option<AccessMode>,
    gain: u32,
    autocenter: bool,
}

impl<T> Session<T> {
    fn require_exclusive(&self) -> Result<()> {
        match self.access {
            Some(AccessMode::Exclusive) => Ok(()),
            _ => Err(PidError::NotExclusivelyAcquired),
        }
    }

    fn is_exclusive(&self) -> bool {
        self.access == Some(AccessMode::Exclusive)
    }

    fn effect(&self, handle: EffectHandle) -> Result<&Effect> {
        self.effects
            .get(&handle)
            .ok_or(PidError::EffectNotFound(handle.get()))
    }
}

/// One PID device and its effects.
pub struct PidDevice<T> {
    caps: Arc<DeviceCapabilities>,
    session: Mutex<Session<T>>,
    status: StatusCache,
}

impl<T: PidTransport> PidDevice<T> {
    /// Open a session over `transport`. The capability table is validated.
    pub fn new(caps: DeviceCapabilities, transport: T) -> Result<Self> {
        caps.validate()?;
        let allocator = HandleAllocator::new(caps.pool_mode, caps.max_effects);
        Ok(Self {
            caps: Arc::new(caps),
            session: Mutex::new(Session {
                transport,
                effects: BTreeMap::new(),
                allocator,
                access: None,
                gain: DEFAULT_GAIN,
                autocenter: true,
            }),
            status: StatusCache::new(),
        })
    }

    pub fn caps(&self) -> &DeviceCapabilities {
        &self.caps
    }

    /// Handle for feeding input reports from a reader thread.
    pub fn status_sink(&self) -> StatusSink {
        StatusSink::new(Arc::clone(&self.caps), self.status.clone())
    }

    pub fn access_mode(&self) -> Option<AccessMode> {
        self.session.lock().access
    }

    pub fn gain(&self) -> u32 {
        self.session.lock().gain
    }

    pub fn autocenter(&self) -> bool {
        self.session.lock().autocenter
    }

    fn encoder(&self) -> ReportEncoder<'_> {
        ReportEncoder::new(&self.caps)
    }

    fn transport_error(&self, err: TransportError) -> PidError {
        if err == TransportError::Disconnected {
            warn!("Device {} disconnected", self.caps.name);
            self.status.mark_device_lost();
        }
        PidError::Transport(err)
    }

    fn send(&self, transport: &mut T, report: &Report) -> Result<()> {
        transport.send(report).map_err(|e| self.transport_error(e))?;
        debug!(
            "Wrote report {:#04x} ({} bytes): {}",
            report.report_id(),
            report.len(),
            report.to_hex()
        );
        Ok(())
    }

    fn wire_index(&self, effect: &Effect) -> Result<u8> {
        match self.caps.pool_mode {
            PoolMode::HostManaged => HandleAllocator::host_index(effect.handle()),
            PoolMode::DeviceManaged => effect.block_index().ok_or(PidError::NotDownloaded),
        }
    }

    // ---------------------------------------------------------------------
    // Session
    // ---------------------------------------------------------------------

    /// Open a session. An exclusive session resets the device and sends the
    /// stored gain and autocenter settings.
    ///
    /// Acquiring again in the same mode is a no-op; switching modes
    /// releases first.
    pub fn acquire(&self, mode: AccessMode) -> Result<Outcome> {
        let mut session = self.session.lock();
        if session.access == Some(mode) {
            return Ok(Outcome::NoEffect);
        }
        if session.access.is_some() {
            self.release_locked(&mut session)?;
        }

        if mode == AccessMode::Exclusive {
            self.status.reset_session();
            let reports = self.acquire_reports(&session)?;
            for report in &reports {
                if let Err(e) = self.send(&mut session.transport, report) {
                    warn!("Acquire of {} failed: {}", self.caps.name, e);
                    return Err(e);
                }
            }
        }

        session.access = Some(mode);
        info!("Acquired {} ({:?})", self.caps.name, mode);
        Ok(Outcome::Done)
    }

    fn acquire_reports(&self, session: &Session<T>) -> Result<Vec<Report>> {
        let encoder = self.encoder();
        let reset = encoder.device_control(DeviceCommand::Reset).ok();
        let gain = if self.caps.supports_gain() {
            Some(encoder.device_gain(session.gain)?)
        } else {
            None
        };
        let autocenter = match self.caps.autocenter {
            AutocenterSupport::PerAcquire(_) => encoder.autocenter(session.autocenter)?,
            _ => None,
        };

        let order = if self.caps.quirks.autocenter_before_reset {
            [autocenter, reset, gain]
        } else {
            [reset, gain, autocenter]
        };
        Ok(order.into_iter().flatten().collect())
    }

    /// Close the session. Downloaded effects are stopped, the device is
    /// reset and every effect returns to `Created` with its parameters kept.
    pub fn release(&self) -> Result<Outcome> {
        let mut session = self.session.lock();
        match session.access {
            None => Ok(Outcome::NoEffect),
            Some(_) => self.release_locked(&mut session),
        }
    }

    fn release_locked(&self, session: &mut Session<T>) -> Result<Outcome> {
        let mut first_error = None;

        if session.is_exclusive() {
            let encoder = self.encoder();
            let Session {
                transport, effects, ..
            } = &mut *session;
            for effect in effects.values().filter(|e| e.has_device_copy()) {
                let Ok(index) = self.wire_index(effect) else {
                    continue;
                };
                let stop = encoder.effect_control(index, EffectOperation::Stop, 0);
                if let Err(e) = self.send(transport, &stop) {
                    first_error.get_or_insert(e);
                }
            }
            if let Ok(reset) = encoder.device_control(DeviceCommand::Reset) {
                if let Err(e) = self.send(transport, &reset) {
                    first_error.get_or_insert(e);
                }
            }
        }

        for effect in session.effects.values_mut() {
            effect.mark_unloaded();
            self.status.unloaded(effect.handle());
        }
        session.access = None;
        self.status.reset_session();
        info!("Released {}", self.caps.name);

        match first_error {
            Some(e) => Err(e),
            None => Ok(Outcome::Done),
        }
    }

    /// Store the device gain (`0..=10000`) and send it when acquired.
    pub fn set_gain(&self, gain: u32) -> Result<Outcome> {
        if gain > DEFAULT_GAIN {
            return Err(PidError::invalid_parameter(format!(
                "device gain {gain} exceeds {DEFAULT_GAIN}"
            )));
        }
        if !self.caps.supports_gain() {
            return Err(PidError::usage_not_found("device gain"));
        }
        let mut session = self.session.lock();
        session.gain = gain;
        if session.is_exclusive() {
            let report = self.encoder().device_gain(gain)?;
            self.send(&mut session.transport, &report)?;
        }
        Ok(Outcome::Done)
    }

    /// Store the autocenter setting and send it when acquired.
    pub fn set_autocenter(&self, enabled: bool) -> Result<Outcome> {
        if !self.caps.supports_autocenter() {
            return Err(PidError::usage_not_found("autocenter"));
        }
        let mut session = self.session.lock();
        session.autocenter = enabled;
        if session.is_exclusive() {
            if let Some(report) = self.encoder().autocenter(enabled)? {
                self.send(&mut session.transport, &report)?;
            }
        }
        Ok(Outcome::Done)
    }

    /// Send a Device Control command and mirror its effect in the cache.
    pub fn send_command(&self, command: DeviceCommand) -> Result<Outcome> {
        let mut session = self.session.lock();
        session.require_exclusive()?;
        let report = self.encoder().device_control(command)?;
        self.send(&mut session.transport, &report)?;
        info!("Sent {} to {}", command.name(), self.caps.name);

        match command {
            DeviceCommand::Reset => {
                for effect in session.effects.values_mut() {
                    effect.mark_unloaded();
                    self.status.unloaded(effect.handle());
                }
                self.status.set_paused(false);
            }
            DeviceCommand::StopAll => self.status.update_loaded(|state| match state {
                EffectState::Playing | EffectState::Paused => EffectState::Stopped,
                other => other,
            }),
            DeviceCommand::Pause => {
                self.status.set_paused(true);
                self.status.update_loaded(|state| match state {
                    EffectState::Playing => EffectState::Paused,
                    other => other,
                });
            }
            DeviceCommand::Continue => {
                self.status.set_paused(false);
                self.status.update_loaded(|state| match state {
                    EffectState::Paused => EffectState::Playing,
                    other => other,
                });
            }
            DeviceCommand::ActuatorsOn => self.status.set_actuators(true),
            DeviceCommand::ActuatorsOff => self.status.set_actuators(false),
        }
        Ok(Outcome::Done)
    }

    /// Last known device state. Needs an exclusive session.
    pub fn get_device_state(&self) -> Result<ForceFeedbackState> {
        self.session.lock().require_exclusive()?;
        Ok(self.status.device_state())
    }

    // ---------------------------------------------------------------------
    // Effects
    // ---------------------------------------------------------------------

    /// Kinds this device can encode, with the parameter groups each accepts.
    pub fn supported_effects(&self) -> Vec<EffectInfo> {
        EffectKind::ALL
            .into_iter()
            .filter(|kind| self.caps.supports_kind(*kind))
            .map(|kind| EffectInfo {
                kind,
                groups: self.supported_groups(kind),
            })
            .collect()
    }

    fn supported_groups(&self, kind: EffectKind) -> ParamGroups {
        let layout = &self.caps.set_effect;
        let mut groups = ParamGroups::AXES | ParamGroups::TYPE_SPECIFIC;
        groups.set(ParamGroups::DURATION, layout.duration.is_some());
        groups.set(ParamGroups::SAMPLE_PERIOD, layout.sample_period.is_some());
        groups.set(ParamGroups::GAIN, layout.gain.is_some());
        groups.set(ParamGroups::TRIGGER_BUTTON, layout.trigger_button.is_some());
        groups.set(
            ParamGroups::TRIGGER_REPEAT_INTERVAL,
            layout.trigger_repeat_interval.is_some(),
        );
        groups.set(ParamGroups::START_DELAY, layout.start_delay.is_some());
        groups.set(ParamGroups::DIRECTION, !layout.direction.is_empty());
        groups.set(
            ParamGroups::ENVELOPE,
            kind.supports_envelope() && self.caps.envelope.is_some(),
        );
        groups
    }

    /// Create an effect of `kind`, optionally with initial parameters.
    ///
    /// Nothing is written: the effect is downloaded on `download` or `start`.
    pub fn create_effect(
        &self,
        kind: EffectKind,
        initial: Option<&ParameterDelta>,
    ) -> Result<EffectHandle> {
        if !self.caps.supports_kind(kind) {
            return Err(PidError::DeviceNotRegistered(kind.name().to_string()));
        }
        let mut session = self.session.lock();
        let handle = session.allocator.allocate()?;
        let mut effect = Effect::new(handle, kind);
        if let Some(delta) = initial {
            let applied = self.check_delta(delta).and_then(|()| effect.apply(delta));
            if let Err(e) = applied {
                session.allocator.release(handle);
                return Err(e);
            }
        }
        session.effects.insert(handle, effect);
        self.status.insert(handle);
        debug!("Created {} effect {}", kind, handle);
        Ok(handle)
    }

    /// Unload (when on the device) and forget an effect.
    pub fn destroy_effect(&self, handle: EffectHandle) -> Result<()> {
        let mut session = self.session.lock();
        let has_copy = session.effect(handle)?.has_device_copy();
        if has_copy && session.is_exclusive() {
            self.unload_locked(&mut session, handle)?;
        }
        session.effects.remove(&handle);
        session.allocator.release(handle);
        self.status.remove(handle);
        debug!("Destroyed effect {}", handle);
        Ok(())
    }

    /// Handles of every live effect, in creation-slot order.
    pub fn enumerate_created_effects(&self) -> Vec<EffectHandle> {
        self.session.lock().effects.keys().copied().collect()
    }

    pub fn effect_kind(&self, handle: EffectHandle) -> Result<EffectKind> {
        Ok(self.session.lock().effect(handle)?.kind())
    }

    /// Current values of the requested groups. Direction reads back as
    /// Cartesian; use [`Self::get_direction`] for other representations.
    pub fn get_parameters(&self, handle: EffectHandle, groups: ParamGroups) -> Result<ParameterDelta> {
        let session = self.session.lock();
        Ok(session.effect(handle)?.parameters().to_delta(groups))
    }

    /// Direction in `repr`, written into `out`.
    ///
    /// A short buffer is filled as far as it goes and the true axis count
    /// is returned with [`pidff_errors::ReadStatus::MoreData`].
    pub fn get_direction(
        &self,
        handle: EffectHandle,
        repr: DirectionRepr,
        out: &mut [i32],
    ) -> Result<DirectionRead> {
        let session = self.session.lock();
        session.effect(handle)?.parameters().direction.to_repr(repr, out)
    }

    /// Checks that need the capability table: actuator axes and the
    /// trigger button range.
    fn check_delta(&self, delta: &ParameterDelta) -> Result<()> {
        for &axis in delta.axes.iter().flatten() {
            if !self.caps.axis(axis).is_some_and(|a| a.is_actuator()) {
                return Err(PidError::invalid_parameter(format!(
                    "axis {axis} has no force feedback actuator"
                )));
            }
        }
        if let (Some(TriggerButton::Button(button)), Some(field)) =
            (delta.trigger_button, &self.caps.set_effect.trigger_button)
        {
            check_trigger_button(field, button)?;
        }
        Ok(())
    }

    /// Merge `delta` into the effect.
    ///
    /// An effect already on the device is updated right away unless
    /// `no_download` is set. Returns `Skipped` when the change was only
    /// buffered.
    pub fn set_parameters(
        &self,
        handle: EffectHandle,
        delta: &ParameterDelta,
        flags: SetFlags,
    ) -> Result<Outcome> {
        self.check_delta(delta)?;
        let mut session = self.session.lock();
        let effect = session
            .effects
            .get_mut(&handle)
            .ok_or(PidError::EffectNotFound(handle.get()))?;
        let groups = effect.apply(delta)?;
        let downloaded = effect.is_downloaded();
        debug!("Set {} on effect {}", group_names(groups), handle);

        if flags.no_download {
            return Ok(Outcome::Skipped);
        }
        if downloaded {
            match self.download_locked(&mut session, handle) {
                Ok(_) => {}
                Err(PidError::NotExclusivelyAcquired) => return Ok(Outcome::Skipped),
                Err(e) => return Err(e),
            }
        } else if !flags.start {
            return Ok(Outcome::Skipped);
        }

        if flags.start {
            self.start_locked(&mut session, handle, 1, StartFlags::default())?;
        }
        Ok(Outcome::Done)
    }

    /// Bring the device copy in line with the effect's parameters.
    pub fn download(&self, handle: EffectHandle) -> Result<Outcome> {
        let mut session = self.session.lock();
        self.download_locked(&mut session, handle)
    }

    fn download_locked(&self, session: &mut Session<T>, handle: EffectHandle) -> Result<Outcome> {
        session.require_exclusive()?;
        let encoder = self.encoder();
        let Session {
            transport, effects, ..
        } = session;
        let effect = effects
            .get_mut(&handle)
            .ok_or(PidError::EffectNotFound(handle.get()))?;

        let missing = effect.missing_groups();
        if !missing.is_empty() {
            return Err(PidError::incomplete(group_names(missing)));
        }

        let index = match (self.caps.pool_mode, effect.block_index()) {
            (PoolMode::HostManaged, _) => HandleAllocator::host_index(handle)?,
            (PoolMode::DeviceManaged, Some(index)) => index,
            (PoolMode::DeviceManaged, None) => {
                let index = self.allocate_block(transport, &encoder, effect.kind())?;
                effect.set_block_index(index);
                index
            }
        };

        let plan = effect.plan(&encoder, index)?;
        if plan.is_empty() && effect.is_downloaded() {
            return Ok(Outcome::NoEffect);
        }
        debug!(
            "Downloading effect {} to block {}: {} report(s)",
            handle,
            index,
            plan.report_count()
        );

        let mut applied = plan.clean;
        for emission in &plan.emissions {
            for report in &emission.reports {
                if let Err(e) = self.send(transport, report) {
                    effect.mark_applied(applied);
                    warn!(
                        "Download of effect {} stopped after {}: {}",
                        handle,
                        group_names(applied),
                        e
                    );
                    return Err(e);
                }
            }
            applied |= emission.groups;
        }

        effect.mark_downloaded();
        self.status.loaded(handle, index);
        Ok(Outcome::Done)
    }

    fn allocate_block(
        &self,
        transport: &mut T,
        encoder: &ReportEncoder<'_>,
        kind: EffectKind,
    ) -> Result<u8> {
        let create = encoder.create_new_effect(kind)?;
        self.send(transport, &create)?;

        let (report_id, len) = encoder.block_load_request()?;
        let mut buf = vec![0u8; len];
        if let Some(first) = buf.first_mut() {
            *first = report_id;
        }
        let read = transport
            .get_feature(report_id, &mut buf)
            .map_err(|e| self.transport_error(e))?;
        buf.truncate(read);

        let load = decode_block_load(&self.caps, &buf)?;
        match load.status {
            BlockLoadStatus::Success => {
                debug!(
                    "Device assigned block {} for {} ({:?} free)",
                    load.block_index, kind, load.pool_available
                );
                Ok(load.block_index)
            }
            BlockLoadStatus::Full => {
                warn!("Device pool full while creating {}", kind);
                Err(PidError::DeviceFull)
            }
            BlockLoadStatus::Error => {
                warn!("Device refused a block for {}", kind);
                Err(PidError::Transport(TransportError::read(
                    report_id,
                    "block load reported an error",
                )))
            }
        }
    }

    /// Stop the effect and drop the device copy. Parameters are kept.
    pub fn unload(&self, handle: EffectHandle) -> Result<Outcome> {
        let mut session = self.session.lock();
        if !session.effect(handle)?.has_device_copy() {
            return Ok(Outcome::NoEffect);
        }
        session.require_exclusive()?;
        self.unload_locked(&mut session, handle)
    }

    fn unload_locked(&self, session: &mut Session<T>, handle: EffectHandle) -> Result<Outcome> {
        let encoder = self.encoder();
        let Session {
            transport, effects, ..
        } = session;
        let effect = effects
            .get_mut(&handle)
            .ok_or(PidError::EffectNotFound(handle.get()))?;

        if let Ok(index) = self.wire_index(effect) {
            self.send(transport, &encoder.effect_control(index, EffectOperation::Stop, 0))?;
            if self.caps.pool_mode == PoolMode::DeviceManaged {
                self.send(transport, &encoder.block_free(index)?)?;
            }
        }
        effect.mark_unloaded();
        self.status.unloaded(handle);
        debug!("Unloaded effect {}", handle);
        Ok(Outcome::Done)
    }

    /// Start the effect for `iterations` runs (`u32::MAX` loops forever).
    pub fn start(&self, handle: EffectHandle, iterations: u32, flags: StartFlags) -> Result<Outcome> {
        let mut session = self.session.lock();
        self.start_locked(&mut session, handle, iterations, flags)
    }

    fn start_locked(
        &self,
        session: &mut Session<T>,
        handle: EffectHandle,
        iterations: u32,
        flags: StartFlags,
    ) -> Result<Outcome> {
        session.require_exclusive()?;
        let downloaded = session.effect(handle)?.is_downloaded();
        if flags.no_download {
            if !downloaded {
                return Err(PidError::NotDownloaded);
            }
        } else {
            self.download_locked(session, handle)?;
        }

        let index = self.wire_index(session.effect(handle)?)?;
        let operation = if flags.solo {
            EffectOperation::StartSolo
        } else {
            EffectOperation::Start
        };
        let report = self.encoder().effect_control(index, operation, iterations);
        self.send(&mut session.transport, &report)?;

        self.status.set_state(handle, EffectState::Playing);
        if flags.solo {
            self.status.stop_others(handle);
        }
        debug!("Started effect {} ({} iterations)", handle, iterations);
        Ok(Outcome::Done)
    }

    pub fn stop(&self, handle: EffectHandle) -> Result<Outcome> {
        let mut session = self.session.lock();
        session.require_exclusive()?;
        let effect = session.effect(handle)?;
        if !effect.is_downloaded() {
            return Err(PidError::NotDownloaded);
        }
        let index = self.wire_index(effect)?;
        let report = self.encoder().effect_control(index, EffectOperation::Stop, 0);
        self.send(&mut session.transport, &report)?;
        self.status.set_state(handle, EffectState::Stopped);
        Ok(Outcome::Done)
    }

    /// Cached status bits of one effect. Never touches the session lock.
    pub fn get_status(&self, handle: EffectHandle) -> Result<EffectStatus> {
        self.status.effect_status(handle)
    }
}

impl<T> std::fmt::Debug for PidDevice<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PidDevice")
            .field("name", &self.caps.name)
            .field("pool_mode", &self.caps.pool_mode)
            .finish_non_exhaustive()
    }
}
