//! Effect kinds, parameters and parameter deltas.
//!
//! All values are device independent: levels and coefficients in
//! `-10000..=10000` (or `0..=10000` for unsigned quantities), angles in
//! hundredths of a degree, times in microseconds.

use bitflags::bitflags;
use pidff_errors::{PidError, Result};
use serde::{Deserialize, Deserializer, Serialize};

use crate::direction::{DirectionRepr, DirectionVector};

/// Nominal full scale of levels, gains and coefficients.
pub const NOMINAL_MAX: i32 = 10_000;

/// Every effect kind a PID device can play (custom force excluded).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    ConstantForce,
    RampForce,
    Square,
    Sine,
    Triangle,
    SawtoothUp,
    SawtoothDown,
    Spring,
    Damper,
    Inertia,
    Friction,
}

/// Which type-specific report an effect kind uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Periodic,
    Condition,
    ConstantForce,
    RampForce,
}

impl EffectKind {
    pub const ALL: [EffectKind; 11] = [
        EffectKind::ConstantForce,
        EffectKind::RampForce,
        EffectKind::Square,
        EffectKind::Sine,
        EffectKind::Triangle,
        EffectKind::SawtoothUp,
        EffectKind::SawtoothDown,
        EffectKind::Spring,
        EffectKind::Damper,
        EffectKind::Inertia,
        EffectKind::Friction,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EffectKind::ConstantForce => "ConstantForce",
            EffectKind::RampForce => "RampForce",
            EffectKind::Square => "Square",
            EffectKind::Sine => "Sine",
            EffectKind::Triangle => "Triangle",
            EffectKind::SawtoothUp => "SawtoothUp",
            EffectKind::SawtoothDown => "SawtoothDown",
            EffectKind::Spring => "Spring",
            EffectKind::Damper => "Damper",
            EffectKind::Inertia => "Inertia",
            EffectKind::Friction => "Friction",
        }
    }

    pub fn payload_kind(self) -> PayloadKind {
        match self {
            EffectKind::ConstantForce => PayloadKind::ConstantForce,
            EffectKind::RampForce => PayloadKind::RampForce,
            EffectKind::Square
            | EffectKind::Sine
            | EffectKind::Triangle
            | EffectKind::SawtoothUp
            | EffectKind::SawtoothDown => PayloadKind::Periodic,
            EffectKind::Spring | EffectKind::Damper | EffectKind::Inertia | EffectKind::Friction => {
                PayloadKind::Condition
            }
        }
    }

    /// Condition effects have no envelope.
    pub fn supports_envelope(self) -> bool {
        self.payload_kind() != PayloadKind::Condition
    }
}

impl std::fmt::Display for EffectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Periodic {
    pub magnitude: i32,
    pub offset: i32,
    /// Hundredths of a degree
    pub phase: i32,
    /// Microseconds
    pub period: u32,
}

/// One condition record (per axis, or shared).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Condition {
    pub offset: i32,
    pub positive_coefficient: i32,
    pub negative_coefficient: i32,
    pub positive_saturation: i32,
    pub negative_saturation: i32,
    pub deadband: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConstantForce {
    pub magnitude: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RampForce {
    pub start: i32,
    pub end: i32,
}

/// Attack and fade ramps; times in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Envelope {
    pub attack_level: i32,
    pub attack_time: u32,
    pub fade_level: i32,
    pub fade_time: u32,
}

/// Type-specific parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EffectPayload {
    Periodic(Periodic),
    /// One record per enabled axis, or a single shared record
    Condition(Vec<Condition>),
    ConstantForce(ConstantForce),
    RampForce(RampForce),
}

impl EffectPayload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            EffectPayload::Periodic(_) => PayloadKind::Periodic,
            EffectPayload::Condition(_) => PayloadKind::Condition,
            EffectPayload::ConstantForce(_) => PayloadKind::ConstantForce,
            EffectPayload::RampForce(_) => PayloadKind::RampForce,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Duration {
    /// Microseconds
    Finite(u32),
    Infinite,
}

impl Default for Duration {
    fn default() -> Self {
        Duration::Finite(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TriggerButton {
    #[default]
    None,
    Button(u8),
}

bitflags! {
    /// Parameter groups of an effect, as flagged on set/get.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ParamGroups: u32 {
        const DURATION = 0x0000_0001;
        const SAMPLE_PERIOD = 0x0000_0002;
        const GAIN = 0x0000_0004;
        const TRIGGER_BUTTON = 0x0000_0008;
        const TRIGGER_REPEAT_INTERVAL = 0x0000_0010;
        const AXES = 0x0000_0020;
        const DIRECTION = 0x0000_0040;
        const ENVELOPE = 0x0000_0080;
        const TYPE_SPECIFIC = 0x0000_0100;
        const START_DELAY = 0x0000_0200;

        /// Groups that must be set before a download
        const REQUIRED = Self::DURATION.bits()
            | Self::TRIGGER_BUTTON.bits()
            | Self::AXES.bits()
            | Self::TYPE_SPECIFIC.bits();

        /// Groups carried by the Set Effect / Update report
        const UPDATE = Self::DURATION.bits()
            | Self::SAMPLE_PERIOD.bits()
            | Self::GAIN.bits()
            | Self::TRIGGER_BUTTON.bits()
            | Self::TRIGGER_REPEAT_INTERVAL.bits()
            | Self::AXES.bits()
            | Self::DIRECTION.bits()
            | Self::START_DELAY.bits();
    }
}

/// Full parameter set of an effect.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EffectParameters {
    pub duration: Duration,
    /// Microseconds
    pub sample_period: u32,
    /// `0..=10000`
    pub gain: u32,
    pub trigger_button: TriggerButton,
    /// Microseconds
    pub trigger_repeat_interval: u32,
    /// Microseconds
    pub start_delay: u32,
    /// Indices into the device's axis list
    pub axes: Vec<u8>,
    /// One component per entry of `axes`
    pub direction: DirectionVector,
    pub envelope: Option<Envelope>,
    pub payload: Option<EffectPayload>,
}

impl EffectParameters {
    /// Groups whose values differ between `self` and `other`.
    pub fn diff(&self, other: &EffectParameters) -> ParamGroups {
        let mut groups = ParamGroups::empty();
        groups.set(ParamGroups::DURATION, self.duration != other.duration);
        groups.set(ParamGroups::SAMPLE_PERIOD, self.sample_period != other.sample_period);
        groups.set(ParamGroups::GAIN, self.gain != other.gain);
        groups.set(ParamGroups::TRIGGER_BUTTON, self.trigger_button != other.trigger_button);
        groups.set(
            ParamGroups::TRIGGER_REPEAT_INTERVAL,
            self.trigger_repeat_interval != other.trigger_repeat_interval,
        );
        groups.set(ParamGroups::AXES, self.axes != other.axes);
        groups.set(ParamGroups::DIRECTION, self.direction != other.direction);
        groups.set(ParamGroups::ENVELOPE, self.envelope != other.envelope);
        groups.set(ParamGroups::TYPE_SPECIFIC, self.payload != other.payload);
        groups.set(ParamGroups::START_DELAY, self.start_delay != other.start_delay);
        groups
    }

    /// Overwrite the given groups of `self` with the values in `from`.
    pub fn copy_groups(&mut self, from: &EffectParameters, groups: ParamGroups) {
        if groups.contains(ParamGroups::DURATION) {
            self.duration = from.duration;
        }
        if groups.contains(ParamGroups::SAMPLE_PERIOD) {
            self.sample_period = from.sample_period;
        }
        if groups.contains(ParamGroups::GAIN) {
            self.gain = from.gain;
        }
        if groups.contains(ParamGroups::TRIGGER_BUTTON) {
            self.trigger_button = from.trigger_button;
        }
        if groups.contains(ParamGroups::TRIGGER_REPEAT_INTERVAL) {
            self.trigger_repeat_interval = from.trigger_repeat_interval;
        }
        if groups.contains(ParamGroups::START_DELAY) {
            self.start_delay = from.start_delay;
        }
        if groups.contains(ParamGroups::AXES) {
            self.axes = from.axes.clone();
        }
        if groups.contains(ParamGroups::DIRECTION) {
            self.direction = from.direction.clone();
        }
        if groups.contains(ParamGroups::ENVELOPE) {
            self.envelope = from.envelope;
        }
        if groups.contains(ParamGroups::TYPE_SPECIFIC) {
            self.payload = from.payload.clone();
        }
    }

    /// Copy the requested groups of `self` into a delta.
    pub fn to_delta(&self, groups: ParamGroups) -> ParameterDelta {
        let pick = |group: ParamGroups| groups.contains(group);
        ParameterDelta {
            duration: pick(ParamGroups::DURATION).then_some(self.duration),
            sample_period: pick(ParamGroups::SAMPLE_PERIOD).then_some(self.sample_period),
            gain: pick(ParamGroups::GAIN).then_some(self.gain),
            trigger_button: pick(ParamGroups::TRIGGER_BUTTON).then_some(self.trigger_button),
            trigger_repeat_interval: pick(ParamGroups::TRIGGER_REPEAT_INTERVAL)
                .then_some(self.trigger_repeat_interval),
            start_delay: pick(ParamGroups::START_DELAY).then_some(self.start_delay),
            axes: pick(ParamGroups::AXES).then(|| self.axes.clone()),
            direction: pick(ParamGroups::DIRECTION).then(|| DirectionDelta {
                repr: DirectionRepr::Cartesian,
                values: self.direction.components().to_vec(),
            }),
            envelope: pick(ParamGroups::ENVELOPE).then_some(self.envelope),
            payload: pick(ParamGroups::TYPE_SPECIFIC)
                .then(|| self.payload.clone())
                .flatten(),
        }
    }
}

/// Direction as supplied by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionDelta {
    #[serde(default)]
    pub repr: DirectionRepr,
    pub values: Vec<i32>,
}

/// A partial parameter update. `None` leaves a group untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParameterDelta {
    pub duration: Option<Duration>,
    pub sample_period: Option<u32>,
    pub gain: Option<u32>,
    pub trigger_button: Option<TriggerButton>,
    pub trigger_repeat_interval: Option<u32>,
    pub start_delay: Option<u32>,
    pub axes: Option<Vec<u8>>,
    pub direction: Option<DirectionDelta>,
    /// `Some(None)` removes the envelope
    #[serde(deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub envelope: Option<Option<Envelope>>,
    pub payload: Option<EffectPayload>,
}

fn double_option<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl ParameterDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn sample_period(mut self, micros: u32) -> Self {
        self.sample_period = Some(micros);
        self
    }

    pub fn gain(mut self, gain: u32) -> Self {
        self.gain = Some(gain);
        self
    }

    pub fn trigger_button(mut self, button: TriggerButton) -> Self {
        self.trigger_button = Some(button);
        self
    }

    pub fn trigger_repeat_interval(mut self, micros: u32) -> Self {
        self.trigger_repeat_interval = Some(micros);
        self
    }

    pub fn start_delay(mut self, micros: u32) -> Self {
        self.start_delay = Some(micros);
        self
    }

    pub fn axes(mut self, axes: impl Into<Vec<u8>>) -> Self {
        self.axes = Some(axes.into());
        self
    }

    pub fn direction(mut self, repr: DirectionRepr, values: impl Into<Vec<i32>>) -> Self {
        self.direction = Some(DirectionDelta {
            repr,
            values: values.into(),
        });
        self
    }

    pub fn envelope(mut self, envelope: Envelope) -> Self {
        self.envelope = Some(Some(envelope));
        self
    }

    pub fn remove_envelope(mut self) -> Self {
        self.envelope = Some(None);
        self
    }

    pub fn payload(mut self, payload: EffectPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Groups this delta touches.
    pub fn groups(&self) -> ParamGroups {
        let mut groups = ParamGroups::empty();
        groups.set(ParamGroups::DURATION, self.duration.is_some());
        groups.set(ParamGroups::SAMPLE_PERIOD, self.sample_period.is_some());
        groups.set(ParamGroups::GAIN, self.gain.is_some());
        groups.set(ParamGroups::TRIGGER_BUTTON, self.trigger_button.is_some());
        groups.set(
            ParamGroups::TRIGGER_REPEAT_INTERVAL,
            self.trigger_repeat_interval.is_some(),
        );
        groups.set(ParamGroups::START_DELAY, self.start_delay.is_some());
        groups.set(ParamGroups::AXES, self.axes.is_some());
        groups.set(ParamGroups::DIRECTION, self.direction.is_some());
        groups.set(ParamGroups::ENVELOPE, self.envelope.is_some());
        groups.set(ParamGroups::TYPE_SPECIFIC, self.payload.is_some());
        groups
    }

    /// Merge into `params` for an effect of `kind`.
    ///
    /// Checks the delta is consistent with itself and with the axes the
    /// effect will have afterwards; on error `params` is left untouched.
    pub fn apply(&self, kind: EffectKind, params: &mut EffectParameters) -> Result<()> {
        if let Some(gain) = self.gain {
            if gain > NOMINAL_MAX.unsigned_abs() {
                return Err(PidError::invalid_parameter(format!(
                    "gain {gain} exceeds {NOMINAL_MAX}"
                )));
            }
        }

        let axes = self.axes.as_ref().unwrap_or(&params.axes);
        for (i, axis) in axes.iter().enumerate() {
            if axes.iter().skip(i + 1).any(|other| other == axis) {
                return Err(PidError::invalid_parameter(format!(
                    "axis {axis} listed twice"
                )));
            }
        }
        let axis_count = axes.len();

        let direction = match &self.direction {
            Some(delta) => Some(DirectionVector::from_repr(delta.repr, &delta.values, axis_count)?),
            None => None,
        };

        if let Some(Some(_)) = self.envelope {
            if !kind.supports_envelope() {
                return Err(PidError::invalid_parameter(format!(
                    "{kind} effects have no envelope"
                )));
            }
        }

        if let Some(payload) = &self.payload {
            if payload.kind() != kind.payload_kind() {
                return Err(PidError::invalid_parameter(format!(
                    "{:?} parameters for a {kind} effect",
                    payload.kind()
                )));
            }
            if let EffectPayload::Condition(records) = payload {
                if records.is_empty() || (records.len() != 1 && records.len() != axis_count) {
                    return Err(PidError::invalid_parameter(format!(
                        "{} condition records for {axis_count} axes",
                        records.len()
                    )));
                }
            }
        } else if let (Some(EffectPayload::Condition(records)), Some(_)) =
            (&params.payload, &self.axes)
        {
            if records.len() != 1 && records.len() != axis_count {
                return Err(PidError::invalid_parameter(format!(
                    "{} condition records no longer match {axis_count} axes",
                    records.len()
                )));
            }
        }

        if let Some(duration) = self.duration {
            params.duration = duration;
        }
        if let Some(period) = self.sample_period {
            params.sample_period = period;
        }
        if let Some(gain) = self.gain {
            params.gain = gain;
        }
        if let Some(button) = self.trigger_button {
            params.trigger_button = button;
        }
        if let Some(interval) = self.trigger_repeat_interval {
            params.trigger_repeat_interval = interval;
        }
        if let Some(delay) = self.start_delay {
            params.start_delay = delay;
        }
        if let Some(axes) = &self.axes {
            params.axes = axes.clone();
            params.direction.resize(axes.len());
        }
        if let Some(direction) = direction {
            params.direction = direction;
        }
        if let Some(envelope) = self.envelope {
            params.envelope = envelope;
        }
        if let Some(payload) = &self.payload {
            params.payload = Some(payload.clone());
        }
        Ok(())
    }
}
