//! Common imports for engine users.

pub use crate::device::{AccessMode, EffectInfo, PidDevice, SetFlags, StartFlags};
pub use crate::pool::EffectHandle;
pub use crate::status::{EffectState, StatusSink};
pub use crate::transport::PidTransport;
pub use pidff_common::params::{
    Condition, ConstantForce, Duration, EffectKind, EffectPayload, Envelope, ParamGroups,
    ParameterDelta, Periodic, RampForce, TriggerButton,
};
pub use pidff_common::{DeviceCommand, DirectionRepr, EffectStatus, ForceFeedbackState};
pub use pidff_errors::{Outcome, PidError, ReadStatus};
