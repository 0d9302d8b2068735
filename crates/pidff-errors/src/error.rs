//! Hard-failure kinds returned by effect and device operations.

use core::fmt;

use crate::TransportError;

/// Errors returned by effect and device-session operations.
///
/// None of these are retried by the engine; callers decide whether to fix
/// their input, re-acquire the device, or give up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PidError {
    /// Malformed or internally inconsistent input
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Download attempted before the required parameter groups were set
    #[error("Effect is incomplete, missing: {missing}")]
    IncompleteEffect {
        /// Names of the parameter groups that were never set
        missing: String,
    },

    /// The effect has no device-side copy yet
    #[error("Effect has not been downloaded")]
    NotDownloaded,

    /// The operation needs an exclusive session on the device
    #[error("Device is not exclusively acquired")]
    NotExclusivelyAcquired,

    /// The capability table has no report or usage for the request
    #[error("Usage not found: {0}")]
    UsageNotFound(String),

    /// The effect kind has no device-side encoding
    #[error("Effect kind {0} is not registered on this device")]
    DeviceNotRegistered(String),

    /// The device refused to allocate another effect block
    #[error("Device effect pool is full")]
    DeviceFull,

    /// The handle does not name a live effect on this device
    #[error("Effect {0} not found")]
    EffectNotFound(u32),

    /// Failure reported by the transport collaborator, passed through
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl PidError {
    /// Create an invalid-parameter error.
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        PidError::InvalidParameter(msg.into())
    }

    /// Create an incomplete-effect error listing the missing groups.
    pub fn incomplete(missing: impl Into<String>) -> Self {
        PidError::IncompleteEffect {
            missing: missing.into(),
        }
    }

    /// Create a usage-not-found error.
    pub fn usage_not_found(usage: impl Into<String>) -> Self {
        PidError::UsageNotFound(usage.into())
    }

    /// Get the error category for classification.
    pub fn category(&self) -> ErrorCategory {
        match self {
            PidError::InvalidParameter(_) | PidError::EffectNotFound(_) => {
                ErrorCategory::Parameter
            }
            PidError::IncompleteEffect { .. } | PidError::NotDownloaded => {
                ErrorCategory::Lifecycle
            }
            PidError::NotExclusivelyAcquired => ErrorCategory::Access,
            PidError::UsageNotFound(_)
            | PidError::DeviceNotRegistered(_)
            | PidError::DeviceFull => ErrorCategory::Device,
            PidError::Transport(_) => ErrorCategory::Transport,
        }
    }

    /// Whether the caller can recover by fixing its own input or call order.
    pub fn is_caller_fixable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Parameter | ErrorCategory::Lifecycle | ErrorCategory::Access
        )
    }
}

/// Error category for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCategory {
    /// Bad input from the caller
    Parameter = 0,
    /// Operation issued in the wrong effect state
    Lifecycle = 1,
    /// Session access mode does not allow the operation
    Access = 2,
    /// The device cannot express the request
    Device = 3,
    /// The transport collaborator failed
    Transport = 4,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Parameter => write!(f, "Parameter"),
            ErrorCategory::Lifecycle => write!(f, "Lifecycle"),
            ErrorCategory::Access => write!(f, "Access"),
            ErrorCategory::Device => write!(f, "Device"),
            ErrorCategory::Transport => write!(f, "Transport"),
        }
    }
}
