//! Failures of the report write/read collaborator.

/// Errors raised by a transport implementation.
///
/// The engine treats these as opaque and hands them back to the caller
/// inside [`crate::PidError::Transport`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Failed to write a report
    #[error("Failed to write report {report_id:#04x}: {message}")]
    WriteFailed {
        /// Report id of the failed write
        report_id: u8,
        /// Transport-specific message
        message: String,
    },

    /// Failed to read a report
    #[error("Failed to read report {report_id:#04x}: {message}")]
    ReadFailed {
        /// Report id of the failed read
        report_id: u8,
        /// Transport-specific message
        message: String,
    },

    /// The device answered with fewer bytes than the report needs
    #[error("Short report {report_id:#04x}: expected {expected} bytes, got {actual}")]
    ShortReport {
        /// Report id
        report_id: u8,
        /// Expected byte count including the id
        expected: usize,
        /// Actual byte count
        actual: usize,
    },

    /// Device disconnected
    #[error("Device disconnected")]
    Disconnected,
}

impl TransportError {
    /// Create a write failure.
    pub fn write(report_id: u8, message: impl Into<String>) -> Self {
        TransportError::WriteFailed {
            report_id,
            message: message.into(),
        }
    }

    /// Create a read failure.
    pub fn read(report_id: u8, message: impl Into<String>) -> Self {
        TransportError::ReadFailed {
            report_id,
            message: message.into(),
        }
    }
}
