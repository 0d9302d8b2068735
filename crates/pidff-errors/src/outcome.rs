//! Success-shaped results that still carry information for the caller.

/// Result of a state-changing operation that succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Outcome {
    /// The operation ran and reached the device (or needed to)
    #[default]
    Done,
    /// Nothing changed: redundant download, unload, acquire or release
    NoEffect,
    /// Parameters were buffered but not sent to the device
    Skipped,
}

impl Outcome {
    /// Whether this is one of the informational outcomes.
    pub fn is_informational(self) -> bool {
        !matches!(self, Outcome::Done)
    }
}

/// Completeness of a read into a caller-sized buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReadStatus {
    /// Everything fit
    #[default]
    Exact,
    /// The buffer was shorter than the data; the true count is reported
    MoreData,
}
