//! Effect handle and slot allocation.

use std::collections::BTreeSet;
use std::fmt;

use pidff_common::caps::PoolMode;
use pidff_errors::{PidError, Result};

/// Caller-facing identifier of a created effect.
///
/// On host-managed devices the handle doubles as the wire block index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EffectHandle(pub u32);

impl EffectHandle {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EffectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out effect handles.
///
/// Host-managed pools are bounded by the device's slot count and the
/// handle is the block index. Device-managed pools bound nothing here; the
/// device refuses a block on download when it runs out.
#[derive(Debug, Clone)]
pub struct HandleAllocator {
    mode: PoolMode,
    capacity: u8,
    in_use: BTreeSet<u32>,
}

impl HandleAllocator {
    pub fn new(mode: PoolMode, capacity: u8) -> Self {
        Self {
            mode,
            capacity,
            in_use: BTreeSet::new(),
        }
    }

    pub fn mode(&self) -> PoolMode {
        self.mode
    }

    /// Lowest free handle, starting at 1.
    pub fn allocate(&mut self) -> Result<EffectHandle> {
        let limit = match self.mode {
            PoolMode::HostManaged => u32::from(self.capacity),
            PoolMode::DeviceManaged => u32::MAX,
        };
        let handle = (1..=limit)
            .find(|candidate| !self.in_use.contains(candidate))
            .ok_or(PidError::DeviceFull)?;
        self.in_use.insert(handle);
        Ok(EffectHandle(handle))
    }

    pub fn release(&mut self, handle: EffectHandle) -> bool {
        self.in_use.remove(&handle.0)
    }

    pub fn len(&self) -> usize {
        self.in_use.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_use.is_empty()
    }

    /// Wire index for a host-managed handle.
    pub fn host_index(handle: EffectHandle) -> Result<u8> {
        u8::try_from(handle.0)
            .map_err(|_| PidError::invalid_parameter(format!("handle {handle} exceeds a block index")))
    }
}
