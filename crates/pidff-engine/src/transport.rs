//! Report transport seam
//!
//! The engine never touches a real USB stack. A transport writes complete
//! reports (report id at byte 0) and reads feature reports back.

use pidff_common::report::{Report, ReportKind};
use pidff_errors::TransportResult;

pub trait PidTransport: Send {
    /// Write an output report.
    fn write_output(&mut self, report: &[u8]) -> TransportResult<()>;

    /// Write a feature report.
    fn set_feature(&mut self, report: &[u8]) -> TransportResult<()>;

    /// Read feature report `report_id` into `buf`, returning the byte count.
    ///
    /// `buf[0]` holds the report id on return.
    fn get_feature(&mut self, report_id: u8, buf: &mut [u8]) -> TransportResult<usize>;

    /// Write `report` through the call matching its kind.
    fn send(&mut self, report: &Report) -> TransportResult<()> {
        match report.kind {
            ReportKind::Output => self.write_output(&report.bytes),
            ReportKind::Feature => self.set_feature(&report.bytes),
        }
    }
}

impl<T: PidTransport + ?Sized> PidTransport for Box<T> {
    fn write_output(&mut self, report: &[u8]) -> TransportResult<()> {
        (**self).write_output(report)
    }

    fn set_feature(&mut self, report: &[u8]) -> TransportResult<()> {
        (**self).set_feature(report)
    }

    fn get_feature(&mut self, report_id: u8, buf: &mut [u8]) -> TransportResult<usize> {
        (**self).get_feature(report_id, buf)
    }
}

pub mod mock {
    //! Recording transport that can emulate a device-managed effect pool.

    use std::collections::{BTreeSet, VecDeque};
    use std::sync::Arc;

    use parking_lot::Mutex;
    use pidff_common::caps::{DeviceCapabilities, DeviceCommand, PoolLayout};
    use pidff_common::encode::ReportEncoder;
    use pidff_common::report::{Report, ReportKind, ReportReader, ReportWriter};
    use pidff_errors::{TransportError, TransportResult};

    use super::PidTransport;

    struct EmulatedPool {
        layout: PoolLayout,
        capacity: u8,
        used: BTreeSet<u8>,
        pending_create: bool,
        /// Device Control report that empties the pool
        reset: Option<Vec<u8>>,
    }

    impl EmulatedPool {
        fn reply(&mut self) -> Vec<u8> {
            let load = &self.layout.block_load;
            let mut writer = ReportWriter::new(load.report_id, load.len);
            let first = u8::try_from(load.block_index.logical_min.max(0)).unwrap_or(0);
            let free = (first..first.saturating_add(self.capacity)).find(|i| !self.used.contains(i));

            match free.filter(|_| self.pending_create) {
                Some(index) => {
                    self.used.insert(index);
                    writer.put(&load.block_index, i64::from(index));
                    writer.put_raw(&load.status, load.statuses.success);
                }
                None if self.pending_create => {
                    writer.put_raw(&load.status, load.statuses.full);
                }
                None => {
                    writer.put_raw(&load.status, load.statuses.error);
                }
            }
            if let Some(field) = &load.pool_available {
                let available = usize::from(self.capacity).saturating_sub(self.used.len());
                writer.put(field, i64::try_from(available).unwrap_or(0));
            }
            self.pending_create = false;
            writer.finish(ReportKind::Feature).bytes
        }
    }

    #[derive(Default)]
    struct MockState {
        written: Vec<Report>,
        queued_replies: VecDeque<Vec<u8>>,
        pool: Option<EmulatedPool>,
        fail_report_id: Option<u8>,
        disconnected: bool,
    }

    impl MockState {
        fn check(&self, report_id: u8) -> TransportResult<()> {
            if self.disconnected {
                return Err(TransportError::Disconnected);
            }
            if self.fail_report_id == Some(report_id) {
                return Err(TransportError::write(report_id, "injected failure"));
            }
            Ok(())
        }
    }

    /// Transport that records every written report.
    ///
    /// Clones share state, so a test can keep one clone and hand the other
    /// to the device.
    #[derive(Clone, Default)]
    pub struct MockTransport {
        state: Arc<Mutex<MockState>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Answer Block Load reads the way a device with this pool would.
        ///
        /// Block Free releases one block and a Device Control reset releases
        /// all of them.
        pub fn for_device(caps: &DeviceCapabilities) -> Self {
            let transport = Self::new();
            if let Some(layout) = &caps.pool {
                transport.state.lock().pool = Some(EmulatedPool {
                    layout: layout.clone(),
                    capacity: caps.max_effects,
                    used: BTreeSet::new(),
                    pending_create: false,
                    reset: ReportEncoder::new(caps)
                        .device_control(DeviceCommand::Reset)
                        .ok()
                        .map(|report| report.bytes),
                });
            }
            transport
        }

        /// Queue a raw feature reply, returned before any emulated one.
        pub fn queue_reply(&self, bytes: Vec<u8>) {
            self.state.lock().queued_replies.push_back(bytes);
        }

        /// Fail every write of `report_id` from now on.
        pub fn fail_on(&self, report_id: u8) {
            self.state.lock().fail_report_id = Some(report_id);
        }

        pub fn clear_failure(&self) {
            self.state.lock().fail_report_id = None;
        }

        pub fn disconnect(&self) {
            self.state.lock().disconnected = true;
        }

        pub fn written(&self) -> Vec<Report> {
            self.state.lock().written.clone()
        }

        /// Written reports as lower-case hex lines.
        pub fn written_hex(&self) -> Vec<String> {
            self.state.lock().written.iter().map(Report::to_hex).collect()
        }

        pub fn written_ids(&self) -> Vec<u8> {
            self.state.lock().written.iter().map(Report::report_id).collect()
        }

        /// Return and forget everything written so far.
        pub fn take(&self) -> Vec<Report> {
            std::mem::take(&mut self.state.lock().written)
        }

        pub fn clear(&self) {
            self.state.lock().written.clear();
        }

        /// Block indices the emulated pool currently holds.
        pub fn allocated_blocks(&self) -> Vec<u8> {
            self.state
                .lock()
                .pool
                .as_ref()
                .map(|pool| pool.used.iter().copied().collect())
                .unwrap_or_default()
        }
    }

    impl PidTransport for MockTransport {
        fn write_output(&mut self, report: &[u8]) -> TransportResult<()> {
            let mut state = self.state.lock();
            let report_id = report.first().copied().unwrap_or(0);
            state.check(report_id)?;
            if let Some(pool) = state.pool.as_mut() {
                let free = &pool.layout.block_free;
                if pool.reset.as_deref() == Some(report) {
                    pool.used.clear();
                } else if free.report_id == report_id {
                    if let Some(index) = ReportReader::new(report).get(&free.block_index) {
                        if let Ok(index) = u8::try_from(index) {
                            pool.used.remove(&index);
                        }
                    }
                }
            }
            state.written.push(Report {
                kind: ReportKind::Output,
                bytes: report.to_vec(),
            });
            Ok(())
        }

        fn set_feature(&mut self, report: &[u8]) -> TransportResult<()> {
            let mut state = self.state.lock();
            let report_id = report.first().copied().unwrap_or(0);
            state.check(report_id)?;
            if let Some(pool) = state.pool.as_mut() {
                if pool.layout.create_new_effect.report_id == report_id {
                    pool.pending_create = true;
                }
            }
            state.written.push(Report {
                kind: ReportKind::Feature,
                bytes: report.to_vec(),
            });
            Ok(())
        }

        fn get_feature(&mut self, report_id: u8, buf: &mut [u8]) -> TransportResult<usize> {
            let mut state = self.state.lock();
            if state.disconnected {
                return Err(TransportError::Disconnected);
            }
            let reply = match state.queued_replies.pop_front() {
                Some(reply) => reply,
                None => match state.pool.as_mut() {
                    Some(pool) if pool.layout.block_load.report_id == report_id => pool.reply(),
                    _ => return Err(TransportError::read(report_id, "no reply available")),
                },
            };
            let len = reply.len().min(buf.len());
            if let (Some(dst), Some(src)) = (buf.get_mut(..len), reply.get(..len)) {
                dst.copy_from_slice(src);
            }
            Ok(len)
        }
    }
}
