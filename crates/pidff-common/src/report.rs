//! Bit-level report building and parsing.
//!
//! Fields are placed LSB first: bit `p` of the payload lives in byte
//! `1 + p / 8`, bit `p % 8`. Byte 0 is the report id.

use crate::caps::FieldLayout;
use crate::scale::{clamp, pack, unpack, width_mask};

/// Direction of a report on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Output,
    Feature,
}

/// A complete wire report, report id included.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Report {
    pub kind: ReportKind,
    pub bytes: Vec<u8>,
}

impl Report {
    pub fn report_id(&self) -> u8 {
        self.bytes.first().copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lower-case hex of the whole report, space separated.
    pub fn to_hex(&self) -> String {
        self.bytes
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Builds one report by setting fields into a zeroed buffer.
pub struct ReportWriter {
    buffer: Vec<u8>,
}

impl ReportWriter {
    /// `len` is the payload length after the report id.
    pub fn new(report_id: u8, len: usize) -> Self {
        let mut buffer = vec![0u8; len.saturating_add(1)];
        if let Some(first) = buffer.first_mut() {
            *first = report_id;
        }
        Self { buffer }
    }

    /// Store the low `bit_size` bits of `raw`. Bits past the end are dropped.
    pub fn put_raw(&mut self, field: &FieldLayout, raw: u32) -> &mut Self {
        let raw = raw & width_mask(field.bit_size);
        for bit in 0..usize::from(field.bit_size.min(32)) {
            let position = usize::from(field.bit_offset) + bit;
            if let Some(byte) = self.buffer.get_mut(1 + position / 8) {
                let mask = 1u8 << (position % 8);
                if (raw >> bit) & 1 == 1 {
                    *byte |= mask;
                } else {
                    *byte &= !mask;
                }
            }
        }
        self
    }

    /// Store a logical value, clamped to the field's logical range.
    pub fn put(&mut self, field: &FieldLayout, value: i64) -> &mut Self {
        let value = clamp(
            value,
            i64::from(field.logical_min),
            i64::from(field.logical_max),
        );
        self.put_raw(field, pack(value, field.bit_size, field.is_signed()))
    }

    /// Store the HID null value (all ones).
    pub fn put_null(&mut self, field: &FieldLayout) -> &mut Self {
        self.put_raw(field, u32::MAX)
    }

    pub fn put_flag(&mut self, field: &FieldLayout, on: bool) -> &mut Self {
        self.put_raw(field, u32::from(on))
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn finish(self, kind: ReportKind) -> Report {
        Report {
            kind,
            bytes: self.buffer,
        }
    }
}

/// Reads fields from a received report (report id at byte 0).
pub struct ReportReader<'a> {
    data: &'a [u8],
}

impl<'a> ReportReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn report_id(&self) -> Option<u8> {
        self.data.first().copied()
    }

    /// Raw bits of `field`, or `None` when the report is too short.
    pub fn get_raw(&self, field: &FieldLayout) -> Option<u32> {
        if self.data.len().saturating_sub(1).saturating_mul(8) < field.end_bit() {
            return None;
        }
        let mut raw = 0u32;
        for bit in 0..usize::from(field.bit_size.min(32)) {
            let position = usize::from(field.bit_offset) + bit;
            let byte = self.data.get(1 + position / 8)?;
            if (byte >> (position % 8)) & 1 == 1 {
                raw |= 1 << bit;
            }
        }
        Some(raw)
    }

    /// Sign-extended logical value of `field`.
    pub fn get(&self, field: &FieldLayout) -> Option<i64> {
        self.get_raw(field)
            .map(|raw| unpack(raw, field.bit_size, field.is_signed()))
    }

    pub fn get_flag(&self, field: &FieldLayout) -> Option<bool> {
        self.get_raw(field).map(|raw| raw != 0)
    }
}
