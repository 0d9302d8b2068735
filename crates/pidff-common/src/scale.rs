//! Linear rescaling, clamping and sign-aware bit packing.
//!
//! All functions are total: out-of-range inputs are clamped, degenerate
//! ranges collapse to the destination minimum, and nothing panics.

/// Clamp `value` into `[lo, hi]`.
///
/// Unlike [`Ord::clamp`] this does not panic on an inverted range; the
/// upper bound wins.
#[inline]
pub fn clamp(value: i64, lo: i64, hi: i64) -> i64 {
    value.max(lo).min(hi)
}

/// Rescale `value` from `[src_min, src_max]` to `[dst_min, dst_max]`.
///
/// The input is clamped to the source range first, then mapped with
/// truncating (towards zero) integer division:
///
/// ```
/// use pidff_common::scale::scale;
///
/// // 1000 of 0..10000 into a 0..255 device range
/// assert_eq!(scale(1000, 0, 10_000, 0, 255), 25);
/// assert_eq!(scale(2000, 0, 10_000, 0, 255), 51);
/// // clamped
/// assert_eq!(scale(11_000, 0, 10_000, 0, 255), 255);
/// ```
pub fn scale(value: i64, src_min: i64, src_max: i64, dst_min: i64, dst_max: i64) -> i64 {
    if src_max <= src_min {
        return dst_min;
    }
    let value = clamp(value, src_min, src_max);
    // Spans reach 2^64 - 1 for full-width i64 ranges; the product needs u128.
    let span = (i128::from(value) - i128::from(src_min)).unsigned_abs();
    let src_span = (i128::from(src_max) - i128::from(src_min)).unsigned_abs();
    let dst_span = i128::from(dst_max) - i128::from(dst_min);
    let magnitude = i128::try_from(span * dst_span.unsigned_abs() / src_span).unwrap_or(i128::MAX);
    let offset = if dst_span < 0 { -magnitude } else { magnitude };
    i64::try_from(i128::from(dst_min) + offset).unwrap_or(dst_max)
}

/// Round a float to the nearest integer, saturating at the `i64` bounds.
///
/// NaN maps to zero.
#[inline]
pub fn round(value: f64) -> i64 {
    if value.is_nan() {
        return 0;
    }
    value.round() as i64
}

/// Mask selecting the low `bit_width` bits (width clamped to 1..=32).
#[inline]
pub fn width_mask(bit_width: u8) -> u32 {
    match bit_width {
        0 => 1,
        32.. => u32::MAX,
        w => (1u32 << w) - 1,
    }
}

/// Pack `value` into an N-bit field.
///
/// Signed fields saturate to the width's two's-complement range and are
/// then truncated; unsigned fields wrap. The caller is expected to have
/// clamped `value` into the field's logical range with [`scale`] first.
#[inline]
pub fn pack(value: i64, bit_width: u8, signed: bool) -> u32 {
    let width = bit_width.clamp(1, 32);
    let value = if signed {
        let half = 1i64 << (width - 1);
        clamp(value, -half, half - 1)
    } else {
        value
    };
    (value as u32) & width_mask(width)
}

/// Reverse of [`pack`]: sign-extend a raw N-bit field when `signed`.
#[inline]
pub fn unpack(raw: u32, bit_width: u8, signed: bool) -> i64 {
    let width = bit_width.clamp(1, 32);
    let raw = raw & width_mask(width);
    if signed && width < 32 && raw & (1u32 << (width - 1)) != 0 {
        i64::from(raw) - (1i64 << width)
    } else if signed && width == 32 {
        i64::from(raw as i32)
    } else {
        i64::from(raw)
    }
}

/// Convert a microsecond count into a unit of `10^unit_exponent` seconds.
///
/// Scaling up saturates; scaling down truncates.
///
/// ```
/// use pidff_common::scale::micros_to_unit;
///
/// assert_eq!(micros_to_unit(2_000, -3), 2); // milliseconds
/// assert_eq!(micros_to_unit(2_500, -3), 2);
/// assert_eq!(micros_to_unit(2_000, -6), 2_000);
/// assert_eq!(micros_to_unit(3, -7), 30);
/// ```
pub fn micros_to_unit(micros: i64, unit_exponent: i8) -> i64 {
    let mut value = micros;
    let mut exponent = i32::from(unit_exponent);
    while exponent < -6 {
        value = value.saturating_mul(10);
        exponent += 1;
    }
    while exponent > -6 {
        value /= 10;
        exponent -= 1;
    }
    value
}
