//! Effect direction in three interchangeable representations.
//!
//! Storage is always per-axis Cartesian components in units of
//! [`FULL_SCALE`]. Polar and Spherical angles are hundredths of a degree and
//! are computed on read / accepted on write.
//!
//! Spherical angles use the iterated convention: for components
//! `x0..x(N-1)`, angle `k` is `atan2(x[k+1], |x[0..=k]|)`, except angle 0
//! which is `atan2(x1, x0)` with the signed `x0`. A one-axis vector reads
//! back as `0` (positive) or `18000` (negative).

use pidff_errors::{PidError, ReadStatus, Result};
use serde::{Deserialize, Serialize};

use crate::scale::round;

/// Canonical full-scale magnitude of a direction component.
pub const FULL_SCALE: i32 = 10_000;

/// One full turn in hundredths of a degree.
pub const FULL_CIRCLE: i32 = 36_000;

const HALF_CIRCLE: i32 = 18_000;

/// How direction values are expressed at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionRepr {
    #[default]
    Cartesian,
    Polar,
    Spherical,
}

/// Result of reading a direction into a caller buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionRead {
    /// Number of values the representation has (always the axis count)
    pub count: usize,
    pub status: ReadStatus,
}

/// Canonical direction of an effect: one component per enabled axis.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DirectionVector {
    components: Vec<i32>,
}

impl DirectionVector {
    pub fn zeroed(axes: usize) -> Self {
        Self {
            components: vec![0; axes],
        }
    }

    pub fn from_components(components: Vec<i32>) -> Self {
        Self { components }
    }

    pub fn axis_count(&self) -> usize {
        self.components.len()
    }

    pub fn components(&self) -> &[i32] {
        &self.components
    }

    pub fn is_zero(&self) -> bool {
        self.components.iter().all(|&c| c == 0)
    }

    /// Change the axis count, dropping or zero-filling trailing components.
    pub fn resize(&mut self, axes: usize) {
        self.components.resize(axes, 0);
    }

    /// Build the canonical vector for `axes` axes from caller values.
    ///
    /// Fewer values than axes is allowed; the missing trailing values are 0.
    pub fn from_repr(repr: DirectionRepr, values: &[i32], axes: usize) -> Result<Self> {
        if values.len() > axes {
            return Err(PidError::invalid_parameter(format!(
                "{} direction values for {axes} enabled axes",
                values.len()
            )));
        }
        let components = match repr {
            DirectionRepr::Cartesian => {
                let mut components = values.to_vec();
                components.resize(axes, 0);
                components
            }
            DirectionRepr::Polar => {
                if axes != 2 {
                    return Err(PidError::invalid_parameter(format!(
                        "polar direction needs exactly 2 axes, effect has {axes}"
                    )));
                }
                let theta = to_radians(values.first().copied().unwrap_or(0));
                let (sin, cos) = theta.sin_cos();
                vec![to_units(cos), to_units(sin)]
            }
            DirectionRepr::Spherical => spherical_to_cartesian(values, axes),
        };
        Ok(Self { components })
    }

    /// All values of `repr`, one slot per axis.
    pub fn values(&self, repr: DirectionRepr) -> Result<Vec<i32>> {
        let axes = self.axis_count();
        match repr {
            DirectionRepr::Cartesian => Ok(self.components.clone()),
            DirectionRepr::Polar => {
                if axes != 2 {
                    return Err(PidError::invalid_parameter(format!(
                        "polar direction needs exactly 2 axes, effect has {axes}"
                    )));
                }
                let angle = self.spherical_angles().first().copied().unwrap_or(0);
                Ok(vec![angle, 0])
            }
            DirectionRepr::Spherical => {
                let mut angles = self.spherical_angles();
                angles.resize(axes, 0);
                Ok(angles)
            }
        }
    }

    /// Copy the values of `repr` into `out`.
    ///
    /// A short buffer receives a prefix and the read reports
    /// [`ReadStatus::MoreData`] with the full count.
    pub fn to_repr(&self, repr: DirectionRepr, out: &mut [i32]) -> Result<DirectionRead> {
        let values = self.values(repr)?;
        for (slot, value) in out.iter_mut().zip(&values) {
            *slot = *value;
        }
        let status = if out.len() < values.len() {
            ReadStatus::MoreData
        } else {
            ReadStatus::Exact
        };
        Ok(DirectionRead {
            count: values.len(),
            status,
        })
    }

    /// Spherical angles in `0..36000`.
    ///
    /// `N - 1` angles for `N >= 2` axes, a single `0`/`18000` sign angle for
    /// one axis, nothing for zero axes. An all-zero vector yields zeros.
    pub fn spherical_angles(&self) -> Vec<i32> {
        match self.components.as_slice() {
            [] => Vec::new(),
            [x0] => vec![if *x0 < 0 { HALF_CIRCLE } else { 0 }],
            [x0, rest @ ..] => {
                if self.is_zero() {
                    return vec![0; rest.len()];
                }
                let first = f64::from(*x0);
                let mut sum_sq = first * first;
                let mut angles = Vec::with_capacity(rest.len());
                for (k, &next) in rest.iter().enumerate() {
                    let next = f64::from(next);
                    let base = if k == 0 { first } else { sum_sq.sqrt() };
                    angles.push(to_hundredths(next.atan2(base)));
                    sum_sq += next * next;
                }
                angles
            }
        }
    }
}

fn spherical_to_cartesian(angles: &[i32], axes: usize) -> Vec<i32> {
    match axes {
        0 => Vec::new(),
        1 => {
            let cos = to_radians(angles.first().copied().unwrap_or(0)).cos();
            vec![if cos < 0.0 { -FULL_SCALE } else { FULL_SCALE }]
        }
        _ => {
            let mut unit = vec![0.0f64; axes];
            if let Some(first) = unit.first_mut() {
                *first = 1.0;
            }
            for i in 1..axes {
                let theta = to_radians(angles.get(i - 1).copied().unwrap_or(0));
                let (sin, cos) = theta.sin_cos();
                for component in unit.iter_mut().take(i) {
                    *component *= cos;
                }
                if let Some(component) = unit.get_mut(i) {
                    *component = sin;
                }
            }
            unit.into_iter().map(to_units).collect()
        }
    }
}

fn to_radians(hundredths: i32) -> f64 {
    (f64::from(hundredths) / 100.0).to_radians()
}

fn to_hundredths(radians: f64) -> i32 {
    let hundredths = round(radians.to_degrees() * 100.0).rem_euclid(i64::from(FULL_CIRCLE));
    i32::try_from(hundredths).unwrap_or(0)
}

fn to_units(fraction: f64) -> i32 {
    let units = round(fraction * f64::from(FULL_SCALE));
    i32::try_from(units).unwrap_or(if units < 0 { -FULL_SCALE } else { FULL_SCALE })
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_cartesian_pads_missing_axes() -> TestResult {
        let v = DirectionVector::from_repr(DirectionRepr::Cartesian, &[5], 3)?;
        assert_eq!(v.components(), &[5, 0, 0]);
        Ok(())
    }

    #[test]
    fn test_too_many_values_rejected() {
        let err = DirectionVector::from_repr(DirectionRepr::Cartesian, &[1, 2, 3], 2);
        assert!(matches!(err, Err(PidError::InvalidParameter(_))));
    }

    #[test]
    fn test_polar_needs_two_axes() {
        for axes in [1, 3] {
            let err = DirectionVector::from_repr(DirectionRepr::Polar, &[0], axes);
            assert!(matches!(err, Err(PidError::InvalidParameter(_))));
            let v = DirectionVector::zeroed(axes);
            assert!(matches!(
                v.values(DirectionRepr::Polar),
                Err(PidError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_polar_is_cos_sin() -> TestResult {
        let v = DirectionVector::from_repr(DirectionRepr::Polar, &[9000], 2)?;
        assert_eq!(v.components(), &[0, FULL_SCALE]);
        let v = DirectionVector::from_repr(DirectionRepr::Polar, &[0], 2)?;
        assert_eq!(v.components(), &[FULL_SCALE, 0]);
        Ok(())
    }

    #[test]
    fn test_zero_vector_reads_angle_zero() -> TestResult {
        let v = DirectionVector::zeroed(2);
        assert_eq!(v.values(DirectionRepr::Polar)?, vec![0, 0]);
        assert_eq!(v.values(DirectionRepr::Spherical)?, vec![0, 0]);
        assert_eq!(DirectionVector::zeroed(4).spherical_angles(), vec![0, 0, 0]);
        Ok(())
    }

    #[test]
    fn test_single_axis_sign() -> TestResult {
        let v = DirectionVector::from_repr(DirectionRepr::Spherical, &[18000], 1)?;
        assert_eq!(v.components(), &[-FULL_SCALE]);
        assert_eq!(v.values(DirectionRepr::Spherical)?, vec![18000]);
        let v = DirectionVector::from_repr(DirectionRepr::Cartesian, &[3], 1)?;
        assert_eq!(v.values(DirectionRepr::Spherical)?, vec![0]);
        Ok(())
    }

    #[test]
    fn test_spherical_three_axes() -> TestResult {
        let v = DirectionVector::from_repr(DirectionRepr::Spherical, &[3000, 6000], 3)?;
        assert_eq!(v.components(), &[4330, 2500, 8660]);
        assert_eq!(v.values(DirectionRepr::Spherical)?, vec![3000, 6000, 0]);
        Ok(())
    }

    #[test]
    fn test_short_buffer_reports_more_data() -> TestResult {
        let v = DirectionVector::from_components(vec![1, 2, 3]);
        let mut out = [0; 2];
        let read = v.to_repr(DirectionRepr::Cartesian, &mut out)?;
        assert_eq!(read.count, 3);
        assert_eq!(read.status, ReadStatus::MoreData);
        assert_eq!(out, [1, 2]);

        let mut out = [0; 4];
        let read = v.to_repr(DirectionRepr::Cartesian, &mut out)?;
        assert_eq!(read.status, ReadStatus::Exact);
        assert_eq!(out, [1, 2, 3, 0]);
        Ok(())
    }

    #[test]
    fn test_resize_keeps_prefix() {
        let mut v = DirectionVector::from_components(vec![1, 2, 3]);
        v.resize(2);
        assert_eq!(v.components(), &[1, 2]);
        v.resize(4);
        assert_eq!(v.components(), &[1, 2, 0, 0]);
    }
}
