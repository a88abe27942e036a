//! Numeric field abstraction for the iteration kernels.
//!
//! The generic kernels in [`kernels`](crate::kernels) and
//! [`nondet`](crate::nondet) only need a handful of operations: zero, one,
//! addition, multiplication, comparison, and a way to measure how far two
//! values are apart. [`Field`] bundles exactly those on top of
//! [`num_traits::Num`], so exact rationals, interval types or arbitrary
//! precision numbers can be plugged in just like `f64`.
//!
//! Element types that are plain IEEE-754 doubles additionally expose a
//! zero-copy `&[f64]` view through [`Field::native_slice`]. That view is
//! the capability flag the router consults before choosing the
//! [`native`](crate::native) kernels.

use std::fmt::Debug;

use num_rational::BigRational;
use num_traits::{FromPrimitive, Num, Signed, ToPrimitive};

/// Arithmetic element type for weights and values.
pub trait Field:
    Num + Clone + PartialOrd + FromPrimitive + ToPrimitive + Debug + Send + Sync + 'static
{
    /// Absolute value.
    #[inline]
    fn abs_value(&self) -> Self {
        if *self < Self::zero() {
            Self::zero() - self.clone()
        } else {
            self.clone()
        }
    }

    /// `|self|` as an `f64`, used for the convergence measure.
    ///
    /// Values that cannot be represented map to `f64::INFINITY`, which keeps
    /// the iteration running rather than stopping early.
    #[inline]
    fn magnitude(&self) -> f64 {
        self.abs_value().to_f64().unwrap_or(f64::INFINITY)
    }

    /// `|self - other|` as an `f64`.
    #[inline]
    fn distance(&self, other: &Self) -> f64 {
        (self.clone() - other.clone()).magnitude()
    }

    /// The smaller of two values.
    #[inline]
    fn minimum(self, other: Self) -> Self {
        if other < self {
            other
        } else {
            self
        }
    }

    /// The larger of two values.
    #[inline]
    fn maximum(self, other: Self) -> Self {
        if other > self {
            other
        } else {
            self
        }
    }

    /// Zero-copy view of a slice of this type as native doubles.
    ///
    /// Returns `None` unless the element type *is* `f64`.
    #[inline]
    fn native_slice(_values: &[Self]) -> Option<&[f64]> {
        None
    }

    /// Mutable twin of [`native_slice`](Self::native_slice).
    #[inline]
    fn native_slice_mut(_values: &mut [Self]) -> Option<&mut [f64]> {
        None
    }

    /// Whether this element type has a native dense-array form.
    #[inline]
    fn has_native_form() -> bool {
        Self::native_slice(&[]).is_some()
    }
}

impl Field for f64 {
    #[inline]
    fn abs_value(&self) -> Self {
        self.abs()
    }

    #[inline]
    fn magnitude(&self) -> f64 {
        self.abs()
    }

    #[inline]
    fn distance(&self, other: &Self) -> f64 {
        (self - other).abs()
    }

    #[inline]
    fn minimum(self, other: Self) -> Self {
        f64::min(self, other)
    }

    #[inline]
    fn maximum(self, other: Self) -> Self {
        f64::max(self, other)
    }

    #[inline]
    fn native_slice(values: &[Self]) -> Option<&[f64]> {
        Some(values)
    }

    #[inline]
    fn native_slice_mut(values: &mut [Self]) -> Option<&mut [f64]> {
        Some(values)
    }
}

/// Single precision runs on the generic backend only.
impl Field for f32 {
    #[inline]
    fn abs_value(&self) -> Self {
        self.abs()
    }

    #[inline]
    fn magnitude(&self) -> f64 {
        f64::from(self.abs())
    }
}

/// Exact arithmetic, generic backend only. Denominators grow with every
/// sweep, so this is meant for small models and bounded runs.
impl Field for BigRational {
    #[inline]
    fn abs_value(&self) -> Self {
        Signed::abs(self)
    }
}

/// Convert an `f64` constant into the field, rejecting values the field
/// cannot represent.
pub(crate) fn field_from_f64<F: Field>(name: &str, value: f64) -> Result<F, crate::error::ValidationError> {
    F::from_f64(value).ok_or_else(|| crate::error::ValidationError::ParameterOutOfRange {
        name: name.into(),
        value: value.to_string(),
        expected: "a value representable in the weight field".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f64_is_native_f32_is_not() {
        assert!(<f64 as Field>::has_native_form());
        assert!(!<f32 as Field>::has_native_form());

        let mut v = vec![1.0f64, 2.0];
        let view = f64::native_slice_mut(&mut v).unwrap();
        view[1] = 5.0;
        assert_eq!(v, vec![1.0, 5.0]);
        assert!(f32::native_slice(&[1.0f32]).is_none());
    }

    #[test]
    fn distance_and_magnitude() {
        assert_eq!(0.25f64.distance(&1.0), 0.75);
        assert_eq!((-3.0f64).magnitude(), 3.0);
        assert_eq!((-0.5f32).magnitude(), 0.5);
        assert_eq!(2.0f32.distance(&-1.0), 3.0);
    }

    #[test]
    fn min_max() {
        assert_eq!(Field::minimum(0.3f64, 0.7), 0.3);
        assert_eq!(Field::maximum(0.3f64, 0.7), 0.7);
        assert_eq!(Field::minimum(0.3f32, -0.7), -0.7);
        assert_eq!(Field::maximum(-1.0f32, -0.7), -0.7);
    }

    #[test]
    fn big_rational_is_exact_and_generic() {
        use num_bigint::BigInt;

        assert!(!<BigRational as Field>::has_native_form());
        let third = BigRational::new(BigInt::from(1), BigInt::from(3));
        let minus_third = BigRational::new(BigInt::from(-1), BigInt::from(3));
        assert_eq!(minus_third.abs_value(), third);
        assert!((third.distance(&minus_third) - 2.0 / 3.0).abs() < 1e-15);

        // Doubles convert exactly, not to the nearest short fraction.
        let tenth: BigRational = field_from_f64("weight", 0.1).unwrap();
        assert_ne!(tenth, BigRational::new(BigInt::from(1), BigInt::from(10)));
        assert_eq!(tenth.to_f64(), Some(0.1));
    }

    #[test]
    fn field_from_f64_accepts_representable_values() {
        let v: f64 = field_from_f64("discount", 0.9).unwrap();
        assert_eq!(v, 0.9);
    }
}
