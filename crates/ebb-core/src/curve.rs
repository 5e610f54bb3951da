//! Linear decay curves.
//!
//! Voting power is represented as a `{bias, slope}` pair evaluated at an
//! absolute timestamp: `value(t) = bias - slope * t`, floored at zero. A lock
//! of `total` principal expiring at `expiry` has `slope = total / max_duration`
//! and `bias = slope * expiry`, so its value reaches exactly zero at expiry.
//!
//! Curves of many locks sum componentwise. When a lock expires its slope is
//! removed from the aggregate together with the matching `slope * expiry`
//! share of the bias ([`DecayCurve::remove_expired`]).
//!
//! Pure computation. Integer arithmetic only.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ArithmeticError;

/// A `{bias, slope}` pair describing a linearly decreasing quantity.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct DecayCurve {
    pub bias: u128,
    pub slope: u128,
}

impl DecayCurve {
    /// The zero curve.
    pub const ZERO: Self = Self { bias: 0, slope: 0 };

    pub fn new(bias: u128, slope: u128) -> Self {
        Self { bias, slope }
    }

    pub fn is_zero(&self) -> bool {
        self.bias == 0 && self.slope == 0
    }

    /// Derive a lock's curve from its principal.
    ///
    /// `slope = total / max_duration` rounds down, so a lock loses at most
    /// `max_duration - 1` units of principal to truncation. Callers must
    /// reject a zero slope before using the curve.
    ///
    /// # Examples
    ///
    /// ```
    /// use ebb_core::curve::DecayCurve;
    /// let c = DecayCurve::from_principal(1_000, 500, 10).unwrap();
    /// assert_eq!(c.slope, 100);
    /// assert_eq!(c.bias, 50_000);
    /// assert_eq!(c.value_at(500), 0);
    /// assert_eq!(c.value_at(490), 1_000);
    /// ```
    pub fn from_principal(
        total: u128,
        expiry: u64,
        max_duration: u64,
    ) -> Result<Self, ArithmeticError> {
        if max_duration == 0 {
            return Err(ArithmeticError::Overflow);
        }
        let slope = total / max_duration as u128;
        let bias = slope
            .checked_mul(expiry as u128)
            .ok_or(ArithmeticError::Overflow)?;
        Ok(Self { bias, slope })
    }

    /// Value at timestamp `t`, floored at zero.
    pub fn value_at(&self, t: u64) -> u128 {
        let decayed = self.slope.saturating_mul(t as u128);
        self.bias.saturating_sub(decayed)
    }

    /// Componentwise checked addition.
    pub fn checked_add(&self, other: &DecayCurve) -> Result<Self, ArithmeticError> {
        Ok(Self {
            bias: self
                .bias
                .checked_add(other.bias)
                .ok_or(ArithmeticError::Overflow)?,
            slope: self
                .slope
                .checked_add(other.slope)
                .ok_or(ArithmeticError::Overflow)?,
        })
    }

    /// Componentwise subtraction, saturating at zero.
    ///
    /// Subtracting a curve that was never added is a bookkeeping bug; the
    /// saturation is logged so it never goes unnoticed.
    pub fn saturating_sub(&self, other: &DecayCurve) -> Self {
        if other.bias > self.bias || other.slope > self.slope {
            warn!(
                bias = self.bias,
                slope = self.slope,
                sub_bias = other.bias,
                sub_slope = other.slope,
                "curve: subtraction underflow, saturating at zero"
            );
        }
        Self {
            bias: self.bias.saturating_sub(other.bias),
            slope: self.slope.saturating_sub(other.slope),
        }
    }

    /// Difference `self - older` for a curve that only grew.
    ///
    /// Used for lock mutations, where both bias and slope are non-decreasing.
    pub fn increase_over(&self, older: &DecayCurve) -> Self {
        self.saturating_sub(older)
    }

    /// Remove an expiring slope contribution scheduled at `expiry`.
    ///
    /// Subtracts `expiring_slope * expiry` from the bias and `expiring_slope`
    /// from the slope, both floored at zero.
    pub fn remove_expired(&self, expiring_slope: u128, expiry: u64) -> Self {
        if expiring_slope == 0 {
            return *self;
        }
        let bias_share = expiring_slope.saturating_mul(expiry as u128);
        self.saturating_sub(&DecayCurve {
            bias: bias_share,
            slope: expiring_slope,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // --- value_at ---

    #[test]
    fn value_is_linear_before_expiry() {
        let c = DecayCurve::new(1_000, 10);
        assert_eq!(c.value_at(0), 1_000);
        assert_eq!(c.value_at(50), 500);
        assert_eq!(c.value_at(99), 10);
    }

    #[test]
    fn value_floors_at_zero() {
        let c = DecayCurve::new(1_000, 10);
        assert_eq!(c.value_at(100), 0);
        assert_eq!(c.value_at(10_000), 0);
        assert_eq!(c.value_at(u64::MAX), 0);
    }

    #[test]
    fn zero_curve_is_zero_everywhere() {
        assert_eq!(DecayCurve::ZERO.value_at(0), 0);
        assert!(DecayCurve::ZERO.is_zero());
    }

    // --- from_principal ---

    #[test]
    fn from_principal_truncates_slope() {
        let c = DecayCurve::from_principal(199, 1_000, 100).unwrap();
        assert_eq!(c.slope, 1);
        assert_eq!(c.bias, 1_000);
    }

    #[test]
    fn from_principal_small_total_has_zero_slope() {
        let c = DecayCurve::from_principal(99, 1_000, 100).unwrap();
        assert_eq!(c.slope, 0);
        assert!(c.is_zero());
    }

    #[test]
    fn from_principal_zero_duration_rejected() {
        assert_eq!(
            DecayCurve::from_principal(100, 1_000, 0),
            Err(ArithmeticError::Overflow)
        );
    }

    #[test]
    fn from_principal_bias_overflow() {
        assert_eq!(
            DecayCurve::from_principal(u128::MAX, u64::MAX, 1),
            Err(ArithmeticError::Overflow)
        );
    }

    // --- add / sub ---

    #[test]
    fn add_is_componentwise() {
        let a = DecayCurve::new(100, 1);
        let b = DecayCurve::new(50, 2);
        assert_eq!(a.checked_add(&b).unwrap(), DecayCurve::new(150, 3));
    }

    #[test]
    fn add_overflow_is_reported() {
        let a = DecayCurve::new(u128::MAX, 0);
        assert_eq!(
            a.checked_add(&DecayCurve::new(1, 0)),
            Err(ArithmeticError::Overflow)
        );
    }

    #[test]
    fn sub_saturates() {
        let a = DecayCurve::new(100, 1);
        let b = DecayCurve::new(150, 3);
        assert_eq!(a.saturating_sub(&b), DecayCurve::ZERO);
    }

    #[test]
    fn add_then_sub_restores() {
        let a = DecayCurve::new(1_000, 7);
        let b = DecayCurve::new(300, 2);
        assert_eq!(a.checked_add(&b).unwrap().saturating_sub(&b), a);
    }

    // --- remove_expired ---

    #[test]
    fn remove_expired_drops_exact_contribution() {
        let lock_a = DecayCurve::from_principal(1_000, 100, 10).unwrap();
        let lock_b = DecayCurve::from_principal(2_000, 200, 10).unwrap();
        let sum = lock_a.checked_add(&lock_b).unwrap();
        let after = sum.remove_expired(lock_a.slope, 100);
        assert_eq!(after, lock_b);
    }

    #[test]
    fn remove_expired_zero_slope_is_noop() {
        let c = DecayCurve::new(500, 5);
        assert_eq!(c.remove_expired(0, 1_000), c);
    }

    #[test]
    fn remove_expired_floors_at_zero() {
        let c = DecayCurve::new(10, 1);
        assert_eq!(c.remove_expired(5, 100), DecayCurve::ZERO);
    }

    proptest! {
        #[test]
        fn value_is_monotonically_non_increasing(
            total in 1u128..=1_000_000_000_000u128,
            expiry in 1_000u64..=1_000_000u64,
            t1 in 0u64..=1_000_000u64,
            t2 in 0u64..=1_000_000u64,
        ) {
            let c = DecayCurve::from_principal(total, expiry, 1_000).unwrap();
            let (lo, hi) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
            prop_assert!(c.value_at(lo) >= c.value_at(hi));
            prop_assert_eq!(c.value_at(expiry), 0);
        }

        #[test]
        fn sum_of_values_equals_value_of_sum(
            a_total in 0u128..=1_000_000_000u128,
            b_total in 0u128..=1_000_000_000u128,
            a_exp in 1_000u64..=100_000u64,
            b_exp in 1_000u64..=100_000u64,
            t in 0u64..1_000u64,
        ) {
            let a = DecayCurve::from_principal(a_total, a_exp, 1_000).unwrap();
            let b = DecayCurve::from_principal(b_total, b_exp, 1_000).unwrap();
            let sum = a.checked_add(&b).unwrap();
            prop_assert_eq!(sum.value_at(t), a.value_at(t) + b.value_at(t));
        }

        #[test]
        fn truncation_loss_is_bounded(
            total in 0u128..=u64::MAX as u128,
            max_duration in 1u64..=100_000_000u64,
        ) {
            let c = DecayCurve::from_principal(total, max_duration, max_duration).unwrap();
            let initial = c.value_at(0);
            prop_assert!(initial <= total);
            prop_assert!(total - initial < max_duration as u128);
        }
    }
}
