//! Fixed-point amounts.
//!
//! An [`Amount`] is an unsigned integer paired with a decimal-scale tag.
//! A raw value of `1_500_000` at scale 6 represents `1.5` units. All
//! arithmetic is checked, and combining two amounts with different
//! scales fails fast with [`AmountError::ScaleMismatch`] rather than
//! silently producing a meaningless number.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::MAX_SCALE;

/// Error type for fixed-point amount arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    /// Two amounts with different scales were combined or compared.
    #[error("scale mismatch: expected {expected}, got {actual}")]
    ScaleMismatch {
        /// Scale of the left-hand operand.
        expected: u8,
        /// Scale of the right-hand operand.
        actual: u8,
    },

    /// Arithmetic overflow or underflow.
    #[error("amount arithmetic overflow")]
    Overflow,

    /// Scale exceeds [`MAX_SCALE`].
    #[error("unsupported scale {0} (max {max})", max = MAX_SCALE)]
    UnsupportedScale(u8),
}

/// A fixed-point quantity: raw integer value plus decimal scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    /// Raw integer value (`units * 10^scale`).
    raw: u128,
    /// Number of decimal places.
    scale: u8,
}

/// `10^scale`, or an error if the scale does not fit a `u128`.
pub fn pow10(scale: u8) -> Result<u128, AmountError> {
    if scale > MAX_SCALE {
        return Err(AmountError::UnsupportedScale(scale));
    }
    Ok(10u128.pow(u32::from(scale)))
}

impl Amount {
    /// Create an amount from a raw fixed-point value.
    pub fn from_raw(raw: u128, scale: u8) -> Self {
        Self { raw, scale }
    }

    /// Create an amount from a whole number of units.
    ///
    /// # Errors
    ///
    /// - [`AmountError::UnsupportedScale`] if `scale` exceeds [`MAX_SCALE`]
    /// - [`AmountError::Overflow`] if `units * 10^scale` overflows
    pub fn from_units(units: u128, scale: u8) -> Result<Self, AmountError> {
        let raw = units
            .checked_mul(pow10(scale)?)
            .ok_or(AmountError::Overflow)?;
        Ok(Self { raw, scale })
    }

    /// The zero amount at the given scale.
    pub fn zero(scale: u8) -> Self {
        Self { raw: 0, scale }
    }

    /// Raw fixed-point value.
    pub fn raw(&self) -> u128 {
        self.raw
    }

    /// Decimal scale.
    pub fn scale(&self) -> u8 {
        self.scale
    }

    /// Whether this amount is zero.
    pub fn is_zero(&self) -> bool {
        self.raw == 0
    }

    /// Verify that `other` carries the same scale as `self`.
    ///
    /// # Errors
    ///
    /// - [`AmountError::ScaleMismatch`] if the scales differ
    pub fn ensure_same_scale(&self, other: &Amount) -> Result<(), AmountError> {
        if self.scale != other.scale {
            return Err(AmountError::ScaleMismatch {
                expected: self.scale,
                actual: other.scale,
            });
        }
        Ok(())
    }

    /// Checked addition of two same-scale amounts.
    ///
    /// # Errors
    ///
    /// - [`AmountError::ScaleMismatch`] if the scales differ
    /// - [`AmountError::Overflow`] on overflow
    pub fn checked_add(&self, other: &Amount) -> Result<Amount, AmountError> {
        self.ensure_same_scale(other)?;
        let raw = self
            .raw
            .checked_add(other.raw)
            .ok_or(AmountError::Overflow)?;
        Ok(Amount {
            raw,
            scale: self.scale,
        })
    }

    /// Checked subtraction of two same-scale amounts.
    ///
    /// # Errors
    ///
    /// - [`AmountError::ScaleMismatch`] if the scales differ
    /// - [`AmountError::Overflow`] if the result would be negative
    pub fn checked_sub(&self, other: &Amount) -> Result<Amount, AmountError> {
        self.ensure_same_scale(other)?;
        let raw = self
            .raw
            .checked_sub(other.raw)
            .ok_or(AmountError::Overflow)?;
        Ok(Amount {
            raw,
            scale: self.scale,
        })
    }

    /// Compare two same-scale amounts.
    ///
    /// # Errors
    ///
    /// - [`AmountError::ScaleMismatch`] if the scales differ
    pub fn try_cmp(&self, other: &Amount) -> Result<Ordering, AmountError> {
        self.ensure_same_scale(other)?;
        Ok(self.raw.cmp(&other.raw))
    }

    /// The larger of two same-scale amounts.
    ///
    /// # Errors
    ///
    /// - [`AmountError::ScaleMismatch`] if the scales differ
    pub fn try_max(&self, other: &Amount) -> Result<Amount, AmountError> {
        Ok(match self.try_cmp(other)? {
            Ordering::Less => *other,
            _ => *self,
        })
    }

    /// The smaller of two same-scale amounts.
    ///
    /// # Errors
    ///
    /// - [`AmountError::ScaleMismatch`] if the scales differ
    pub fn try_min(&self, other: &Amount) -> Result<Amount, AmountError> {
        Ok(match self.try_cmp(other)? {
            Ordering::Greater => *other,
            _ => *self,
        })
    }
}

impl fmt::Display for Amount {
    /// Render as a decimal string, e.g. raw `1_500_000` at scale 6 is
    /// `"1.500000"`. Scale 0 renders with no decimal point.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 || self.scale > MAX_SCALE {
            return write!(f, "{}", self.raw);
        }
        let divisor = 10u128.pow(u32::from(self.scale));
        let whole = self.raw / divisor;
        let frac = self.raw % divisor;
        write!(f, "{whole}.{frac:0width$}", width = usize::from(self.scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_units() {
        let a = Amount::from_units(5, 6).expect("from_units");
        assert_eq!(a.raw(), 5_000_000);
        assert_eq!(a.scale(), 6);
    }

    #[test]
    fn test_from_units_overflow() {
        let result = Amount::from_units(u128::MAX, 18);
        assert_eq!(result, Err(AmountError::Overflow));
    }

    #[test]
    fn test_unsupported_scale() {
        let result = Amount::from_units(1, 39);
        assert_eq!(result, Err(AmountError::UnsupportedScale(39)));
    }

    #[test]
    fn test_error_messages_render() {
        assert_eq!(
            AmountError::UnsupportedScale(39).to_string(),
            "unsupported scale 39 (max 38)"
        );
        assert_eq!(
            AmountError::ScaleMismatch {
                expected: 6,
                actual: 18
            }
            .to_string(),
            "scale mismatch: expected 6, got 18"
        );
    }

    #[test]
    fn test_checked_add() {
        let a = Amount::from_raw(100, 6);
        let b = Amount::from_raw(250, 6);
        let sum = a.checked_add(&b).expect("add");
        assert_eq!(sum.raw(), 350);
    }

    #[test]
    fn test_checked_sub_underflow() {
        let a = Amount::from_raw(100, 6);
        let b = Amount::from_raw(250, 6);
        assert_eq!(a.checked_sub(&b), Err(AmountError::Overflow));
    }

    #[test]
    fn test_scale_mismatch_rejected() {
        let points = Amount::from_raw(100, 6);
        let tokens = Amount::from_raw(100, 18);
        assert_eq!(
            points.checked_add(&tokens),
            Err(AmountError::ScaleMismatch {
                expected: 6,
                actual: 18
            })
        );
        assert!(points.try_cmp(&tokens).is_err());
    }

    #[test]
    fn test_try_min_max() {
        let a = Amount::from_raw(100, 18);
        let b = Amount::from_raw(250, 18);
        assert_eq!(a.try_max(&b).expect("max"), b);
        assert_eq!(a.try_min(&b).expect("min"), a);
    }

    #[test]
    fn test_display() {
        let a = Amount::from_raw(1_500_000, 6);
        assert_eq!(a.to_string(), "1.500000");

        let b = Amount::from_raw(42, 0);
        assert_eq!(b.to_string(), "42");

        let c = Amount::from_raw(7, 6);
        assert_eq!(c.to_string(), "0.000007");
    }

    #[test]
    fn test_serde_round_trip() {
        let a = Amount::from_units(1_000_000, 18).expect("from_units");
        let json = serde_json::to_string(&a).expect("serialize");
        let back: Amount = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(a, back);
    }
}
