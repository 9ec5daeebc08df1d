//! Points-to-token conversion.
//!
//! The conversion rate is never stored: every quote is computed fresh
//! from the current `(available_tokens, unclaimed_points)` pair as
//!
//! ```text
//! tokens = floor(points * available_tokens / unclaimed_points)
//! ```
//!
//! with a full 256-bit intermediate product, so the multiply can never
//! overflow and the divide never loses high bits. Rounding is always
//! down: across any number of small claims, floor rounding can only
//! under-pay by fractions of one raw unit, never over-pay.
//!
//! A zero `unclaimed_points` denominator means there is nothing to
//! distribute against; quotes are zero in that state, which is expected
//! before any points exist, not an error.

use lumen_types::{amount::pow10, Amount};

use crate::{LedgerError, Result};

/// `floor(a * b / d)` with a 256-bit intermediate product.
///
/// # Errors
///
/// - [`LedgerError::Overflow`] if `d == 0` or the quotient exceeds `u128`
pub fn mul_div_floor(a: u128, b: u128, d: u128) -> Result<u128> {
    if d == 0 {
        return Err(LedgerError::Overflow);
    }
    // Fast path: the product fits in 128 bits.
    if let Some(p) = a.checked_mul(b) {
        return Ok(p / d);
    }
    let (hi, lo) = widening_mul(a, b);
    div_256_by_128(hi, lo, d)
}

/// Full 256-bit product of two `u128` values via 64-bit limbs.
fn widening_mul(a: u128, b: u128) -> (u128, u128) {
    const MASK: u128 = (1u128 << 64) - 1;
    let (a1, a0) = (a >> 64, a & MASK);
    let (b1, b0) = (b >> 64, b & MASK);

    let ll = a0 * b0;
    let lh = a0 * b1;
    let hl = a1 * b0;
    let hh = a1 * b1;

    let mid = (ll >> 64) + (lh & MASK) + (hl & MASK);
    let lo = (mid << 64) | (ll & MASK);
    let hi = hh + (lh >> 64) + (hl >> 64) + (mid >> 64);
    (hi, lo)
}

/// Divide the 256-bit value `hi:lo` by `d` via shift-subtract long
/// division, failing if the quotient does not fit in 128 bits.
fn div_256_by_128(hi: u128, lo: u128, d: u128) -> Result<u128> {
    // Quotient bits above position 127 cannot be represented.
    if hi >= d {
        return Err(LedgerError::Overflow);
    }
    let mut rem: u128 = hi;
    let mut quo: u128 = 0;
    for i in (0..128).rev() {
        // rem may exceed 127 bits before subtraction; track the shifted-out bit.
        let carry = rem >> 127;
        rem = (rem << 1) | ((lo >> i) & 1);
        if carry != 0 || rem >= d {
            rem = rem.wrapping_sub(d);
            quo |= 1 << i;
        }
    }
    Ok(quo)
}

/// Quote the tokens paid for `points` against the current pool.
///
/// `points` and `unclaimed_points` must share the point scale; the
/// result carries the scale of `available_tokens`. A zero denominator
/// yields a zero quote.
///
/// # Errors
///
/// - [`LedgerError::ScaleMismatch`] if `points` and `unclaimed_points` differ in scale
/// - [`LedgerError::Overflow`] on arithmetic overflow
pub fn quote_tokens_for_points(
    points: &Amount,
    available_tokens: &Amount,
    unclaimed_points: &Amount,
) -> Result<Amount> {
    points.ensure_same_scale(unclaimed_points)?;
    if unclaimed_points.is_zero() {
        return Ok(Amount::zero(available_tokens.scale()));
    }
    let raw = mul_div_floor(points.raw(), available_tokens.raw(), unclaimed_points.raw())?;
    Ok(Amount::from_raw(raw, available_tokens.scale()))
}

/// Tokens paid per one whole point at the current pool state.
///
/// Zero when no points are outstanding.
///
/// # Errors
///
/// - [`LedgerError::Overflow`] on arithmetic overflow
pub fn token_per_point(available_tokens: &Amount, unclaimed_points: &Amount) -> Result<Amount> {
    if unclaimed_points.is_zero() {
        return Ok(Amount::zero(available_tokens.scale()));
    }
    let one_point = pow10(unclaimed_points.scale())?;
    let raw = mul_div_floor(one_point, available_tokens.raw(), unclaimed_points.raw())?;
    Ok(Amount::from_raw(raw, available_tokens.scale()))
}

/// Points required for one whole token at the current pool state.
///
/// Zero when no tokens are available.
///
/// # Errors
///
/// - [`LedgerError::Overflow`] on arithmetic overflow
pub fn points_per_token(available_tokens: &Amount, unclaimed_points: &Amount) -> Result<Amount> {
    if available_tokens.is_zero() {
        return Ok(Amount::zero(unclaimed_points.scale()));
    }
    let one_token = pow10(available_tokens.scale())?;
    let raw = mul_div_floor(one_token, unclaimed_points.raw(), available_tokens.raw())?;
    Ok(Amount::from_raw(raw, unclaimed_points.scale()))
}
