//! # Numeric Helpers
//!
//! Checked integer arithmetic raising arithmetic traps, and bit-exact
//! floating-point inspection through `f64::to_bits`. Results are identical on
//! every platform.

use crate::errors::Fault;

const MANTISSA_BITS: u32 = 52;
const EXPONENT_MASK: u64 = 0x7FF;
const MANTISSA_MASK: u64 = (1 << MANTISSA_BITS) - 1;
const EXPONENT_BIAS: i32 = 1023;

/// Division raising `DivideByZero` and `ArithmeticOverflow` traps.
///
/// # Errors
///
/// `DivideByZero` if `divisor` is zero, `ArithmeticOverflow` for
/// `i64::MIN / -1`.
pub fn checked_div(dividend: i64, divisor: i64) -> Result<i64, Fault> {
    if divisor == 0 {
        return Err(Fault::DivideByZero);
    }
    dividend.checked_div(divisor).ok_or(Fault::ArithmeticOverflow)
}

/// Remainder raising the same traps as [`checked_div`].
///
/// # Errors
///
/// `DivideByZero` if `divisor` is zero, `ArithmeticOverflow` for
/// `i64::MIN % -1`.
pub fn checked_rem(dividend: i64, divisor: i64) -> Result<i64, Fault> {
    if divisor == 0 {
        return Err(Fault::DivideByZero);
    }
    dividend.checked_rem(divisor).ok_or(Fault::ArithmeticOverflow)
}

/// Unbiased binary exponent of a normal `f64`.
///
/// `None` for zero, subnormals, infinities and NaN.
#[must_use]
pub fn exponent(value: f64) -> Option<i32> {
    let raw = ((value.to_bits() >> MANTISSA_BITS) & EXPONENT_MASK) as i32;
    match raw {
        0 | 0x7FF => None,
        raw => Some(raw - EXPONENT_BIAS),
    }
}

/// Mantissa (with implicit bit) and power-of-two scale such that
/// `|value| == mantissa * 2^scale`. `None` for infinities and NaN.
fn decompose(value: f64) -> Option<(u64, i32)> {
    let bits = value.to_bits();
    let raw_exp = ((bits >> MANTISSA_BITS) & EXPONENT_MASK) as i32;
    let fraction = bits & MANTISSA_MASK;
    match raw_exp {
        0x7FF => None,
        // Subnormal: no implicit bit, fixed exponent
        0 => Some((fraction, 1 - EXPONENT_BIAS - MANTISSA_BITS as i32)),
        _ => Some((
            fraction | (1 << MANTISSA_BITS),
            raw_exp - EXPONENT_BIAS - MANTISSA_BITS as i32,
        )),
    }
}

/// Number of binary fraction digits needed to represent `value` exactly.
///
/// `None` for infinities and NaN.
#[must_use]
pub fn fractional_bits(value: f64) -> Option<u32> {
    let (mantissa, scale) = decompose(value)?;
    if mantissa == 0 {
        return Some(0);
    }
    let scale = scale + mantissa.trailing_zeros() as i32;
    Some(if scale >= 0 { 0 } else { scale.unsigned_abs() })
}

/// Whether `value` has at most `max_bits` binary fraction digits.
#[must_use]
pub fn fits_precision(value: f64, max_bits: u32) -> bool {
    fractional_bits(value).is_some_and(|bits| bits <= max_bits)
}

/// Exact conversion of `value * 2^scale_bits` to `i64`.
///
/// # Errors
///
/// `PrecisionLoss` if the product is not an integer or `value` is NaN,
/// `ArithmeticOverflow` if it does not fit in `i64` or `value` is infinite.
pub fn to_fixed(value: f64, scale_bits: u32) -> Result<i64, Fault> {
    if value.is_nan() {
        return Err(Fault::PrecisionLoss("NaN".to_string()));
    }
    let (mantissa, scale) = decompose(value).ok_or(Fault::ArithmeticOverflow)?;
    if mantissa == 0 {
        return Ok(0);
    }

    let shift = scale + scale_bits as i32;
    let magnitude: u128 = if shift >= 0 {
        if shift > 64 {
            return Err(Fault::ArithmeticOverflow);
        }
        u128::from(mantissa) << shift
    } else {
        let drop = shift.unsigned_abs();
        if drop >= 64 || mantissa & ((1u64 << drop) - 1) != 0 {
            return Err(Fault::PrecisionLoss(format!(
                "{value} needs more than {scale_bits} fraction bits"
            )));
        }
        u128::from(mantissa >> drop)
    };

    let negative = value.is_sign_negative();
    let limit: u128 = if negative { 1 << 63 } else { (1 << 63) - 1 };
    if magnitude > limit {
        return Err(Fault::ArithmeticOverflow);
    }
    let signed = magnitude as i128;
    Ok((if negative { -signed } else { signed }) as i64)
}
