//! Amount arithmetic: 18-decimal base units and roundoff tolerance.
//!
//! Simulation balances are `f64` decimals. Settlement ledgers count integer
//! base units, `10^18` per whole token. Conversions start from the shortest
//! decimal representation of the float, so `2.4` becomes exactly
//! `2_400_000_000_000_000_000` base units rather than the binary expansion
//! of the nearest double.
//!
//! The whole and fractional parts are scaled separately and combined with
//! checked `i128` arithmetic, so the range is bounded by the integer type
//! (about `1.7e20` tokens) rather than by [`Decimal`]'s 96-bit mantissa.
//!
//! Conversion to base units truncates toward zero. For any amount with at
//! most 18 fractional digits the round trip is exact.

use core::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Number of fractional digits in a base-unit amount.
pub const DECIMALS: u32 = 18;

/// Base units in one whole token (`10^DECIMALS`).
pub const BASE_UNITS_PER_TOKEN: u64 = 1_000_000_000_000_000_000;

/// Default roundoff tolerance for balance comparisons.
pub const DEFAULT_TOLERANCE_EPSILON: f64 = 1e-12;

/// Errors from amount conversion and validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AmountError {
    /// NaN or infinite input.
    #[error("amount is not finite: {amount}")]
    NotFinite {
        /// The rejected amount.
        amount: f64,
    },

    /// A negative amount where the caller requires a non-negative one.
    #[error("amount must be non-negative, got {amount}")]
    Negative {
        /// The rejected amount.
        amount: f64,
    },

    /// The amount does not fit the fixed-point representation.
    #[error("amount out of range for {DECIMALS}-decimal base units: {amount}")]
    OutOfRange {
        /// The rejected amount, rendered as text.
        amount: String,
    },
}

/// Convert a decimal amount to signed base units, truncating toward zero.
pub fn to_base_units(amount: f64) -> Result<i128, AmountError> {
    if !amount.is_finite() {
        return Err(AmountError::NotFinite { amount });
    }

    let out_of_range = || AmountError::OutOfRange {
        amount: amount.to_string(),
    };

    // `Display` for f64 yields the shortest string that parses back to the
    // same float, never in exponent form. Digits past Decimal's 28-digit
    // scale are rounded away, far below the 18th decimal.
    let decimal = Decimal::from_str(&amount.to_string()).map_err(|_err| out_of_range())?;

    let whole = decimal.trunc().to_i128().ok_or_else(out_of_range)?;
    // |fract| < 1, so the scaled fraction stays below 10^18.
    let fraction = decimal
        .fract()
        .checked_mul(Decimal::from(BASE_UNITS_PER_TOKEN))
        .and_then(|scaled| scaled.trunc().to_i128())
        .ok_or_else(out_of_range)?;

    whole
        .checked_mul(i128::from(BASE_UNITS_PER_TOKEN))
        .and_then(|scaled| scaled.checked_add(fraction))
        .ok_or_else(out_of_range)
}

/// Convert a decimal amount to unsigned base units.
///
/// Negative-epsilon roundoff is the caller's to clean up: any amount below
/// zero is rejected with [`AmountError::Negative`].
pub fn to_base_units_unsigned(amount: f64) -> Result<u128, AmountError> {
    if amount < 0.0 {
        return Err(AmountError::Negative { amount });
    }
    let signed = to_base_units(amount)?;
    u128::try_from(signed).map_err(|_err| AmountError::Negative { amount })
}

/// Convert signed base units back to a decimal amount.
pub fn from_base_units(base: i128) -> Result<f64, AmountError> {
    render_base_units(base < 0, base.unsigned_abs())
}

/// Convert unsigned base units back to a decimal amount.
pub fn from_base_units_unsigned(base: u128) -> Result<f64, AmountError> {
    render_base_units(false, base)
}

/// Render `magnitude` base units as exact decimal text and parse it.
///
/// The float parser rounds once, to the nearest double.
fn render_base_units(negative: bool, magnitude: u128) -> Result<f64, AmountError> {
    let out_of_range = || AmountError::OutOfRange {
        amount: format!("{magnitude} base units"),
    };

    let per_token = u128::from(BASE_UNITS_PER_TOKEN);
    let whole = magnitude.checked_div(per_token).ok_or_else(out_of_range)?;
    let fraction = magnitude.checked_rem(per_token).ok_or_else(out_of_range)?;
    let sign = if negative { "-" } else { "" };

    format!("{sign}{whole}.{fraction:018}")
        .parse::<f64>()
        .map_err(|_err| out_of_range())
}

// ---------------------------------------------------------------------------
// Tolerance
// ---------------------------------------------------------------------------

/// Floating-point roundoff tolerance for balance comparisons.
///
/// The slack granted around a reference value is `epsilon * max(|ref|, 1)`:
/// relative for balances above one unit, absolute below. With the default
/// `epsilon = 1e-12` a withdrawal of `2.4000000000000004` against a balance
/// of `2.4` is within tolerance, while `2.4000001` is not.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    epsilon: f64,
}

impl Tolerance {
    /// Create a tolerance with the given epsilon.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError::NotFinite`] or [`AmountError::Negative`] if
    /// `epsilon` is not a finite, non-negative number.
    pub const fn new(epsilon: f64) -> Result<Self, AmountError> {
        if !epsilon.is_finite() {
            return Err(AmountError::NotFinite { amount: epsilon });
        }
        if epsilon < 0.0 {
            return Err(AmountError::Negative { amount: epsilon });
        }
        Ok(Self { epsilon })
    }

    /// Return the configured epsilon.
    pub const fn epsilon(self) -> f64 {
        self.epsilon
    }

    /// Slack granted around `reference`.
    pub const fn slack(self, reference: f64) -> f64 {
        self.epsilon * reference.abs().max(1.0)
    }

    /// Whether `value` is indistinguishable from zero.
    pub const fn is_zero(self, value: f64) -> bool {
        value.abs() <= self.epsilon
    }

    /// Whether `a` and `b` are equal within tolerance.
    pub const fn approx_eq(self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.slack(a.abs().max(b.abs()))
    }

    /// Validate an amount that must be non-negative.
    ///
    /// Negative roundoff no larger than epsilon (e.g. `-4e-16`) is cleaned
    /// to `0.0`.
    pub const fn sanitize(self, amount: f64) -> Result<f64, AmountError> {
        if !amount.is_finite() {
            return Err(AmountError::NotFinite { amount });
        }
        if amount < 0.0 {
            if -amount <= self.epsilon {
                return Ok(0.0);
            }
            return Err(AmountError::Negative { amount });
        }
        Ok(amount)
    }

    /// Fit a withdrawal request to an available balance.
    ///
    /// Returns the amount to actually debit: the request itself when it
    /// fits, the whole balance when the request exceeds it by no more than
    /// the slack, and `None` when the balance is genuinely insufficient.
    pub const fn fit_to_balance(self, requested: f64, balance: f64) -> Option<f64> {
        if requested <= balance {
            return Some(requested);
        }
        if requested - balance <= self.slack(balance) {
            return Some(balance);
        }
        None
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_TOLERANCE_EPSILON,
        }
    }
}
