//! # Conversion Primitives
//!
//! Every share/value conversion in both ledgers goes through [`Pool`], and
//! every multiply-then-divide goes through [`mul_div`]. Nothing else in the
//! crate is allowed to divide.
//!
//! ## Rounding Policy
//!
//! The caller always picks the direction explicitly, and the ledgers pick it
//! so that the pool never pays out more than it took in:
//!
//! | Operation         | Conversion      | Rounding | Who eats the dust |
//! |-------------------|-----------------|----------|-------------------|
//! | deposit / mint    | value -> shares | Down     | depositor         |
//! | vault mint        | shares -> value | Up       | minter            |
//! | withdraw / burn   | value -> shares | Up       | withdrawer        |
//! | redeem            | shares -> value | Down     | redeemer          |
//! | transfer          | value -> shares | Down     | sender's recipient|
//!
//! ## Virtual Offset
//!
//! With an offset of exponent `k`, conversions behave as if the pool held
//! `10^k` extra shares and `1` extra unit of value that nobody owns:
//!
//! ```text
//! shares = value  * (total_shares + 10^k) / (total_value + 1)
//! value  = shares * (total_value + 1)     / (total_shares + 10^k)
//! ```
//!
//! A donation made to inflate the share price is mostly captured by the
//! phantom shares, so the attacker loses more than the victim does.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::config::MAX_OFFSET_EXPONENT;

/// Arithmetic failures. Both are fatal for the operation that hit them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MathError {
    /// The widened product, or the narrowed quotient, does not fit.
    #[error("arithmetic overflow in share conversion")]
    Overflow,

    /// Conversion against a pool whose denominator is zero.
    #[error("division by zero in share conversion")]
    DivisionByZero,
}

/// Rounding direction for a single conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rounding {
    /// Toward zero (floor).
    Down,
    /// Away from zero (ceiling).
    Up,
}

impl fmt::Display for Rounding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rounding::Down => write!(f, "down"),
            Rounding::Up => write!(f, "up"),
        }
    }
}

/// Computes `x * numerator / denominator` with the requested rounding.
///
/// The product is formed in `u128`; the quotient must fit back into `u64`.
///
/// # Errors
///
/// [`MathError::DivisionByZero`] if `denominator == 0`,
/// [`MathError::Overflow`] if the product or the result overflows.
pub fn mul_div(
    x: u64,
    numerator: u128,
    denominator: u128,
    rounding: Rounding,
) -> Result<u64, MathError> {
    if denominator == 0 {
        return Err(MathError::DivisionByZero);
    }

    let product = (x as u128)
        .checked_mul(numerator)
        .ok_or(MathError::Overflow)?;

    let quotient = product / denominator;
    let quotient = match rounding {
        Rounding::Up if product % denominator != 0 => quotient + 1,
        _ => quotient,
    };

    u64::try_from(quotient).map_err(|_| MathError::Overflow)
}

/// A fixed virtual offset, expressed as a power of ten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualOffset {
    exponent: u8,
}

impl VirtualOffset {
    /// Returns `None` when `exponent` exceeds [`MAX_OFFSET_EXPONENT`].
    pub fn new(exponent: u8) -> Option<Self> {
        (exponent <= MAX_OFFSET_EXPONENT).then_some(Self { exponent })
    }

    pub fn exponent(&self) -> u8 {
        self.exponent
    }

    /// `10^exponent` shares that exist only inside conversions.
    pub fn phantom_shares(&self) -> u128 {
        10u128.pow(self.exponent as u32)
    }

    /// The single unit of value paired with the phantom shares.
    pub fn phantom_value(&self) -> u128 {
        1
    }
}

/// A snapshot of the totals a conversion is priced against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    /// Real shares outstanding.
    pub total_shares: u64,
    /// Real pooled value (`total_pooled` or `total_assets`).
    pub total_value: u64,
    /// Virtual offset, if the ledger uses one.
    pub offset: Option<VirtualOffset>,
}

impl Pool {
    /// A pool without virtual offset (rebasing ledger).
    pub fn plain(total_shares: u64, total_value: u64) -> Self {
        Self {
            total_shares,
            total_value,
            offset: None,
        }
    }

    /// A pool with a virtual offset (vault ledger).
    pub fn with_offset(total_shares: u64, total_value: u64, offset: VirtualOffset) -> Self {
        Self {
            total_shares,
            total_value,
            offset: Some(offset),
        }
    }

    /// Converts `value` into shares.
    ///
    /// Without an offset an empty pool (`total_shares == 0`) bootstraps at
    /// 1:1.
    pub fn shares_for(&self, value: u64, rounding: Rounding) -> Result<u64, MathError> {
        if value == 0 {
            return Ok(0);
        }
        match self.offset {
            None if self.total_shares == 0 => Ok(value),
            None => mul_div(
                value,
                self.total_shares as u128,
                self.total_value as u128,
                rounding,
            ),
            Some(offset) => mul_div(
                value,
                self.total_shares as u128 + offset.phantom_shares(),
                self.total_value as u128 + offset.phantom_value(),
                rounding,
            ),
        }
    }

    /// Converts `shares` into value. Inverse of [`shares_for`](Self::shares_for).
    ///
    /// Without an offset an empty pool is worth nothing per share.
    pub fn value_for(&self, shares: u64, rounding: Rounding) -> Result<u64, MathError> {
        if shares == 0 {
            return Ok(0);
        }
        match self.offset {
            None if self.total_shares == 0 => Ok(0),
            None => mul_div(
                shares,
                self.total_value as u128,
                self.total_shares as u128,
                rounding,
            ),
            Some(offset) => mul_div(
                shares,
                self.total_value as u128 + offset.phantom_value(),
                self.total_shares as u128 + offset.phantom_shares(),
                rounding,
            ),
        }
    }
}
