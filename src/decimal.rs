//! Decimal rebasing between chains with different token precisions
//!
//! Amounts travel as unsigned big integers. The only floating point step is
//! the initial conversion from a user supplied float; everything after that
//! is exact integer arithmetic (with floor division when scaling down).

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

/// An integer token amount expressed at some implicit number of decimals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecimalValue {
    base: BigUint,
}

impl DecimalValue {
    /// Wrap an integer amount already expressed in base units
    pub fn from_base(base: impl Into<BigUint>) -> Self {
        Self { base: base.into() }
    }

    /// Convert a human readable float into base units at `decimals`.
    ///
    /// The fractional remainder below `10^-decimals` is truncated. Negative
    /// and non-finite inputs map to zero.
    pub fn from_float(amount: f64, decimals: u32) -> Self {
        let scaled = amount * 10f64.powi(decimals as i32);
        let base = if scaled.is_finite() && scaled > 0.0 {
            float_to_biguint(scaled.trunc())
        } else {
            BigUint::zero()
        };
        Self { base }
    }

    pub fn base(&self) -> &BigUint {
        &self.base
    }

    /// `base * 10^decimals`
    pub fn map_to(&self, decimals: u32) -> BigUint {
        &self.base * pow10(decimals)
    }

    /// `floor(base / 10^decimals)`
    pub fn map_from(&self, decimals: u32) -> BigUint {
        &self.base / pow10(decimals)
    }

    /// Rebase from `origin_decimals` to `dest_decimals`.
    ///
    /// Scaling up is exact; scaling down floors and drops the low-order
    /// `origin_decimals - dest_decimals` digits.
    pub fn map_through(&self, origin_decimals: u32, dest_decimals: u32) -> BigUint {
        if dest_decimals >= origin_decimals {
            self.map_to(dest_decimals - origin_decimals)
        } else {
            self.map_from(origin_decimals - dest_decimals)
        }
    }

    /// Render base units at `decimals` back into a float.
    ///
    /// Lossy for amounts beyond f64 mantissa precision; only used to feed
    /// the ledger-bound wire format, which carries the amount as f64.
    pub fn to_float(&self, decimals: u32) -> f64 {
        self.base.to_f64().unwrap_or(f64::MAX) / 10f64.powi(decimals as i32)
    }
}

impl From<u64> for DecimalValue {
    fn from(value: u64) -> Self {
        Self::from_base(value)
    }
}

/// One transfer amount seen from both ends of a bridge.
///
/// The float is converted once at the origin precision. The destination
/// amount is that integer rebased, so the two sides always agree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossChainAmount {
    amount: f64,
    pub origin: u32,
    pub destination: u32,
}

impl CrossChainAmount {
    pub fn new(amount: f64, origin: u32, destination: u32) -> Self {
        Self {
            amount,
            origin,
            destination,
        }
    }

    pub fn set(&mut self, amount: f64) {
        self.amount = amount;
    }

    pub fn float(&self) -> f64 {
        self.amount
    }

    /// Base units at the origin chain's decimals.
    pub fn as_origin(&self) -> BigUint {
        DecimalValue::from_float(self.amount, self.origin).base
    }

    /// Base units at the destination chain's decimals.
    pub fn as_destination(&self) -> BigUint {
        DecimalValue::from_float(self.amount, self.origin)
            .map_through(self.origin, self.destination)
    }
}

fn pow10(decimals: u32) -> BigUint {
    num_traits::pow(BigUint::from(10u8), decimals as usize)
}

fn float_to_biguint(value: f64) -> BigUint {
    if value < u128::MAX as f64 {
        BigUint::from(value as u128)
    } else {
        // Beyond u128: peel off the binary exponent and shift.
        let bits = value.to_bits();
        let exponent = ((bits >> 52) & 0x7ff) as i64 - 1075;
        let mantissa = (bits & ((1u64 << 52) - 1)) | (1u64 << 52);
        BigUint::from(mantissa) << (exponent as usize)
    }
}
