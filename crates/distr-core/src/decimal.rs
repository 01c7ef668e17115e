// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DISTR - DECIMAL LEDGER ARITHMETIC
//
// Unsigned fixed-point decimal with 18 fractional digits.
// Stored as a U256 count of 10^-18 units; products are widened to U512
// before the truncating division so intermediate values never overflow.
// All division and multiplication FLOOR toward zero. Never round.
// No floating-point type touches a Dec.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use primitive_types::{U256, U512};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Add, Sub};
use std::str::FromStr;

use crate::error::{DistrError, Result};

/// Number of fractional decimal digits carried by every Dec.
pub const PRECISION: u32 = 18;

/// 10^18 fits in a u64.
const PRECISION_MULTIPLIER: u64 = 1_000_000_000_000_000_000;

fn precision_multiplier() -> U256 {
    U256::from(PRECISION_MULTIPLIER)
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Dec(U256);

impl Dec {
    pub fn zero() -> Self {
        Dec(U256::zero())
    }

    pub fn one() -> Self {
        Dec(precision_multiplier())
    }

    /// Integer value with no fractional part.
    /// u128::MAX * 10^18 < 2^188, so this cannot overflow.
    pub fn from_int(i: u128) -> Self {
        Dec(U256::from(i) * precision_multiplier())
    }

    /// `i * 10^-prec`, e.g. `new_with_prec(5, 1) == 0.5`.
    pub fn new_with_prec(i: u128, prec: u32) -> Result<Self> {
        if prec > PRECISION {
            return Err(DistrError::InvalidDecimal(format!(
                "precision {} exceeds maximum {}",
                prec, PRECISION
            )));
        }
        let scale = U256::exp10((PRECISION - prec) as usize);
        Ok(Dec(U256::from(i) * scale))
    }

    /// Raw 10^-18 units.
    pub fn raw(&self) -> U256 {
        self.0
    }

    pub fn from_raw(units: U256) -> Self {
        Dec(units)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, other: Dec) -> Option<Dec> {
        self.0.checked_add(other.0).map(Dec)
    }

    /// None if the result would be negative.
    pub fn checked_sub(self, other: Dec) -> Option<Dec> {
        self.0.checked_sub(other.0).map(Dec)
    }

    /// `floor(self * other)` at 18 digits. None only if the result exceeds U256.
    pub fn checked_mul_truncate(self, other: Dec) -> Option<Dec> {
        let product: U512 = self.0.full_mul(other.0);
        let scaled = product / U512::from(precision_multiplier());
        U256::try_from(scaled).ok().map(Dec)
    }

    /// `floor(self / other)` at 18 digits. None on division by zero or overflow.
    pub fn checked_quo_truncate(self, other: Dec) -> Option<Dec> {
        if other.is_zero() {
            return None;
        }
        let numerator: U512 = self.0.full_mul(precision_multiplier());
        let quotient = numerator / U512::from(other.0);
        U256::try_from(quotient).ok().map(Dec)
    }

    /// Panics on overflow. Use `checked_mul_truncate` on fallible paths.
    pub fn mul_truncate(self, other: Dec) -> Dec {
        self.checked_mul_truncate(other)
            .unwrap_or_else(|| panic!("Dec multiplication overflow: {} * {}", self, other))
    }

    /// Panics on division by zero or overflow.
    pub fn quo_truncate(self, other: Dec) -> Dec {
        self.checked_quo_truncate(other)
            .unwrap_or_else(|| panic!("Dec division failed: {} / {}", self, other))
    }

    /// Integer part, discarding the fraction. None if it does not fit in u128.
    pub fn truncate_int(&self) -> Option<u128> {
        let int = self.0 / precision_multiplier();
        if int > U256::from(u128::MAX) {
            None
        } else {
            Some(int.low_u128())
        }
    }

    /// Same value with the fractional part dropped.
    pub fn truncate(&self) -> Dec {
        let int = self.0 / precision_multiplier();
        Dec(int * precision_multiplier())
    }

    pub fn is_integer(&self) -> bool {
        (self.0 % precision_multiplier()).is_zero()
    }
}

impl Add for Dec {
    type Output = Dec;

    fn add(self, rhs: Dec) -> Dec {
        self.checked_add(rhs)
            .unwrap_or_else(|| panic!("Dec addition overflow: {} + {}", self, rhs))
    }
}

impl Sub for Dec {
    type Output = Dec;

    /// A negative Dec is an invariant violation, not a value.
    fn sub(self, rhs: Dec) -> Dec {
        self.checked_sub(rhs)
            .unwrap_or_else(|| panic!("Dec subtraction went negative: {} - {}", self, rhs))
    }
}

impl From<u128> for Dec {
    fn from(i: u128) -> Self {
        Dec::from_int(i)
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pm = precision_multiplier();
        let int = self.0 / pm;
        // remainder < 10^18 always fits in u64
        let frac = (self.0 % pm).low_u64();
        write!(f, "{}.{:018}", int, frac)
    }
}

impl fmt::Debug for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dec({})", self)
    }
}

impl FromStr for Dec {
    type Err = DistrError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = |why: &str| DistrError::InvalidDecimal(format!("{:?}: {}", s, why));

        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => {
                if f.is_empty() {
                    return Err(invalid("missing fractional digits"));
                }
                (i, f)
            }
            None => (s, ""),
        };

        if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("expected unsigned decimal digits"));
        }
        if !frac_part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("expected fractional decimal digits"));
        }
        if frac_part.len() > PRECISION as usize {
            return Err(invalid("more than 18 fractional digits"));
        }

        let int = U256::from_dec_str(int_part).map_err(|_| invalid("integer part overflows"))?;
        let frac: u64 = if frac_part.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac_part, width = PRECISION as usize);
            padded.parse().map_err(|_| invalid("bad fractional part"))?
        };

        int.checked_mul(precision_multiplier())
            .and_then(|v| v.checked_add(U256::from(frac)))
            .map(Dec)
            .ok_or_else(|| DistrError::Overflow(s.to_string()))
    }
}

// Serialized as a string; integers are accepted on input so hand-written
// TOML like `community_tax = 0` still parses.
impl Serialize for Dec {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Dec {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Dec, D::Error> {
        deserialize_str_or_uint(d, "a decimal as a string or unsigned integer")
    }
}

/// Accepts `"12.5"`-style strings and non-negative integers. Shared by Dec
/// and the u128 coin amount adapter, since TOML has neither type.
pub(crate) fn deserialize_str_or_uint<'de, D, T>(
    d: D,
    expecting: &'static str,
) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + From<u128>,
    T::Err: fmt::Display,
{
    struct StrOrUint<T> {
        expecting: &'static str,
        marker: PhantomData<T>,
    }

    impl<'de, T> Visitor<'de> for StrOrUint<T>
    where
        T: FromStr + From<u128>,
        T::Err: fmt::Display,
    {
        type Value = T;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str(self.expecting)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<T, E> {
            v.parse().map_err(E::custom)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<T, E> {
            Ok(T::from(u128::from(v)))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<T, E> {
            u128::try_from(v)
                .map(T::from)
                .map_err(|_| E::custom(format!("negative value {}", v)))
        }
    }

    d.deserialize_any(StrOrUint {
        expecting,
        marker: PhantomData,
    })
}
