// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DISTR - COIN BAGS
//
// Coins:    integer amounts (u128), as held by bank accounts.
// DecCoins: fixed-point amounts, as tracked by the reward tables.
//
// Both are kept normalized: sorted ascending by denom, no duplicate
// denoms, no zero entries. Arithmetic is term-wise; a denom missing
// from one side counts as zero.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::decimal::Dec;
use crate::error::{DistrError, Result};

/// Serde adapter for u128: serialize as string, deserialize from string or integer.
/// TOML has no u128, so amounts round-trip through strings.
mod u128_string {
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(val: &u128, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(val)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u128, D::Error> {
        crate::decimal::deserialize_str_or_uint(d, "a u128 as a string or integer")
    }
}

/// `[a-zA-Z][a-zA-Z0-9/:._-]{2,127}`
pub fn validate_denom(denom: &str) -> Result<()> {
    let bytes = denom.as_bytes();
    let valid = (3..=128).contains(&bytes.len())
        && bytes[0].is_ascii_alphabetic()
        && bytes[1..]
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'/' | b':' | b'.' | b'_' | b'-'));
    if valid {
        Ok(())
    } else {
        Err(DistrError::InvalidCoins(format!("invalid denom: {:?}", denom)))
    }
}

fn check_sorted_unique<'a>(denoms: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut prev: Option<&str> = None;
    for denom in denoms {
        if let Some(p) = prev {
            if p == denom {
                return Err(DistrError::InvalidCoins(format!("duplicate denom: {}", denom)));
            }
        }
        prev = Some(denom);
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────
// Integer coins
// ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    #[serde(with = "u128_string")]
    pub amount: u128,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Coin>", into = "Vec<Coin>")]
pub struct Coins(Vec<Coin>);

impl Coins {
    pub fn empty() -> Self {
        Coins(Vec::new())
    }

    /// Sorts, drops zero amounts, rejects duplicate or malformed denoms.
    pub fn new(mut coins: Vec<Coin>) -> Result<Self> {
        for c in &coins {
            validate_denom(&c.denom)?;
        }
        coins.sort_by(|a, b| a.denom.cmp(&b.denom));
        check_sorted_unique(coins.iter().map(|c| c.denom.as_str()))?;
        coins.retain(|c| c.amount > 0);
        Ok(Coins(coins))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coin> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Normalized bags carry no zero entries, so empty means zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    pub fn amount_of(&self, denom: &str) -> u128 {
        self.0
            .binary_search_by(|c| c.denom.as_str().cmp(denom))
            .map(|i| self.0[i].amount)
            .unwrap_or(0)
    }

    pub fn add(&self, other: &Coins) -> Result<Coins> {
        let mut out = Vec::with_capacity(self.len() + other.len());
        let (mut i, mut j) = (0, 0);
        while i < self.0.len() || j < other.0.len() {
            let ord = match (self.0.get(i), other.0.get(j)) {
                (Some(a), Some(b)) => a.denom.cmp(&b.denom),
                (Some(_), None) => Ordering::Less,
                _ => Ordering::Greater,
            };
            match ord {
                Ordering::Less => {
                    out.push(self.0[i].clone());
                    i += 1;
                }
                Ordering::Greater => {
                    out.push(other.0[j].clone());
                    j += 1;
                }
                Ordering::Equal => {
                    let a = &self.0[i];
                    let amount = a.amount.checked_add(other.0[j].amount).ok_or_else(|| {
                        DistrError::Overflow(format!("coin addition overflow in {}", a.denom))
                    })?;
                    out.push(Coin::new(a.denom.clone(), amount));
                    i += 1;
                    j += 1;
                }
            }
        }
        Ok(Coins(out))
    }

    /// None if any denom would go negative.
    pub fn checked_sub(&self, other: &Coins) -> Option<Coins> {
        let mut out = Vec::with_capacity(self.len());
        for c in &self.0 {
            let amount = c.amount.checked_sub(other.amount_of(&c.denom))?;
            if amount > 0 {
                out.push(Coin::new(c.denom.clone(), amount));
            }
        }
        // a denom only in `other` is a negative result
        if other.iter().any(|c| self.amount_of(&c.denom) == 0) {
            return None;
        }
        Some(Coins(out))
    }

    pub fn is_all_gte(&self, other: &Coins) -> bool {
        other.iter().all(|c| self.amount_of(&c.denom) >= c.amount)
    }
}

impl TryFrom<Vec<Coin>> for Coins {
    type Error = DistrError;

    fn try_from(coins: Vec<Coin>) -> Result<Self> {
        Coins::new(coins)
    }
}

impl From<Coins> for Vec<Coin> {
    fn from(coins: Coins) -> Self {
        coins.0
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|c| c.to_string()).collect();
        f.write_str(&parts.join(","))
    }
}

// ─────────────────────────────────────────────────────────────────
// Decimal coins
// ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecCoin {
    pub denom: String,
    pub amount: Dec,
}

impl DecCoin {
    pub fn new(denom: impl Into<String>, amount: Dec) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

impl fmt::Display for DecCoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DecCoin>", into = "Vec<DecCoin>")]
pub struct DecCoins(Vec<DecCoin>);

impl DecCoins {
    pub fn empty() -> Self {
        DecCoins(Vec::new())
    }

    /// Sorts, drops zero amounts, rejects duplicate or malformed denoms.
    pub fn new(mut coins: Vec<DecCoin>) -> Result<Self> {
        for c in &coins {
            validate_denom(&c.denom)?;
        }
        coins.sort_by(|a, b| a.denom.cmp(&b.denom));
        check_sorted_unique(coins.iter().map(|c| c.denom.as_str()))?;
        coins.retain(|c| !c.amount.is_zero());
        Ok(DecCoins(coins))
    }

    /// Single-denom bag, convenient for tests and scenarios.
    pub fn single(denom: &str, amount: Dec) -> Result<Self> {
        DecCoins::new(vec![DecCoin::new(denom, amount)])
    }

    /// Coins are already normalized, so the conversion cannot fail.
    pub fn from_coins(coins: &Coins) -> Self {
        DecCoins(
            coins
                .iter()
                .map(|c| DecCoin::new(c.denom.clone(), Dec::from_int(c.amount)))
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = &DecCoin> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    pub fn amount_of(&self, denom: &str) -> Dec {
        self.0
            .binary_search_by(|c| c.denom.as_str().cmp(denom))
            .map(|i| self.0[i].amount)
            .unwrap_or_default()
    }

    /// Sorted, unique, valid denoms and strictly positive amounts.
    pub fn is_valid(&self) -> bool {
        self.0.iter().all(|c| validate_denom(&c.denom).is_ok() && !c.amount.is_zero())
            && self.0.windows(2).all(|w| w[0].denom < w[1].denom)
    }

    pub fn add(&self, other: &DecCoins) -> Result<DecCoins> {
        let mut out = Vec::with_capacity(self.len() + other.len());
        let (mut i, mut j) = (0, 0);
        while i < self.0.len() || j < other.0.len() {
            let ord = match (self.0.get(i), other.0.get(j)) {
                (Some(a), Some(b)) => a.denom.cmp(&b.denom),
                (Some(_), None) => Ordering::Less,
                _ => Ordering::Greater,
            };
            match ord {
                Ordering::Less => {
                    out.push(self.0[i].clone());
                    i += 1;
                }
                Ordering::Greater => {
                    out.push(other.0[j].clone());
                    j += 1;
                }
                Ordering::Equal => {
                    let a = &self.0[i];
                    let amount = a.amount.checked_add(other.0[j].amount).ok_or_else(|| {
                        DistrError::Overflow(format!("dec coin addition overflow in {}", a.denom))
                    })?;
                    out.push(DecCoin::new(a.denom.clone(), amount));
                    i += 1;
                    j += 1;
                }
            }
        }
        Ok(DecCoins(out))
    }

    /// None if any denom would go negative.
    pub fn checked_sub(&self, other: &DecCoins) -> Option<DecCoins> {
        if other.iter().any(|c| self.amount_of(&c.denom).is_zero()) {
            return None;
        }
        let mut out = Vec::with_capacity(self.len());
        for c in &self.0 {
            let amount = c.amount.checked_sub(other.amount_of(&c.denom))?;
            if !amount.is_zero() {
                out.push(DecCoin::new(c.denom.clone(), amount));
            }
        }
        Some(DecCoins(out))
    }

    /// `checked_sub` that reports the offending operands.
    pub fn sub(&self, other: &DecCoins) -> Result<DecCoins> {
        self.checked_sub(other)
            .ok_or_else(|| DistrError::NegativeAmount(format!("{} - {}", self, other)))
    }

    /// Term-wise `floor(amount * d)`; entries that truncate to zero are dropped.
    pub fn mul_dec_truncate(&self, d: Dec) -> Result<DecCoins> {
        let mut out = Vec::with_capacity(self.len());
        for c in &self.0 {
            let amount = c.amount.checked_mul_truncate(d).ok_or_else(|| {
                DistrError::Overflow(format!("{} * {}", c, d))
            })?;
            if !amount.is_zero() {
                out.push(DecCoin::new(c.denom.clone(), amount));
            }
        }
        Ok(DecCoins(out))
    }

    /// Term-wise `floor(amount / d)`.
    pub fn quo_dec_truncate(&self, d: Dec) -> Result<DecCoins> {
        if d.is_zero() {
            return Err(DistrError::InvalidDecimal("division by zero".to_string()));
        }
        let mut out = Vec::with_capacity(self.len());
        for c in &self.0 {
            let amount = c.amount.checked_quo_truncate(d).ok_or_else(|| {
                DistrError::Overflow(format!("{} / {}", c, d))
            })?;
            if !amount.is_zero() {
                out.push(DecCoin::new(c.denom.clone(), amount));
            }
        }
        Ok(DecCoins(out))
    }

    /// Splits into whole coins and the leftover fractional change.
    pub fn truncate_decimal(&self) -> Result<(Coins, DecCoins)> {
        let mut whole = Vec::new();
        let mut change = Vec::new();
        for c in &self.0 {
            let int = c.amount.truncate_int().ok_or_else(|| {
                DistrError::Overflow(format!("{} does not fit in an integer coin", c))
            })?;
            if int > 0 {
                whole.push(Coin::new(c.denom.clone(), int));
            }
            let frac = c.amount - c.amount.truncate();
            if !frac.is_zero() {
                change.push(DecCoin::new(c.denom.clone(), frac));
            }
        }
        Ok((Coins(whole), DecCoins(change)))
    }

    /// Every denom of `self` is covered by `other`.
    pub fn is_all_lte(&self, other: &DecCoins) -> bool {
        self.0.iter().all(|c| c.amount <= other.amount_of(&c.denom))
    }
}

impl TryFrom<Vec<DecCoin>> for DecCoins {
    type Error = DistrError;

    fn try_from(coins: Vec<DecCoin>) -> Result<Self> {
        DecCoins::new(coins)
    }
}

impl From<DecCoins> for Vec<DecCoin> {
    fn from(coins: DecCoins) -> Self {
        coins.0
    }
}

impl fmt::Display for DecCoins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|c| c.to_string()).collect();
        f.write_str(&parts.join(","))
    }
}
