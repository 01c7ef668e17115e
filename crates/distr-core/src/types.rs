// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DISTR - REWARD RECORDS & IDENTITIES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::coins::DecCoins;
use crate::decimal::Dec;
use crate::error::{DistrError, Result};

/// Validator operator address. Stable for the validator's registered lifetime.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ValAddress(String);

impl ValAddress {
    pub fn new(addr: impl Into<String>) -> Self {
        ValAddress(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for ValAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Consensus address (derived from the validator's consensus public key).
/// Serialized as lowercase hex.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConsAddress(Vec<u8>);

impl ConsAddress {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        ConsAddress(bytes.into())
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        hex::decode(s)
            .map(ConsAddress)
            .map_err(|e| DistrError::Config(format!("invalid consensus address {:?}: {}", s, e)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<String> for ConsAddress {
    type Error = DistrError;

    fn try_from(s: String) -> Result<Self> {
        ConsAddress::from_hex(&s)
    }
}

impl From<ConsAddress> for String {
    fn from(addr: ConsAddress) -> Self {
        hex::encode(addr.0)
    }
}

impl fmt::Display for ConsAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl fmt::Debug for ConsAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConsAddress({})", self)
    }
}

/// The fields of a registered validator the allocation step reads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub operator: ValAddress,
    pub cons_address: ConsAddress,
    /// Fraction in [0, 1] retained by the operator before delegators share.
    pub commission_rate: Dec,
}

/// One signer of the previous block, as reported by consensus.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteInfo {
    pub address: ConsAddress,
    pub power: u64,
}

impl VoteInfo {
    pub fn new(address: ConsAddress, power: u64) -> Self {
        Self { address, power }
    }
}

/// Commission + shared rewards owed to a validator and not yet withdrawn.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorOutstandingRewards {
    pub rewards: DecCoins,
}

/// Commission-only portion owed to the operator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorAccumulatedCommission {
    pub commission: DecCoins,
}

/// Shared rewards accrued in the current period. `period` is advanced by
/// the withdrawal side only; allocation never touches it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorCurrentRewards {
    pub rewards: DecCoins,
    pub period: u64,
}

/// Tokens not attributed to any validator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePool {
    pub community_pool: DecCoins,
}

impl FeePool {
    pub fn initial() -> Self {
        Self::default()
    }
}

/// What a single `allocate_tokens_to_validator` call recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorAllocation {
    pub validator: ValAddress,
    pub tokens: DecCoins,
    pub commission: DecCoins,
    pub shared: DecCoins,
}

/// What a single `allocate_tokens` call did.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationSummary {
    pub fees_collected: DecCoins,
    pub allocations: Vec<ValidatorAllocation>,
    /// Voters whose consensus address no longer resolves to a validator.
    pub skipped: Vec<ConsAddress>,
    pub community_pool_delta: DecCoins,
}

impl AllocationSummary {
    /// Sum of every validator's allocation.
    pub fn total_allocated(&self) -> Result<DecCoins> {
        self.allocations
            .iter()
            .try_fold(DecCoins::empty(), |acc, a| acc.add(&a.tokens))
    }
}
