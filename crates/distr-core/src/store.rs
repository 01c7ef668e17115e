// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DISTR - REWARD STATE STORE
//
// Four tables: outstanding rewards, accumulated commission and current
// rewards (keyed by validator operator), plus the singleton fee pool.
//
// Reads of an unset key return the zero value, never an error.
// Writes replace the stored value; "increment" is get + add + set done by
// the caller. That is only safe because a block is processed by a single
// writer. Parallel allocation across validators would need per-key
// locking or disjoint shards.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use sha3::{Digest, Sha3_256};
use std::collections::BTreeMap;

use crate::coins::DecCoins;
use crate::error::Result;
use crate::types::{
    FeePool, ValAddress, ValidatorAccumulatedCommission, ValidatorCurrentRewards,
    ValidatorOutstandingRewards,
};

pub trait RewardStore {
    fn get_outstanding_rewards(&self, val: &ValAddress) -> Result<ValidatorOutstandingRewards>;
    fn set_outstanding_rewards(
        &mut self,
        val: &ValAddress,
        rewards: &ValidatorOutstandingRewards,
    ) -> Result<()>;

    fn get_accumulated_commission(
        &self,
        val: &ValAddress,
    ) -> Result<ValidatorAccumulatedCommission>;
    fn set_accumulated_commission(
        &mut self,
        val: &ValAddress,
        commission: &ValidatorAccumulatedCommission,
    ) -> Result<()>;

    fn get_current_rewards(&self, val: &ValAddress) -> Result<ValidatorCurrentRewards>;
    fn set_current_rewards(
        &mut self,
        val: &ValAddress,
        rewards: &ValidatorCurrentRewards,
    ) -> Result<()>;

    fn get_fee_pool(&self) -> Result<FeePool>;
    fn set_fee_pool(&mut self, pool: &FeePool) -> Result<()>;

    /// Every stored entry, ascending by validator address.
    fn all_outstanding_rewards(&self) -> Result<Vec<(ValAddress, ValidatorOutstandingRewards)>>;
    fn all_accumulated_commissions(
        &self,
    ) -> Result<Vec<(ValAddress, ValidatorAccumulatedCommission)>>;
    fn all_current_rewards(&self) -> Result<Vec<(ValAddress, ValidatorCurrentRewards)>>;

    /// Apply a batch of writes. Backends with transactions override this
    /// to make the batch all-or-nothing.
    fn commit(&mut self, batch: StoreBatch) -> Result<()> {
        for (val, rewards) in &batch.outstanding {
            self.set_outstanding_rewards(val, rewards)?;
        }
        for (val, commission) in &batch.commission {
            self.set_accumulated_commission(val, commission)?;
        }
        for (val, rewards) in &batch.current {
            self.set_current_rewards(val, rewards)?;
        }
        if let Some(pool) = &batch.fee_pool {
            self.set_fee_pool(pool)?;
        }
        Ok(())
    }
}

/// Pending writes, one slot per key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreBatch {
    pub outstanding: BTreeMap<ValAddress, ValidatorOutstandingRewards>,
    pub commission: BTreeMap<ValAddress, ValidatorAccumulatedCommission>,
    pub current: BTreeMap<ValAddress, ValidatorCurrentRewards>,
    pub fee_pool: Option<FeePool>,
}

impl StoreBatch {
    pub fn is_empty(&self) -> bool {
        self.outstanding.is_empty()
            && self.commission.is_empty()
            && self.current.is_empty()
            && self.fee_pool.is_none()
    }

    pub fn len(&self) -> usize {
        self.outstanding.len()
            + self.commission.len()
            + self.current.len()
            + usize::from(self.fee_pool.is_some())
    }
}

// ─────────────────────────────────────────────────────────────────
// In-memory store
// ─────────────────────────────────────────────────────────────────

/// BTreeMap tables: deterministic iteration, no I/O failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    outstanding: BTreeMap<ValAddress, ValidatorOutstandingRewards>,
    commission: BTreeMap<ValAddress, ValidatorAccumulatedCommission>,
    current: BTreeMap<ValAddress, ValidatorCurrentRewards>,
    fee_pool: Option<FeePool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RewardStore for MemoryStore {
    fn get_outstanding_rewards(&self, val: &ValAddress) -> Result<ValidatorOutstandingRewards> {
        Ok(self.outstanding.get(val).cloned().unwrap_or_default())
    }

    fn set_outstanding_rewards(
        &mut self,
        val: &ValAddress,
        rewards: &ValidatorOutstandingRewards,
    ) -> Result<()> {
        self.outstanding.insert(val.clone(), rewards.clone());
        Ok(())
    }

    fn get_accumulated_commission(
        &self,
        val: &ValAddress,
    ) -> Result<ValidatorAccumulatedCommission> {
        Ok(self.commission.get(val).cloned().unwrap_or_default())
    }

    fn set_accumulated_commission(
        &mut self,
        val: &ValAddress,
        commission: &ValidatorAccumulatedCommission,
    ) -> Result<()> {
        self.commission.insert(val.clone(), commission.clone());
        Ok(())
    }

    fn get_current_rewards(&self, val: &ValAddress) -> Result<ValidatorCurrentRewards> {
        Ok(self.current.get(val).cloned().unwrap_or_default())
    }

    fn set_current_rewards(
        &mut self,
        val: &ValAddress,
        rewards: &ValidatorCurrentRewards,
    ) -> Result<()> {
        self.current.insert(val.clone(), rewards.clone());
        Ok(())
    }

    fn get_fee_pool(&self) -> Result<FeePool> {
        Ok(self.fee_pool.clone().unwrap_or_default())
    }

    fn set_fee_pool(&mut self, pool: &FeePool) -> Result<()> {
        self.fee_pool = Some(pool.clone());
        Ok(())
    }

    fn all_outstanding_rewards(&self) -> Result<Vec<(ValAddress, ValidatorOutstandingRewards)>> {
        Ok(self
            .outstanding
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn all_accumulated_commissions(
        &self,
    ) -> Result<Vec<(ValAddress, ValidatorAccumulatedCommission)>> {
        Ok(self
            .commission
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn all_current_rewards(&self) -> Result<Vec<(ValAddress, ValidatorCurrentRewards)>> {
        Ok(self
            .current
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

// ─────────────────────────────────────────────────────────────────
// Write-buffered overlay
// ─────────────────────────────────────────────────────────────────

/// Staged view over a parent store. Reads see pending writes first;
/// `write()` commits everything at once, `discard()` throws it away.
/// A block that fails mid-allocation is discarded, never half-applied.
#[derive(Debug)]
pub struct CacheStore<S: RewardStore> {
    parent: S,
    pending: StoreBatch,
}

impl<S: RewardStore> CacheStore<S> {
    pub fn new(parent: S) -> Self {
        Self {
            parent,
            pending: StoreBatch::default(),
        }
    }

    pub fn pending(&self) -> &StoreBatch {
        &self.pending
    }

    /// Commit buffered writes to the parent.
    pub fn write(&mut self) -> Result<()> {
        let batch = std::mem::take(&mut self.pending);
        if batch.is_empty() {
            return Ok(());
        }
        self.parent.commit(batch)
    }

    pub fn discard(&mut self) {
        self.pending = StoreBatch::default();
    }

    pub fn parent(&self) -> &S {
        &self.parent
    }

    /// Drop pending writes and hand back the parent.
    pub fn into_inner(self) -> S {
        self.parent
    }
}

/// Parent entries overlaid with pending ones, ascending by key.
fn overlay<T: Clone>(
    base: Vec<(ValAddress, T)>,
    pending: &BTreeMap<ValAddress, T>,
) -> Vec<(ValAddress, T)> {
    let mut merged: BTreeMap<ValAddress, T> = base.into_iter().collect();
    for (k, v) in pending {
        merged.insert(k.clone(), v.clone());
    }
    merged.into_iter().collect()
}

impl<S: RewardStore> RewardStore for CacheStore<S> {
    fn get_outstanding_rewards(&self, val: &ValAddress) -> Result<ValidatorOutstandingRewards> {
        match self.pending.outstanding.get(val) {
            Some(v) => Ok(v.clone()),
            None => self.parent.get_outstanding_rewards(val),
        }
    }

    fn set_outstanding_rewards(
        &mut self,
        val: &ValAddress,
        rewards: &ValidatorOutstandingRewards,
    ) -> Result<()> {
        self.pending.outstanding.insert(val.clone(), rewards.clone());
        Ok(())
    }

    fn get_accumulated_commission(
        &self,
        val: &ValAddress,
    ) -> Result<ValidatorAccumulatedCommission> {
        match self.pending.commission.get(val) {
            Some(v) => Ok(v.clone()),
            None => self.parent.get_accumulated_commission(val),
        }
    }

    fn set_accumulated_commission(
        &mut self,
        val: &ValAddress,
        commission: &ValidatorAccumulatedCommission,
    ) -> Result<()> {
        self.pending.commission.insert(val.clone(), commission.clone());
        Ok(())
    }

    fn get_current_rewards(&self, val: &ValAddress) -> Result<ValidatorCurrentRewards> {
        match self.pending.current.get(val) {
            Some(v) => Ok(v.clone()),
            None => self.parent.get_current_rewards(val),
        }
    }

    fn set_current_rewards(
        &mut self,
        val: &ValAddress,
        rewards: &ValidatorCurrentRewards,
    ) -> Result<()> {
        self.pending.current.insert(val.clone(), rewards.clone());
        Ok(())
    }

    fn get_fee_pool(&self) -> Result<FeePool> {
        match &self.pending.fee_pool {
            Some(pool) => Ok(pool.clone()),
            None => self.parent.get_fee_pool(),
        }
    }

    fn set_fee_pool(&mut self, pool: &FeePool) -> Result<()> {
        self.pending.fee_pool = Some(pool.clone());
        Ok(())
    }

    fn all_outstanding_rewards(&self) -> Result<Vec<(ValAddress, ValidatorOutstandingRewards)>> {
        Ok(overlay(
            self.parent.all_outstanding_rewards()?,
            &self.pending.outstanding,
        ))
    }

    fn all_accumulated_commissions(
        &self,
    ) -> Result<Vec<(ValAddress, ValidatorAccumulatedCommission)>> {
        Ok(overlay(
            self.parent.all_accumulated_commissions()?,
            &self.pending.commission,
        ))
    }

    fn all_current_rewards(&self) -> Result<Vec<(ValAddress, ValidatorCurrentRewards)>> {
        Ok(overlay(
            self.parent.all_current_rewards()?,
            &self.pending.current,
        ))
    }
}

// ─────────────────────────────────────────────────────────────────
// State root
// ─────────────────────────────────────────────────────────────────

fn hash_key(hasher: &mut Sha3_256, val: &ValAddress) {
    hasher.update((val.as_bytes().len() as u64).to_le_bytes());
    hasher.update(val.as_bytes());
}

fn hash_coins(hasher: &mut Sha3_256, coins: &DecCoins) {
    hasher.update((coins.len() as u64).to_le_bytes());
    for c in coins.iter() {
        hasher.update(c.denom.as_bytes());
        hasher.update([0u8]);
        hasher.update(c.amount.to_string().as_bytes());
    }
}

/// SHA3-256 over every table in key order, hex-encoded.
/// Nodes that applied the same blocks must produce the same root.
pub fn state_root<S: RewardStore + ?Sized>(store: &S) -> Result<String> {
    let mut hasher = Sha3_256::new();

    hasher.update(b"outstanding");
    for (val, rec) in store.all_outstanding_rewards()? {
        hash_key(&mut hasher, &val);
        hash_coins(&mut hasher, &rec.rewards);
    }

    hasher.update(b"commission");
    for (val, rec) in store.all_accumulated_commissions()? {
        hash_key(&mut hasher, &val);
        hash_coins(&mut hasher, &rec.commission);
    }

    hasher.update(b"current");
    for (val, rec) in store.all_current_rewards()? {
        hash_key(&mut hasher, &val);
        hash_coins(&mut hasher, &rec.rewards);
        hasher.update(rec.period.to_le_bytes());
    }

    hasher.update(b"fee_pool");
    hash_coins(&mut hasher, &store.get_fee_pool()?.community_pool);

    Ok(hex::encode(hasher.finalize()))
}
