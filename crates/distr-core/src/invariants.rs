// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DISTR - LEDGER INVARIANTS
//
// Audits run after a block (or on demand from the CLI). Each returns
// Ok(()) or InvariantBroken with enough detail to locate the bad record.
// A broken invariant means the ledger is corrupt; block processing halts.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::BTreeMap;

use crate::coins::DecCoins;
use crate::error::{DistrError, Result};
use crate::expected_keepers::{BankKeeper, StakingKeeper};
use crate::keeper::Keeper;
use crate::store::RewardStore;
use crate::types::ValAddress;
use crate::MODULE_NAME;

/// Every stored bag is sorted, unique and strictly positive.
pub fn well_formed_outstanding<S: RewardStore + ?Sized>(store: &S) -> Result<()> {
    for (val, rec) in store.all_outstanding_rewards()? {
        if !rec.rewards.is_valid() {
            return Err(DistrError::InvariantBroken(format!(
                "malformed outstanding rewards for {}: {}",
                val, rec.rewards
            )));
        }
    }
    for (val, rec) in store.all_accumulated_commissions()? {
        if !rec.commission.is_valid() {
            return Err(DistrError::InvariantBroken(format!(
                "malformed accumulated commission for {}: {}",
                val, rec.commission
            )));
        }
    }
    for (val, rec) in store.all_current_rewards()? {
        if !rec.rewards.is_valid() {
            return Err(DistrError::InvariantBroken(format!(
                "malformed current rewards for {}: {}",
                val, rec.rewards
            )));
        }
    }
    let pool = store.get_fee_pool()?.community_pool;
    if !pool.is_valid() {
        return Err(DistrError::InvariantBroken(format!(
            "malformed community pool: {}",
            pool
        )));
    }
    Ok(())
}

/// commission + current rewards == outstanding, per validator and denom.
///
/// Only holds while nothing has been withdrawn; the withdrawal side is
/// expected to keep all three tables in step.
pub fn commission_split_consistent<S: RewardStore + ?Sized>(store: &S) -> Result<()> {
    let mut components: BTreeMap<ValAddress, DecCoins> = BTreeMap::new();
    for (val, rec) in store.all_accumulated_commissions()? {
        components.insert(val, rec.commission);
    }
    for (val, rec) in store.all_current_rewards()? {
        let sum = components.remove(&val).unwrap_or_default().add(&rec.rewards)?;
        components.insert(val, sum);
    }

    for (val, rec) in store.all_outstanding_rewards()? {
        let parts = components.remove(&val).unwrap_or_default();
        if parts != rec.rewards {
            return Err(DistrError::InvariantBroken(format!(
                "{}: commission + current rewards = {}, outstanding = {}",
                val, parts, rec.rewards
            )));
        }
    }

    // components left over have no outstanding record at all
    if let Some((val, parts)) = components.into_iter().find(|(_, p)| !p.is_zero()) {
        return Err(DistrError::InvariantBroken(format!(
            "{}: commission + current rewards = {} with no outstanding rewards",
            val, parts
        )));
    }
    Ok(())
}

/// The module account holds at least every whole coin the store promises.
/// It may hold more: fees from zero-power blocks are never attributed.
pub fn module_account_backed<S, B>(store: &S, bank: &B, module: &str) -> Result<()>
where
    S: RewardStore + ?Sized,
    B: BankKeeper + ?Sized,
{
    let mut owed = store.get_fee_pool()?.community_pool;
    for (_, rec) in store.all_outstanding_rewards()? {
        owed = owed.add(&rec.rewards)?;
    }
    let (owed_whole, _change) = owed.truncate_decimal()?;
    let balance = bank.get_all_balances(module);

    if balance.is_all_gte(&owed_whole) {
        Ok(())
    } else {
        Err(DistrError::InvariantBroken(format!(
            "module account {} holds {} but owes {}",
            module, balance, owed
        )))
    }
}

/// Run every audit against a keeper's store and bank.
pub fn all_invariants<S, B, K>(keeper: &Keeper<S, B, K>) -> Result<()>
where
    S: RewardStore,
    B: BankKeeper,
    K: StakingKeeper,
{
    well_formed_outstanding(keeper.store())?;
    commission_split_consistent(keeper.store())?;
    module_account_backed(keeper.store(), keeper.bank(), MODULE_NAME)?;
    Ok(())
}
