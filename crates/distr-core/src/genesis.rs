// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DISTR - GENESIS IMPORT / EXPORT
//
// Snapshot of params and all four reward tables as one JSON document.
// Exports are ordered by validator address so two nodes with the same
// state produce byte-identical files.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::coins::DecCoins;
use crate::error::{DistrError, Result};
use crate::expected_keepers::{BankKeeper, StakingKeeper};
use crate::keeper::Keeper;
use crate::params::Params;
use crate::store::RewardStore;
use crate::types::{
    FeePool, ValAddress, ValidatorAccumulatedCommission, ValidatorCurrentRewards,
    ValidatorOutstandingRewards,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutstandingRewardsRecord {
    pub validator_address: ValAddress,
    pub outstanding_rewards: DecCoins,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccumulatedCommissionRecord {
    pub validator_address: ValAddress,
    pub accumulated: DecCoins,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentRewardsRecord {
    pub validator_address: ValAddress,
    pub rewards: DecCoins,
    pub period: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    pub params: Params,
    pub fee_pool: FeePool,
    #[serde(default)]
    pub outstanding_rewards: Vec<OutstandingRewardsRecord>,
    #[serde(default)]
    pub accumulated_commissions: Vec<AccumulatedCommissionRecord>,
    #[serde(default)]
    pub current_rewards: Vec<CurrentRewardsRecord>,
}

impl Default for GenesisState {
    fn default() -> Self {
        Self {
            params: Params::default(),
            fee_pool: FeePool::initial(),
            outstanding_rewards: Vec::new(),
            accumulated_commissions: Vec::new(),
            current_rewards: Vec::new(),
        }
    }
}

impl GenesisState {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

fn check_unique<'a>(
    table: &str,
    addrs: impl Iterator<Item = &'a ValAddress>,
) -> Result<()> {
    let mut seen = BTreeSet::new();
    for addr in addrs {
        if !seen.insert(addr) {
            return Err(DistrError::InvalidGenesis(format!(
                "duplicate {} entry for {}",
                table, addr
            )));
        }
    }
    Ok(())
}

fn check_coins(what: &str, addr: &ValAddress, coins: &DecCoins) -> Result<()> {
    if coins.is_valid() {
        Ok(())
    } else {
        Err(DistrError::InvalidGenesis(format!(
            "malformed {} for {}: {}",
            what, addr, coins
        )))
    }
}

/// Structural checks only; the split invariant is audited after import.
pub fn validate_genesis(state: &GenesisState) -> Result<()> {
    state
        .params
        .validate()
        .map_err(|e| DistrError::InvalidGenesis(e.to_string()))?;

    if !state.fee_pool.community_pool.is_valid() {
        return Err(DistrError::InvalidGenesis(format!(
            "malformed community pool: {}",
            state.fee_pool.community_pool
        )));
    }

    check_unique(
        "outstanding rewards",
        state.outstanding_rewards.iter().map(|r| &r.validator_address),
    )?;
    check_unique(
        "accumulated commission",
        state.accumulated_commissions.iter().map(|r| &r.validator_address),
    )?;
    check_unique(
        "current rewards",
        state.current_rewards.iter().map(|r| &r.validator_address),
    )?;

    for r in &state.outstanding_rewards {
        check_coins("outstanding rewards", &r.validator_address, &r.outstanding_rewards)?;
    }
    for r in &state.accumulated_commissions {
        check_coins("accumulated commission", &r.validator_address, &r.accumulated)?;
    }
    for r in &state.current_rewards {
        check_coins("current rewards", &r.validator_address, &r.rewards)?;
    }
    Ok(())
}

/// Validate and write every table. Params replace the keeper's.
pub fn init_genesis<S, B, K>(keeper: &mut Keeper<S, B, K>, state: &GenesisState) -> Result<()>
where
    S: RewardStore,
    B: BankKeeper,
    K: StakingKeeper,
{
    validate_genesis(state)?;
    keeper.set_params(state.params.clone())?;
    keeper.set_fee_pool(&state.fee_pool)?;

    for r in &state.outstanding_rewards {
        keeper.set_outstanding_rewards(
            &r.validator_address,
            &ValidatorOutstandingRewards {
                rewards: r.outstanding_rewards.clone(),
            },
        )?;
    }
    for r in &state.accumulated_commissions {
        keeper.set_accumulated_commission(
            &r.validator_address,
            &ValidatorAccumulatedCommission {
                commission: r.accumulated.clone(),
            },
        )?;
    }
    for r in &state.current_rewards {
        keeper.set_current_rewards(
            &r.validator_address,
            &ValidatorCurrentRewards {
                rewards: r.rewards.clone(),
                period: r.period,
            },
        )?;
    }

    log::info!(
        "imported genesis: {} outstanding, {} commission, {} current records",
        state.outstanding_rewards.len(),
        state.accumulated_commissions.len(),
        state.current_rewards.len()
    );
    Ok(())
}

pub fn export_genesis<S, B, K>(keeper: &Keeper<S, B, K>) -> Result<GenesisState>
where
    S: RewardStore,
    B: BankKeeper,
    K: StakingKeeper,
{
    let store = keeper.store();
    Ok(GenesisState {
        params: keeper.get_params().clone(),
        fee_pool: store.get_fee_pool()?,
        outstanding_rewards: store
            .all_outstanding_rewards()?
            .into_iter()
            .map(|(validator_address, rec)| OutstandingRewardsRecord {
                validator_address,
                outstanding_rewards: rec.rewards,
            })
            .collect(),
        accumulated_commissions: store
            .all_accumulated_commissions()?
            .into_iter()
            .map(|(validator_address, rec)| AccumulatedCommissionRecord {
                validator_address,
                accumulated: rec.commission,
            })
            .collect(),
        current_rewards: store
            .all_current_rewards()?
            .into_iter()
            .map(|(validator_address, rec)| CurrentRewardsRecord {
                validator_address,
                rewards: rec.rewards,
                period: rec.period,
            })
            .collect(),
    })
}
