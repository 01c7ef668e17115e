// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DISTR - REWARD ALLOCATION KEEPER
//
// Once per block, the fees collected during the previous block are moved
// into the distribution module account and attributed to the validators
// that signed it, pro rata by voting power:
//
//   share_i = fees * (1 - community_tax) * (power_i / total_power)
//
// Every multiplication truncates at 18 decimals, so the sum of shares can
// only fall short of the fees. Whatever is left (community tax, truncation
// dust, shares of validators that no longer exist) goes to the community
// pool. Nothing is created or lost:
//
//   community_pool_delta + sum(share_i) == fees
//
// All arithmetic is fixed-point. The result depends only on the inputs and
// the prior store state, never on map iteration order or wall-clock time.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use log::{debug, info, warn};

use crate::coins::DecCoins;
use crate::decimal::Dec;
use crate::error::{DistrError, Result};
use crate::expected_keepers::{BankKeeper, StakingKeeper};
use crate::params::Params;
use crate::store::RewardStore;
use crate::types::{
    AllocationSummary, FeePool, ValAddress, Validator, ValidatorAccumulatedCommission,
    ValidatorAllocation, ValidatorCurrentRewards, ValidatorOutstandingRewards, VoteInfo,
};
use crate::{FEE_COLLECTOR_NAME, MODULE_NAME};

pub struct Keeper<S: RewardStore, B: BankKeeper, K: StakingKeeper> {
    store: S,
    bank: B,
    staking: K,
    params: Params,
    fee_collector_name: String,
}

impl<S: RewardStore, B: BankKeeper, K: StakingKeeper> Keeper<S, B, K> {
    /// Rejects invalid params up front; allocation assumes a tax below one.
    pub fn new(store: S, bank: B, staking: K, params: Params) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            store,
            bank,
            staking,
            params,
            fee_collector_name: FEE_COLLECTOR_NAME.to_string(),
        })
    }

    /// Collect fees from a differently named module account.
    pub fn with_fee_collector(mut self, name: impl Into<String>) -> Self {
        self.fee_collector_name = name.into();
        self
    }

    pub fn fee_collector_name(&self) -> &str {
        &self.fee_collector_name
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }

    pub fn bank_mut(&mut self) -> &mut B {
        &mut self.bank
    }

    pub fn staking(&self) -> &K {
        &self.staking
    }

    pub fn staking_mut(&mut self) -> &mut K {
        &mut self.staking
    }

    pub fn into_parts(self) -> (S, B, K) {
        (self.store, self.bank, self.staking)
    }

    pub fn get_params(&self) -> &Params {
        &self.params
    }

    pub fn set_params(&mut self, params: Params) -> Result<()> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Store accessors
    // ─────────────────────────────────────────────────────────────

    pub fn get_outstanding_rewards(&self, val: &ValAddress) -> Result<ValidatorOutstandingRewards> {
        self.store.get_outstanding_rewards(val)
    }

    pub fn set_outstanding_rewards(
        &mut self,
        val: &ValAddress,
        rewards: &ValidatorOutstandingRewards,
    ) -> Result<()> {
        self.store.set_outstanding_rewards(val, rewards)
    }

    pub fn get_accumulated_commission(
        &self,
        val: &ValAddress,
    ) -> Result<ValidatorAccumulatedCommission> {
        self.store.get_accumulated_commission(val)
    }

    pub fn set_accumulated_commission(
        &mut self,
        val: &ValAddress,
        commission: &ValidatorAccumulatedCommission,
    ) -> Result<()> {
        self.store.set_accumulated_commission(val, commission)
    }

    pub fn get_current_rewards(&self, val: &ValAddress) -> Result<ValidatorCurrentRewards> {
        self.store.get_current_rewards(val)
    }

    pub fn set_current_rewards(
        &mut self,
        val: &ValAddress,
        rewards: &ValidatorCurrentRewards,
    ) -> Result<()> {
        self.store.set_current_rewards(val, rewards)
    }

    pub fn get_fee_pool(&self) -> Result<FeePool> {
        self.store.get_fee_pool()
    }

    pub fn set_fee_pool(&mut self, pool: &FeePool) -> Result<()> {
        self.store.set_fee_pool(pool)
    }

    // ─────────────────────────────────────────────────────────────
    // Allocation
    // ─────────────────────────────────────────────────────────────

    /// Credit `tokens` to a validator: the commission slice to the operator,
    /// the rest to the current period, the whole amount to outstanding.
    pub fn allocate_tokens_to_validator(
        &mut self,
        val: &Validator,
        tokens: &DecCoins,
    ) -> Result<ValidatorAllocation> {
        if val.commission_rate > Dec::one() {
            return Err(DistrError::InvalidDecimal(format!(
                "commission rate of {} above one: {}",
                val.operator, val.commission_rate
            )));
        }

        let commission = tokens.mul_dec_truncate(val.commission_rate)?;
        let shared = tokens.sub(&commission)?;

        let mut current = self.store.get_current_rewards(&val.operator)?;
        current.rewards = current.rewards.add(&shared)?;
        self.store.set_current_rewards(&val.operator, &current)?;

        let mut accumulated = self.store.get_accumulated_commission(&val.operator)?;
        accumulated.commission = accumulated.commission.add(&commission)?;
        self.store
            .set_accumulated_commission(&val.operator, &accumulated)?;

        let mut outstanding = self.store.get_outstanding_rewards(&val.operator)?;
        outstanding.rewards = outstanding.rewards.add(tokens)?;
        self.store
            .set_outstanding_rewards(&val.operator, &outstanding)?;

        debug!(
            "allocated {} to {} (commission {}, shared {})",
            tokens, val.operator, commission, shared
        );

        Ok(ValidatorAllocation {
            validator: val.operator.clone(),
            tokens: tokens.clone(),
            commission,
            shared,
        })
    }

    /// Distribute the fee collector's balance to the previous block's signers.
    ///
    /// `total_previous_power` is the power of the whole previous validator
    /// set, so votes may sum to less than it. With zero total power the fees
    /// are moved into the module account and left there for a later block.
    ///
    /// Any error is fatal for the block: the store may hold partial writes
    /// and must be discarded, not committed.
    pub fn allocate_tokens(
        &mut self,
        total_previous_power: u64,
        votes: &[VoteInfo],
    ) -> Result<AllocationSummary> {
        let fees_collected_int = self.bank.get_all_balances(&self.fee_collector_name);
        let fees_collected = DecCoins::from_coins(&fees_collected_int);

        // Move first: no reward is recorded unless the module account holds it.
        self.bank.send_coins_from_module_to_module(
            &self.fee_collector_name,
            MODULE_NAME,
            &fees_collected_int,
        )?;

        let mut summary = AllocationSummary {
            fees_collected: fees_collected.clone(),
            ..AllocationSummary::default()
        };

        if total_previous_power == 0 {
            if !fees_collected.is_zero() {
                warn!(
                    "total previous power is zero, {} held in module account unallocated",
                    fees_collected
                );
            }
            return Ok(summary);
        }

        let total_power = Dec::from_int(u128::from(total_previous_power));
        let vote_multiplier = Dec::one()
            .checked_sub(self.params.community_tax)
            .ok_or_else(|| {
                DistrError::InvalidParams(format!(
                    "community tax above one: {}",
                    self.params.community_tax
                ))
            })?;
        let post_tax = fees_collected.mul_dec_truncate(vote_multiplier)?;

        let mut remaining = fees_collected.clone();
        for vote in votes.iter().filter(|v| v.power > 0) {
            let validator = match self.staking.validator_by_cons_addr(&vote.address) {
                Some(v) => v,
                None => {
                    // power stays in the denominator; the share ends up in the pool
                    warn!(
                        "no validator for consensus address {}, skipping {} power",
                        vote.address, vote.power
                    );
                    summary.skipped.push(vote.address.clone());
                    continue;
                }
            };

            let power_fraction = Dec::from_int(u128::from(vote.power))
                .checked_quo_truncate(total_power)
                .ok_or_else(|| {
                    DistrError::Overflow(format!("{} / {}", vote.power, total_previous_power))
                })?;
            let reward = post_tax.mul_dec_truncate(power_fraction)?;

            let allocation = self.allocate_tokens_to_validator(&validator, &reward)?;
            remaining = remaining.sub(&reward)?;
            summary.allocations.push(allocation);
        }

        let mut fee_pool = self.store.get_fee_pool()?;
        fee_pool.community_pool = fee_pool.community_pool.add(&remaining)?;
        self.store.set_fee_pool(&fee_pool)?;
        summary.community_pool_delta = remaining;

        info!(
            "allocated block fees {}: {} validators, {} skipped, community pool +{}",
            summary.fees_collected,
            summary.allocations.len(),
            summary.skipped.len(),
            summary.community_pool_delta
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coins::{Coin, Coins};
    use crate::store::{CacheStore, MemoryStore};
    use crate::testutil::{make_validator, MemoryBank, MemoryStaking};
    use crate::types::ConsAddress;

    type TestKeeper = Keeper<MemoryStore, MemoryBank, MemoryStaking>;

    fn dec(s: &str) -> Dec {
        s.parse().unwrap()
    }

    fn stake_dec(s: &str) -> DecCoins {
        DecCoins::single("stake", dec(s)).unwrap()
    }

    fn stake(amount: u128) -> Coins {
        Coins::new(vec![Coin::new("stake", amount)]).unwrap()
    }

    fn setup(validators: Vec<Validator>, tax: &str) -> TestKeeper {
        let mut staking = MemoryStaking::new();
        for v in validators {
            staking.add_validator(v);
        }
        let params = Params {
            community_tax: dec(tax),
            withdraw_addr_enabled: true,
        };
        Keeper::new(MemoryStore::new(), MemoryBank::new(), staking, params).unwrap()
    }

    fn assert_split_consistent(keeper: &TestKeeper, val: &ValAddress) {
        let outstanding = keeper.get_outstanding_rewards(val).unwrap().rewards;
        let commission = keeper.get_accumulated_commission(val).unwrap().commission;
        let current = keeper.get_current_rewards(val).unwrap().rewards;
        assert_eq!(commission.add(&current).unwrap(), outstanding);
    }

    #[test]
    fn test_allocate_tokens_to_validator_half_commission() {
        let val = make_validator("valoper1", 1, dec("0.5"));
        let mut keeper = setup(vec![val.clone()], "0.02");

        let alloc = keeper
            .allocate_tokens_to_validator(&val, &stake_dec("10"))
            .unwrap();

        assert_eq!(alloc.commission, stake_dec("5"));
        assert_eq!(alloc.shared, stake_dec("5"));
        assert_eq!(
            keeper.get_accumulated_commission(&val.operator).unwrap().commission,
            stake_dec("5")
        );
        let current = keeper.get_current_rewards(&val.operator).unwrap();
        assert_eq!(current.rewards, stake_dec("5"));
        assert_eq!(current.period, 0);
        assert_eq!(
            keeper.get_outstanding_rewards(&val.operator).unwrap().rewards,
            stake_dec("10")
        );
    }

    #[test]
    fn test_allocate_tokens_to_validator_leaves_period() {
        let val = make_validator("valoper1", 1, dec("0.1"));
        let mut keeper = setup(vec![val.clone()], "0.02");
        keeper
            .set_current_rewards(
                &val.operator,
                &ValidatorCurrentRewards {
                    rewards: DecCoins::empty(),
                    period: 7,
                },
            )
            .unwrap();
        keeper
            .allocate_tokens_to_validator(&val, &stake_dec("3"))
            .unwrap();
        assert_eq!(keeper.get_current_rewards(&val.operator).unwrap().period, 7);
    }

    #[test]
    fn test_commission_truncates() {
        // exact commission is 1.5e-18; rounding would credit 2e-18
        let val = make_validator("valoper1", 1, dec("0.5"));
        let mut keeper = setup(vec![val.clone()], "0");
        let alloc = keeper
            .allocate_tokens_to_validator(&val, &stake_dec("0.000000000000000003"))
            .unwrap();
        assert_eq!(alloc.commission, stake_dec("0.000000000000000001"));
        assert_eq!(alloc.shared, stake_dec("0.000000000000000002"));
        assert_split_consistent(&keeper, &val.operator);
    }

    #[test]
    fn test_commission_rate_above_one_rejected() {
        let val = make_validator("valoper1", 1, dec("1.5"));
        let mut keeper = setup(vec![val.clone()], "0");
        assert!(keeper
            .allocate_tokens_to_validator(&val, &stake_dec("10"))
            .is_err());
        assert!(keeper.store().all_outstanding_rewards().unwrap().is_empty());
    }

    #[test]
    fn test_allocate_tokens_two_validators() {
        let v1 = make_validator("valoper1", 1, dec("0.5"));
        let v2 = make_validator("valoper2", 2, Dec::zero());
        let mut keeper = setup(vec![v1.clone(), v2.clone()], "0.02");
        keeper.bank_mut().fund(FEE_COLLECTOR_NAME, &stake(100)).unwrap();

        // nothing allocated yet
        assert!(keeper.get_outstanding_rewards(&v1.operator).unwrap().rewards.is_zero());
        assert!(keeper.get_fee_pool().unwrap().community_pool.is_zero());

        let votes = vec![
            VoteInfo::new(v1.cons_address.clone(), 100),
            VoteInfo::new(v2.cons_address.clone(), 100),
        ];
        let summary = keeper.allocate_tokens(200, &votes).unwrap();

        assert_eq!(
            keeper.get_outstanding_rewards(&v1.operator).unwrap().rewards,
            stake_dec("49")
        );
        assert_eq!(
            keeper.get_outstanding_rewards(&v2.operator).unwrap().rewards,
            stake_dec("49")
        );
        assert_eq!(
            keeper.get_fee_pool().unwrap().community_pool,
            stake_dec("2")
        );
        assert_eq!(
            keeper.get_accumulated_commission(&v1.operator).unwrap().commission,
            stake_dec("24.5")
        );
        assert!(keeper
            .get_accumulated_commission(&v2.operator)
            .unwrap()
            .commission
            .is_zero());
        assert_eq!(
            keeper.get_current_rewards(&v1.operator).unwrap().rewards,
            stake_dec("24.5")
        );
        assert_eq!(
            keeper.get_current_rewards(&v2.operator).unwrap().rewards,
            stake_dec("49")
        );

        assert_eq!(summary.fees_collected, stake_dec("100"));
        assert_eq!(summary.allocations.len(), 2);
        assert_eq!(summary.community_pool_delta, stake_dec("2"));
        assert!(keeper.bank().get_all_balances(FEE_COLLECTOR_NAME).is_zero());
        assert_eq!(keeper.bank().get_all_balances(MODULE_NAME), stake(100));
    }

    #[test]
    fn test_allocate_tokens_truncation() {
        let v1 = make_validator("valoper1", 1, dec("0.1"));
        let v2 = make_validator("valoper2", 2, dec("0.1"));
        let v3 = make_validator("valoper3", 3, dec("0.1"));
        let mut keeper = setup(vec![v1.clone(), v2.clone(), v3.clone()], "0.02");
        keeper
            .bank_mut()
            .fund(FEE_COLLECTOR_NAME, &stake(634195840))
            .unwrap();

        let votes = vec![
            VoteInfo::new(v1.cons_address.clone(), 11),
            VoteInfo::new(v2.cons_address.clone(), 10),
            VoteInfo::new(v3.cons_address.clone(), 10),
        ];
        let summary = keeper.allocate_tokens(31, &votes).unwrap();

        let mut total = keeper.get_fee_pool().unwrap().community_pool;
        for v in [&v1, &v2, &v3] {
            let outstanding = keeper.get_outstanding_rewards(&v.operator).unwrap().rewards;
            assert!(outstanding.is_valid());
            assert!(!outstanding.is_zero());
            assert_split_consistent(&keeper, &v.operator);
            total = total.add(&outstanding).unwrap();
        }
        assert_eq!(total, stake_dec("634195840"));
        assert_eq!(
            summary.total_allocated().unwrap().add(&summary.community_pool_delta).unwrap(),
            summary.fees_collected
        );
    }

    #[test]
    fn test_zero_power_moves_fees_only() {
        let v1 = make_validator("valoper1", 1, dec("0.5"));
        let mut keeper = setup(vec![v1.clone()], "0.02");
        keeper.bank_mut().fund(FEE_COLLECTOR_NAME, &stake(100)).unwrap();

        let votes = vec![VoteInfo::new(v1.cons_address.clone(), 100)];
        let summary = keeper.allocate_tokens(0, &votes).unwrap();

        assert!(summary.allocations.is_empty());
        assert!(summary.community_pool_delta.is_zero());
        assert_eq!(keeper.store(), &MemoryStore::new());
        assert_eq!(keeper.bank().get_all_balances(MODULE_NAME), stake(100));
        assert!(keeper.bank().get_all_balances(FEE_COLLECTOR_NAME).is_zero());
    }

    #[test]
    fn test_missing_validator_share_goes_to_pool() {
        let v1 = make_validator("valoper1", 1, Dec::zero());
        let mut keeper = setup(vec![v1.clone()], "0");
        keeper.bank_mut().fund(FEE_COLLECTOR_NAME, &stake(100)).unwrap();

        let gone = ConsAddress::new(vec![9u8; 20]);
        let votes = vec![
            VoteInfo::new(v1.cons_address.clone(), 50),
            VoteInfo::new(gone.clone(), 50),
        ];
        let summary = keeper.allocate_tokens(100, &votes).unwrap();

        assert_eq!(summary.skipped, vec![gone]);
        assert_eq!(
            keeper.get_outstanding_rewards(&v1.operator).unwrap().rewards,
            stake_dec("50")
        );
        assert_eq!(
            keeper.get_fee_pool().unwrap().community_pool,
            stake_dec("50")
        );
    }

    #[test]
    fn test_zero_power_votes_ignored() {
        let v1 = make_validator("valoper1", 1, Dec::zero());
        let v2 = make_validator("valoper2", 2, Dec::zero());
        let mut keeper = setup(vec![v1.clone(), v2.clone()], "0");
        keeper.bank_mut().fund(FEE_COLLECTOR_NAME, &stake(10)).unwrap();

        let votes = vec![
            VoteInfo::new(v1.cons_address.clone(), 10),
            VoteInfo::new(v2.cons_address.clone(), 0),
        ];
        let summary = keeper.allocate_tokens(10, &votes).unwrap();
        assert_eq!(summary.allocations.len(), 1);
        assert_eq!(keeper.store().all_outstanding_rewards().unwrap().len(), 1);
    }

    #[test]
    fn test_empty_fee_collector() {
        let v1 = make_validator("valoper1", 1, dec("0.5"));
        let mut keeper = setup(vec![v1.clone()], "0.02");
        let votes = vec![VoteInfo::new(v1.cons_address.clone(), 1)];
        let summary = keeper.allocate_tokens(1, &votes).unwrap();
        assert!(summary.fees_collected.is_zero());
        assert!(summary.community_pool_delta.is_zero());
        assert!(keeper
            .get_outstanding_rewards(&v1.operator)
            .unwrap()
            .rewards
            .is_zero());
    }

    #[test]
    fn test_multi_denom_fees() {
        let v1 = make_validator("valoper1", 1, dec("0.5"));
        let mut keeper = setup(vec![v1.clone()], "0.1");
        let fees = Coins::new(vec![Coin::new("uatom", 1000), Coin::new("stake", 10)]).unwrap();
        keeper.bank_mut().fund(FEE_COLLECTOR_NAME, &fees).unwrap();

        let votes = vec![VoteInfo::new(v1.cons_address.clone(), 1)];
        keeper.allocate_tokens(1, &votes).unwrap();

        let outstanding = keeper.get_outstanding_rewards(&v1.operator).unwrap().rewards;
        assert_eq!(outstanding.amount_of("stake"), dec("9"));
        assert_eq!(outstanding.amount_of("uatom"), dec("900"));
        let pool = keeper.get_fee_pool().unwrap().community_pool;
        assert_eq!(pool.amount_of("stake"), dec("1"));
        assert_eq!(pool.amount_of("uatom"), dec("100"));
    }

    #[test]
    fn test_repeated_blocks_keep_split_consistent() {
        let v1 = make_validator("valoper1", 1, dec("0.07"));
        let v2 = make_validator("valoper2", 2, dec("0.13"));
        let mut keeper = setup(vec![v1.clone(), v2.clone()], "0.02");

        for block in 1..=20u128 {
            keeper
                .bank_mut()
                .fund(FEE_COLLECTOR_NAME, &stake(block * 7919))
                .unwrap();
            let votes = vec![
                VoteInfo::new(v1.cons_address.clone(), 3),
                VoteInfo::new(v2.cons_address.clone(), 7),
            ];
            keeper.allocate_tokens(13, &votes).unwrap();
            assert_split_consistent(&keeper, &v1.operator);
            assert_split_consistent(&keeper, &v2.operator);
        }
    }

    #[test]
    fn test_bank_failure_leaves_store_untouched() {
        let v1 = make_validator("valoper1", 1, dec("0.5"));
        let mut keeper = setup(vec![v1.clone()], "0.02");
        keeper.bank_mut().fund(FEE_COLLECTOR_NAME, &stake(100)).unwrap();
        keeper.bank_mut().block_receiver(MODULE_NAME);

        let votes = vec![VoteInfo::new(v1.cons_address.clone(), 1)];
        assert!(keeper.allocate_tokens(1, &votes).is_err());
        assert_eq!(keeper.store(), &MemoryStore::new());
    }

    #[test]
    fn test_cache_store_discard_on_failure() {
        let good = make_validator("valoper1", 1, dec("0.5"));
        let bad = make_validator("valoper2", 2, dec("2"));
        let mut staking = MemoryStaking::new();
        staking.add_validator(good.clone());
        staking.add_validator(bad.clone());
        let mut keeper = Keeper::new(
            CacheStore::new(MemoryStore::new()),
            MemoryBank::new(),
            staking,
            Params::default(),
        )
        .unwrap();
        keeper.bank_mut().fund(FEE_COLLECTOR_NAME, &stake(100)).unwrap();

        let votes = vec![
            VoteInfo::new(good.cons_address.clone(), 1),
            VoteInfo::new(bad.cons_address.clone(), 1),
        ];
        assert!(keeper.allocate_tokens(2, &votes).is_err());

        // the good validator was credited in the overlay before the failure
        assert!(!keeper.store().pending().is_empty());
        keeper.store_mut().discard();
        keeper.store_mut().write().unwrap();
        let (cache, _, _) = keeper.into_parts();
        assert_eq!(cache.into_inner(), MemoryStore::new());
    }

    #[test]
    fn test_custom_fee_collector() {
        let v1 = make_validator("valoper1", 1, Dec::zero());
        let mut keeper = setup(vec![v1.clone()], "0").with_fee_collector("block_fees");
        keeper.bank_mut().fund("block_fees", &stake(5)).unwrap();
        keeper.bank_mut().fund(FEE_COLLECTOR_NAME, &stake(1000)).unwrap();

        let votes = vec![VoteInfo::new(v1.cons_address.clone(), 1)];
        let summary = keeper.allocate_tokens(1, &votes).unwrap();
        assert_eq!(summary.fees_collected, stake_dec("5"));
        assert_eq!(keeper.fee_collector_name(), "block_fees");
    }

    #[test]
    fn test_set_params_validates() {
        let mut keeper = setup(vec![], "0.02");
        let bad = Params {
            community_tax: Dec::one(),
            withdraw_addr_enabled: true,
        };
        assert!(keeper.set_params(bad).is_err());
        assert_eq!(keeper.get_params().community_tax, dec("0.02"));
    }
}
