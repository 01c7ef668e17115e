//! Fuzz target: block allocation
//!
//! Random validator sets, powers, tax and fees. Allocation must never
//! panic, and whenever it succeeds the fees must be conserved exactly
//! and every ledger invariant must hold.
//!
//! Run: cargo +nightly fuzz run fuzz_allocate_tokens

#![no_main]
use arbitrary::Arbitrary;
use distr_core::invariants::all_invariants;
use distr_core::testutil::{make_validator, MemoryBank, MemoryStaking};
use distr_core::{
    Coin, Coins, Dec, DecCoins, Keeper, MemoryStore, Params, RewardStore, VoteInfo,
    FEE_COLLECTOR_NAME,
};
use libfuzzer_sys::fuzz_target;
use primitive_types::U256;

#[derive(Arbitrary, Debug)]
struct FuzzValidator {
    /// Commission in 10^-18 units, wrapped into [0, 1].
    commission_units: u64,
    power: u32,
    registered: bool,
}

#[derive(Arbitrary, Debug)]
struct FuzzAllocateInput {
    validators: Vec<FuzzValidator>,
    tax_units: u64,
    extra_power: u16,
    stake_fees: u64,
    atom_fees: u32,
}

const ONE: u64 = 1_000_000_000_000_000_000;

fuzz_target!(|input: FuzzAllocateInput| {
    let tax = Dec::from_raw(U256::from(input.tax_units % ONE));
    let params = Params {
        community_tax: tax,
        withdraw_addr_enabled: true,
    };

    let mut staking = MemoryStaking::new();
    let mut votes = Vec::new();
    // cap the set size to keep iterations fast
    for (i, v) in input.validators.iter().take(32).enumerate() {
        let rate = Dec::from_raw(U256::from(v.commission_units % (ONE + 1)));
        let val = make_validator(&format!("valoper{:02}", i), i as u8, rate);
        votes.push(VoteInfo::new(val.cons_address.clone(), u64::from(v.power)));
        if v.registered {
            staking.add_validator(val);
        }
    }
    let total: u64 =
        votes.iter().map(|v| v.power).sum::<u64>() + u64::from(input.extra_power);

    let fees = Coins::new(vec![
        Coin::new("stake", u128::from(input.stake_fees)),
        Coin::new("uatom", u128::from(input.atom_fees)),
    ])
    .expect("static denoms are valid");

    let mut keeper = Keeper::new(MemoryStore::new(), MemoryBank::new(), staking, params)
        .expect("tax below one");
    keeper
        .bank_mut()
        .fund(FEE_COLLECTOR_NAME, &fees)
        .expect("funding cannot overflow");

    let summary = match keeper.allocate_tokens(total, &votes) {
        Ok(s) => s,
        Err(_) => return,
    };

    if total > 0 {
        let mut sum = keeper.get_fee_pool().unwrap().community_pool;
        for (_, rec) in keeper.store().all_outstanding_rewards().unwrap() {
            sum = sum.add(&rec.rewards).unwrap();
        }
        assert_eq!(sum, DecCoins::from_coins(&fees), "fees not conserved");
    } else {
        assert!(summary.allocations.is_empty());
    }
    all_invariants(&keeper).expect("invariants hold after allocation");
});
