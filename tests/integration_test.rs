// ========================================
// INTEGRATION TESTS FOR DISTR
// ========================================
//
// Test Scenarios:
// 1. Multi-Block Allocation on a Persistent Store
// 2. Crash Between Blocks (Buffered Writes Discarded)
// 3. Validator Removed Between Signing and Allocation
// 4. Cross-Node Determinism (Memory vs Sled)
// 5. Genesis Export / Re-Import
//
// Usage:
//   cargo test --test integration_test -- --nocapture
//
// ========================================

use distr_core::invariants::all_invariants;
use distr_core::testutil::{make_validator, MemoryBank, MemoryStaking};
use distr_core::{
    export_genesis, init_genesis, state_root, BankKeeper, CacheStore, Coin, Coins, Dec,
    DecCoins, GenesisState, Keeper, MemoryStore, Params, RewardStore, SledStore, Validator,
    VoteInfo, FEE_COLLECTOR_NAME, MODULE_NAME,
};

fn dec(s: &str) -> Dec {
    s.parse().expect("valid decimal")
}

fn stake(amount: u128) -> Coins {
    Coins::new(vec![Coin::new("stake", amount)]).expect("valid coins")
}

fn validator_set() -> Vec<Validator> {
    vec![
        make_validator("cosmosvaloper1alpha", 1, dec("0.05")),
        make_validator("cosmosvaloper1beta", 2, dec("0.10")),
        make_validator("cosmosvaloper1gamma", 3, dec("0.20")),
    ]
}

fn staking_for(validators: &[Validator]) -> MemoryStaking {
    let mut staking = MemoryStaking::new();
    for v in validators {
        staking.add_validator(v.clone());
    }
    staking
}

fn votes_for(validators: &[Validator], powers: &[u64]) -> Vec<VoteInfo> {
    validators
        .iter()
        .zip(powers)
        .map(|(v, p)| VoteInfo::new(v.cons_address.clone(), *p))
        .collect()
}

/// Fund the fee collector, allocate through the write buffer, commit.
fn process_block<S: RewardStore>(
    keeper: &mut Keeper<CacheStore<S>, MemoryBank, MemoryStaking>,
    fees: &Coins,
    total_power: u64,
    votes: &[VoteInfo],
) -> distr_core::AllocationSummary {
    keeper
        .bank_mut()
        .fund(FEE_COLLECTOR_NAME, fees)
        .expect("fund fee collector");
    let summary = keeper
        .allocate_tokens(total_power, votes)
        .expect("allocation succeeds");
    keeper.store_mut().write().expect("commit block");
    summary
}

// ========================================
// TEST 1: MULTI-BLOCK ALLOCATION ON A PERSISTENT STORE
// ========================================
#[test]
fn test_multi_block_allocation_persists() {
    println!("\n🧪 TEST 1: Multi-Block Allocation on a Persistent Store");
    println!("========================================================\n");

    let dir = tempfile::tempdir().unwrap();
    let validators = validator_set();
    let votes = votes_for(&validators, &[11, 10, 10]);
    let mut total_fees = DecCoins::empty();

    let root = {
        let store = SledStore::open(dir.path()).unwrap();
        let mut keeper = Keeper::new(
            CacheStore::new(store),
            MemoryBank::new(),
            staking_for(&validators),
            Params::default(),
        )
        .unwrap();

        for height in 1..=50u128 {
            let fees = stake(634_195_840 + height * 13);
            total_fees = total_fees.add(&DecCoins::from_coins(&fees)).unwrap();
            process_block(&mut keeper, &fees, 31, &votes);
            all_invariants(&keeper).unwrap();
        }
        println!("  ✅ Processed 50 blocks");
        state_root(keeper.store()).unwrap()
    };

    // reopen: everything must have reached disk
    let store = SledStore::open(dir.path()).unwrap();
    assert_eq!(state_root(&store).unwrap(), root);

    let mut sum = store.get_fee_pool().unwrap().community_pool;
    for (_, rec) in store.all_outstanding_rewards().unwrap() {
        assert!(rec.rewards.is_valid());
        sum = sum.add(&rec.rewards).unwrap();
    }
    assert_eq!(sum, total_fees, "fees must be conserved exactly");
    println!("  ✅ Conservation holds after reopen: {}", sum);
}

// ========================================
// TEST 2: CRASH BETWEEN BLOCKS
// ========================================
#[test]
fn test_failed_block_is_not_committed() {
    println!("\n🧪 TEST 2: Failed Block Discarded");
    println!("==================================\n");

    let dir = tempfile::tempdir().unwrap();
    let mut validators = validator_set();
    let votes = votes_for(&validators, &[1, 1, 1]);

    let store = SledStore::open(dir.path()).unwrap();
    let mut keeper = Keeper::new(
        CacheStore::new(store),
        MemoryBank::new(),
        staking_for(&validators),
        Params::default(),
    )
    .unwrap();
    process_block(&mut keeper, &stake(300), 3, &votes);
    let committed = state_root(keeper.store().parent()).unwrap();

    // a corrupt registry entry makes the next block fail midway
    validators[2].commission_rate = dec("3");
    keeper.staking_mut().add_validator(validators[2].clone());
    keeper
        .bank_mut()
        .fund(FEE_COLLECTOR_NAME, &stake(300))
        .unwrap();
    assert!(keeper.allocate_tokens(3, &votes).is_err());
    assert!(!keeper.store().pending().is_empty());

    keeper.store_mut().discard();
    assert_eq!(state_root(keeper.store()).unwrap(), committed);
    assert_eq!(state_root(keeper.store().parent()).unwrap(), committed);
    println!("  ✅ Store unchanged after rejected block");
}

// ========================================
// TEST 3: VALIDATOR REMOVED BETWEEN SIGNING AND ALLOCATION
// ========================================
#[test]
fn test_removed_validator_share_goes_to_community_pool() {
    println!("\n🧪 TEST 3: Removed Validator");
    println!("=============================\n");

    let validators = validator_set();
    let mut keeper = Keeper::new(
        CacheStore::new(MemoryStore::new()),
        MemoryBank::new(),
        staking_for(&validators),
        Params {
            community_tax: Dec::zero(),
            withdraw_addr_enabled: true,
        },
    )
    .unwrap();
    keeper
        .staking_mut()
        .remove_validator(&validators[1].cons_address);

    let votes = votes_for(&validators, &[25, 50, 25]);
    let summary = process_block(&mut keeper, &stake(1_000), 100, &votes);

    assert_eq!(summary.skipped, vec![validators[1].cons_address.clone()]);
    assert_eq!(
        keeper
            .get_outstanding_rewards(&validators[1].operator)
            .unwrap()
            .rewards,
        DecCoins::empty()
    );
    assert_eq!(
        keeper.get_fee_pool().unwrap().community_pool,
        DecCoins::single("stake", Dec::from_int(500)).unwrap()
    );
    all_invariants(&keeper).unwrap();
    println!("  ✅ Skipped share landed in the community pool");
}

// ========================================
// TEST 4: CROSS-NODE DETERMINISM
// ========================================
#[test]
fn test_memory_and_sled_nodes_agree() {
    println!("\n🧪 TEST 4: Cross-Node Determinism");
    println!("==================================\n");

    let dir = tempfile::tempdir().unwrap();
    let validators = validator_set();
    let params = Params {
        community_tax: dec("0.015"),
        withdraw_addr_enabled: true,
    };

    let mut node_a = Keeper::new(
        CacheStore::new(MemoryStore::new()),
        MemoryBank::new(),
        staking_for(&validators),
        params.clone(),
    )
    .unwrap();
    let mut node_b = Keeper::new(
        CacheStore::new(SledStore::open(dir.path()).unwrap()),
        MemoryBank::new(),
        staking_for(&validators),
        params,
    )
    .unwrap();

    for height in 0..25u64 {
        let fees = Coins::new(vec![
            Coin::new("stake", 1 + u128::from(height) * 9_973),
            Coin::new("uatom", u128::from(height % 7)),
        ])
        .unwrap();
        let votes = votes_for(&validators, &[height + 1, 7, 13]);
        let total = height + 1 + 7 + 13 + 5;
        let a = process_block(&mut node_a, &fees, total, &votes);
        let b = process_block(&mut node_b, &fees, total, &votes);
        assert_eq!(a, b, "block {} summaries diverged", height);
    }

    let root_a = state_root(node_a.store()).unwrap();
    let root_b = state_root(node_b.store()).unwrap();
    println!("  - node A root: {}", root_a);
    println!("  - node B root: {}", root_b);
    assert_eq!(root_a, root_b);
    assert_eq!(
        node_a.bank().get_all_balances(MODULE_NAME),
        node_b.bank().get_all_balances(MODULE_NAME)
    );
}

// ========================================
// TEST 5: GENESIS EXPORT / RE-IMPORT
// ========================================
#[test]
fn test_genesis_export_reimport_into_sled() {
    println!("\n🧪 TEST 5: Genesis Export / Re-Import");
    println!("======================================\n");

    let validators = validator_set();
    let mut source = Keeper::new(
        CacheStore::new(MemoryStore::new()),
        MemoryBank::new(),
        staking_for(&validators),
        Params::default(),
    )
    .unwrap();
    for _ in 0..3 {
        process_block(&mut source, &stake(12_345), 40, &votes_for(&validators, &[10, 20, 10]));
    }

    let dir = tempfile::tempdir().unwrap();
    let genesis_file = dir.path().join("genesis.json");
    export_genesis(&source)
        .unwrap()
        .save_to_file(&genesis_file)
        .unwrap();

    let state = GenesisState::load_from_file(&genesis_file).unwrap();
    let mut target = Keeper::new(
        CacheStore::new(SledStore::open(dir.path().join("db")).unwrap()),
        MemoryBank::new(),
        MemoryStaking::new(),
        Params::default(),
    )
    .unwrap();
    init_genesis(&mut target, &state).unwrap();
    target.store_mut().write().unwrap();

    assert_eq!(
        state_root(target.store().parent()).unwrap(),
        state_root(source.store()).unwrap()
    );
    println!("  ✅ Imported state matches the exporting node");
}
