// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DISTR - CORE MODULE
//
// Per-block reward distribution for a proof-of-stake chain: collected fees
// are split among the previous block's signers by voting power, minus a
// community tax, with each validator's share further split into operator
// commission and delegator rewards.
// All reward arithmetic is 18-digit fixed-point (no floating-point).
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub mod coins;
pub mod decimal;
pub mod error;
pub mod expected_keepers;
pub mod genesis;
pub mod invariants;
pub mod keeper;
pub mod params;
pub mod sled_store;
pub mod store;
pub mod testutil;
pub mod types;

/// Module account that holds every allocated but unwithdrawn reward.
pub const MODULE_NAME: &str = "distribution";

/// Module account that collects transaction fees during a block.
pub const FEE_COLLECTOR_NAME: &str = "fee_collector";

pub use coins::{Coin, Coins, DecCoin, DecCoins};
pub use decimal::{Dec, PRECISION};
pub use error::{DistrError, Result};
pub use expected_keepers::{BankKeeper, StakingKeeper};
pub use genesis::{export_genesis, init_genesis, validate_genesis, GenesisState};
pub use invariants::all_invariants;
pub use keeper::Keeper;
pub use params::Params;
pub use sled_store::SledStore;
pub use store::{state_root, CacheStore, MemoryStore, RewardStore, StoreBatch};
pub use types::{
    AllocationSummary, ConsAddress, FeePool, ValAddress, Validator,
    ValidatorAccumulatedCommission, ValidatorAllocation, ValidatorCurrentRewards,
    ValidatorOutstandingRewards, VoteInfo,
};
