use crate::commands::CliResult;
use crate::{print_info, print_success};
use colored::*;
use distr_core::invariants::all_invariants;
use distr_core::testutil::{MemoryBank, MemoryStaking};
use distr_core::{
    state_root, AllocationSummary, BankKeeper, CacheStore, Coins, ConsAddress, Dec, DecCoins,
    DistrError, Keeper, MemoryStore, Params, RewardStore, SledStore, ValAddress, Validator, VoteInfo,
    FEE_COLLECTOR_NAME, MODULE_NAME,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A run of blocks against a fixed validator set, loaded from TOML.
#[derive(Debug, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub params: Params,
    pub validators: Vec<ScenarioValidator>,
    pub blocks: Vec<ScenarioBlock>,
}

#[derive(Debug, Deserialize)]
pub struct ScenarioValidator {
    pub operator: String,
    pub cons_address: ConsAddress,
    pub commission_rate: Dec,
    /// Unregistered validators still vote but cannot be resolved.
    #[serde(default = "default_registered")]
    pub registered: bool,
}

fn default_registered() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ScenarioBlock {
    /// Fees sitting in the fee collector when the block is processed.
    #[serde(default)]
    pub fees: Coins,
    /// Defaults to the sum of the votes.
    pub total_power: Option<u64>,
    #[serde(default)]
    pub votes: Vec<VoteInfo>,
}

impl ScenarioBlock {
    fn resolved_total_power(&self) -> distr_core::Result<u64> {
        if let Some(total) = self.total_power {
            return Ok(total);
        }
        self.votes
            .iter()
            .try_fold(0u64, |acc, v| acc.checked_add(v.power))
            .ok_or_else(|| DistrError::Config("sum of vote powers overflows u64".to_string()))
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let scenario: Scenario = toml::from_str(&content)?;
        scenario.params.validate()?;
        for (i, block) in scenario.blocks.iter().enumerate() {
            block
                .resolved_total_power()
                .map_err(|e| format!("block {}: {}", i + 1, e))?;
        }
        Ok(scenario)
    }
}

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub blocks: Vec<AllocationSummary>,
    pub community_pool: DecCoins,
    pub module_balance: Coins,
    pub state_root: String,
}

pub fn handle(scenario_path: &Path, db: Option<&Path>, json: bool) -> CliResult {
    let scenario = Scenario::load(scenario_path)?;

    let report = match db {
        Some(path) => {
            if !json {
                print_info(&format!("Persisting to {}", path.display()));
            }
            let store = SledStore::open(path)?;
            run(store, &scenario)?
        }
        None => run(MemoryStore::new(), &scenario)?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for (height, summary) in report.blocks.iter().enumerate() {
        print_block(height + 1, summary);
    }
    println!();
    println!("{} {}", "Community pool:".bold(), show(&report.community_pool).green());
    println!("{} {}", "Module account:".bold(), report.module_balance);
    println!("{} {}", "State root:".bold(), report.state_root.cyan());
    print_success("All invariants hold");
    Ok(())
}

/// Allocate every block through a write buffer: a failed block is
/// discarded and aborts the run; a good one is committed.
pub fn run<S: RewardStore>(
    store: S,
    scenario: &Scenario,
) -> Result<SimulationReport, Box<dyn std::error::Error>> {
    let mut staking = MemoryStaking::new();
    for v in scenario.validators.iter().filter(|v| v.registered) {
        staking.add_validator(Validator {
            operator: ValAddress::new(v.operator.as_str()),
            cons_address: v.cons_address.clone(),
            commission_rate: v.commission_rate,
        });
    }

    // Bank balances are not persisted; back whatever the store already owes.
    let mut bank = MemoryBank::new();
    let (owed, _) = owed_by_module(&store)?.truncate_decimal()?;
    bank.fund(MODULE_NAME, &owed)?;

    let mut keeper = Keeper::new(CacheStore::new(store), bank, staking, scenario.params.clone())?;
    let mut blocks = Vec::with_capacity(scenario.blocks.len());

    for (i, block) in scenario.blocks.iter().enumerate() {
        let total_power = block
            .resolved_total_power()
            .map_err(|e| format!("block {}: {}", i + 1, e))?;
        keeper.bank_mut().fund(FEE_COLLECTOR_NAME, &block.fees)?;
        match keeper.allocate_tokens(total_power, &block.votes) {
            Ok(summary) => {
                keeper.store_mut().write()?;
                blocks.push(summary);
            }
            Err(e) => {
                warn!("block {} rejected, discarding buffered writes: {}", i + 1, e);
                keeper.store_mut().discard();
                return Err(format!("block {} rejected: {}", i + 1, e).into());
            }
        }
    }

    all_invariants(&keeper)?;
    info!("simulated {} blocks, all invariants hold", blocks.len());

    Ok(SimulationReport {
        blocks,
        community_pool: keeper.get_fee_pool()?.community_pool,
        module_balance: keeper.bank().get_all_balances(MODULE_NAME),
        state_root: state_root(keeper.store())?,
    })
}

fn owed_by_module<S: RewardStore>(store: &S) -> distr_core::Result<DecCoins> {
    let mut owed = store.get_fee_pool()?.community_pool;
    for (_, rec) in store.all_outstanding_rewards()? {
        owed = owed.add(&rec.rewards)?;
    }
    Ok(owed)
}

fn show(coins: &DecCoins) -> String {
    if coins.is_zero() {
        "0".to_string()
    } else {
        coins.to_string()
    }
}

fn print_block(height: usize, summary: &AllocationSummary) {
    println!();
    println!(
        "{} {}  {} {}",
        "Block".bold(),
        format!("#{}", height).cyan(),
        "fees".bold(),
        show(&summary.fees_collected)
    );
    for a in &summary.allocations {
        println!(
            "  {} {}  commission {}  shared {}",
            a.validator.to_string().green(),
            show(&a.tokens),
            show(&a.commission),
            show(&a.shared)
        );
    }
    for addr in &summary.skipped {
        println!("  {} {}", "skipped".yellow(), addr);
    }
    println!("  community pool +{}", show(&summary.community_pool_delta));
}
