use crate::commands::{open_existing_store, CliResult};
use crate::{print_info, print_success, GenesisCommands};
use distr_core::invariants::{commission_split_consistent, well_formed_outstanding};
use distr_core::testutil::{MemoryBank, MemoryStaking};
use distr_core::{
    export_genesis, init_genesis, validate_genesis, CacheStore, GenesisState, Keeper, Params,
    RewardStore, SledStore,
};
use std::path::Path;

pub fn handle(action: GenesisCommands, db: &Path) -> CliResult {
    match action {
        GenesisCommands::Export { params, output } => {
            let params = match params {
                Some(path) => Params::load_from_file(&path)?,
                None => Params::load_from_env()?,
            };
            let store = open_existing_store(db)?;
            let keeper = Keeper::new(store, MemoryBank::new(), MemoryStaking::new(), params)?;
            let state = export_genesis(&keeper)?;

            match output {
                Some(path) => {
                    state.save_to_file(&path)?;
                    print_success(&format!(
                        "Exported {} validators to {}",
                        state.outstanding_rewards.len(),
                        path.display()
                    ));
                }
                None => println!("{}", serde_json::to_string_pretty(&state)?),
            }
        }
        GenesisCommands::Import { input } => {
            let state = GenesisState::load_from_file(&input)?;
            let store = SledStore::open(db)?;
            ensure_empty(&store, db)?;
            let mut keeper = Keeper::new(
                CacheStore::new(store),
                MemoryBank::new(),
                MemoryStaking::new(),
                state.params.clone(),
            )?;

            // audit before anything reaches disk
            init_genesis(&mut keeper, &state)?;
            well_formed_outstanding(keeper.store())?;
            commission_split_consistent(keeper.store())?;
            keeper.store_mut().write()?;

            print_success(&format!(
                "Imported {} validators into {}",
                state.outstanding_rewards.len(),
                db.display()
            ));
        }
        GenesisCommands::Validate { input } => {
            print_info(&format!("Validating {}...", input.display()));
            let state = GenesisState::load_from_file(&input)?;
            validate_genesis(&state)?;
            print_success(&format!(
                "Genesis is valid: {} outstanding, {} commission, {} current records",
                state.outstanding_rewards.len(),
                state.accumulated_commissions.len(),
                state.current_rewards.len()
            ));
        }
    }
    Ok(())
}

/// Genesis only writes the keys it lists, so leftovers would survive the import.
fn ensure_empty<S: RewardStore>(store: &S, db: &Path) -> CliResult {
    let empty = store.all_outstanding_rewards()?.is_empty()
        && store.all_accumulated_commissions()?.is_empty()
        && store.all_current_rewards()?.is_empty()
        && store.get_fee_pool()?.community_pool.is_zero();
    if !empty {
        return Err(format!(
            "Reward store at {} already holds state; import needs an empty store",
            db.display()
        )
        .into());
    }
    Ok(())
}
