use crate::commands::{open_existing_store, CliResult};
use crate::QueryCommands;
use colored::*;
use distr_core::{state_root, DecCoins, RewardStore, ValAddress};
use std::path::Path;

pub fn handle(action: QueryCommands, db: &Path) -> CliResult {
    let store = open_existing_store(db)?;

    match action {
        QueryCommands::Outstanding { validator } => {
            let val = ValAddress::new(validator);
            let rec = store.get_outstanding_rewards(&val)?;
            print_coins("Outstanding rewards", &val, &rec.rewards);
        }
        QueryCommands::Commission { validator } => {
            let val = ValAddress::new(validator);
            let rec = store.get_accumulated_commission(&val)?;
            print_coins("Accumulated commission", &val, &rec.commission);
        }
        QueryCommands::Current { validator } => {
            let val = ValAddress::new(validator);
            let rec = store.get_current_rewards(&val)?;
            print_coins("Current rewards", &val, &rec.rewards);
            println!("{} {}", "Period:".bold(), rec.period);
        }
        QueryCommands::FeePool => {
            let pool = store.get_fee_pool()?;
            println!(
                "{} {}",
                "Community pool:".bold(),
                display_coins(&pool.community_pool).green()
            );
        }
        QueryCommands::StateRoot => {
            println!("{}", state_root(&store)?);
        }
    }
    Ok(())
}

fn display_coins(coins: &DecCoins) -> String {
    if coins.is_zero() {
        "(none)".to_string()
    } else {
        coins.to_string()
    }
}

fn print_coins(label: &str, val: &ValAddress, coins: &DecCoins) {
    println!("{} {}", "Validator:".bold(), val.to_string().cyan());
    println!("{} {}", format!("{}:", label).bold(), display_coins(coins).green());
}
