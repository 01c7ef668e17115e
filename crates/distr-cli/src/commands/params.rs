use crate::commands::CliResult;
use crate::{print_info, print_success, ParamsCommands};
use colored::*;
use distr_core::Params;

pub fn handle(action: ParamsCommands) -> CliResult {
    match action {
        ParamsCommands::Check { file } => {
            print_info(&format!("Checking {}...", file.display()));
            let params = Params::load_from_file(&file)?;
            println!("{} {}", "Community tax:".bold(), params.community_tax.to_string().cyan());
            println!(
                "{} {}",
                "Withdraw address enabled:".bold(),
                params.withdraw_addr_enabled
            );
            print_success("Params are valid");
        }
        ParamsCommands::Show => {
            let params = Params::load_from_env()?;
            print!("{}", toml::to_string_pretty(&params)?);
        }
    }
    Ok(())
}
