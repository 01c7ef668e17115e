// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DISTR - IN-MEMORY COLLABORATORS
//
// Bank and staking doubles backed by BTreeMaps. Used by the unit and
// integration tests, the fuzz targets and the CLI simulator.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use std::collections::{BTreeMap, BTreeSet};

use crate::coins::Coins;
use crate::decimal::Dec;
use crate::error::{DistrError, Result};
use crate::expected_keepers::{BankKeeper, StakingKeeper};
use crate::types::{ConsAddress, ValAddress, Validator};

#[derive(Debug, Clone, Default)]
pub struct MemoryBank {
    balances: BTreeMap<String, Coins>,
    /// Modules that refuse incoming transfers.
    blocked: BTreeSet<String>,
}

impl MemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit a module account out of thin air (fee collection, genesis).
    pub fn fund(&mut self, module: &str, amount: &Coins) -> Result<()> {
        let balance = self.get_all_balances(module).add(amount)?;
        self.balances.insert(module.to_string(), balance);
        Ok(())
    }

    pub fn block_receiver(&mut self, module: &str) {
        self.blocked.insert(module.to_string());
    }
}

impl BankKeeper for MemoryBank {
    fn get_all_balances(&self, module: &str) -> Coins {
        self.balances.get(module).cloned().unwrap_or_default()
    }

    fn send_coins_from_module_to_module(
        &mut self,
        from: &str,
        to: &str,
        amount: &Coins,
    ) -> Result<()> {
        if self.blocked.contains(to) {
            return Err(DistrError::UnknownModule(format!(
                "{} cannot receive funds",
                to
            )));
        }
        if amount.is_zero() {
            return Ok(());
        }

        let from_balance = self.get_all_balances(from);
        let remaining =
            from_balance
                .checked_sub(amount)
                .ok_or_else(|| DistrError::InsufficientFunds {
                    module: from.to_string(),
                    needed: amount.to_string(),
                    available: from_balance.to_string(),
                })?;
        let to_balance = self.get_all_balances(to).add(amount)?;

        self.balances.insert(from.to_string(), remaining);
        self.balances.insert(to.to_string(), to_balance);
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStaking {
    validators: BTreeMap<ConsAddress, Validator>,
}

impl MemoryStaking {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_validator(&mut self, validator: Validator) {
        self.validators
            .insert(validator.cons_address.clone(), validator);
    }

    pub fn remove_validator(&mut self, addr: &ConsAddress) -> Option<Validator> {
        self.validators.remove(addr)
    }

    pub fn validators(&self) -> impl Iterator<Item = &Validator> {
        self.validators.values()
    }
}

impl StakingKeeper for MemoryStaking {
    fn validator_by_cons_addr(&self, addr: &ConsAddress) -> Option<Validator> {
        self.validators.get(addr).cloned()
    }
}

/// Validator with a single-byte-derived consensus address, for tests.
pub fn make_validator(operator: &str, cons_seed: u8, commission_rate: Dec) -> Validator {
    Validator {
        operator: ValAddress::new(operator),
        cons_address: ConsAddress::new(vec![cons_seed; 20]),
        commission_rate,
    }
}
