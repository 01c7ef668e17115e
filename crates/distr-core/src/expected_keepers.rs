//! Collaborators the distribution core calls but does not own.

use crate::coins::Coins;
use crate::error::Result;
use crate::types::{ConsAddress, Validator};

/// Balance-holding module accounts.
pub trait BankKeeper {
    /// Full balance of a module account; unknown modules hold nothing.
    fn get_all_balances(&self, module: &str) -> Coins;

    /// Moves `amount` between two module accounts. Fails on insufficient
    /// balance; for the allocation step that is fatal for the block.
    fn send_coins_from_module_to_module(
        &mut self,
        from: &str,
        to: &str,
        amount: &Coins,
    ) -> Result<()>;
}

/// Validator registry owned by the staking component.
pub trait StakingKeeper {
    /// None when no validator is registered under this consensus address
    /// (for instance it was removed after signing the previous block).
    fn validator_by_cons_addr(&self, addr: &ConsAddress) -> Option<Validator>;
}
