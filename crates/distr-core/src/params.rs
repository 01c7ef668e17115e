use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::decimal::Dec;
use crate::error::{DistrError, Result};

/// Governance-owned distribution parameters.
/// Read-only from the allocation step's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// Fraction of every block's fees diverted to the community pool, in [0, 1).
    pub community_tax: Dec,
    /// Withdrawal-side flag; allocation ignores it.
    #[serde(default = "default_withdraw_addr_enabled")]
    pub withdraw_addr_enabled: bool,
}

fn default_withdraw_addr_enabled() -> bool {
    true
}

impl Default for Params {
    /// 2% community tax.
    fn default() -> Self {
        Self {
            community_tax: Dec::from_int(2).quo_truncate(Dec::from_int(100)),
            withdraw_addr_enabled: true,
        }
    }
}

impl Params {
    /// Load params from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let params: Params = toml::from_str(&content)?;
        params.validate()?;
        Ok(params)
    }

    /// Load params from environment variables, falling back to defaults.
    /// Useful for containerized deployments.
    pub fn load_from_env() -> Result<Self> {
        let defaults = Params::default();

        let community_tax = match std::env::var("DISTR_COMMUNITY_TAX") {
            Ok(v) => v.parse()?,
            Err(_) => defaults.community_tax,
        };

        let withdraw_addr_enabled = match std::env::var("DISTR_WITHDRAW_ADDR_ENABLED") {
            Ok(v) => v.parse().map_err(|_| {
                DistrError::Config(format!("DISTR_WITHDRAW_ADDR_ENABLED: not a bool: {:?}", v))
            })?,
            Err(_) => defaults.withdraw_addr_enabled,
        };

        let params = Self {
            community_tax,
            withdraw_addr_enabled,
        };
        params.validate()?;
        Ok(params)
    }

    /// Save params to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.community_tax >= Dec::one() {
            return Err(DistrError::InvalidParams(format!(
                "community tax must be less than one: {}",
                self.community_tax
            )));
        }
        Ok(())
    }
}
