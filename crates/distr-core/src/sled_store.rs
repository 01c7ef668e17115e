// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DISTR - PERSISTENT REWARD STORE
//
// sled embedded database, one tree per reward table plus a metadata tree
// for the fee pool singleton. Values are JSON; keys are operator addresses.
// Batches are committed with a single cross-tree transaction.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::{Db, Tree};
use std::path::Path;

use crate::error::{DistrError, Result};
use crate::store::{RewardStore, StoreBatch};
use crate::types::{
    FeePool, ValAddress, ValidatorAccumulatedCommission, ValidatorCurrentRewards,
    ValidatorOutstandingRewards,
};

const TREE_OUTSTANDING: &str = "outstanding_rewards";
const TREE_COMMISSION: &str = "accumulated_commission";
const TREE_CURRENT: &str = "current_rewards";
const TREE_META: &str = "metadata";
const KEY_FEE_POOL: &[u8] = b"fee_pool";

pub struct SledStore {
    db: Db,
    outstanding: Tree,
    commission: Tree,
    current: Tree,
    meta: Tree,
}

impl SledStore {
    /// Open or create the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path.as_ref())?;
        Ok(Self {
            outstanding: db.open_tree(TREE_OUTSTANDING)?,
            commission: db.open_tree(TREE_COMMISSION)?,
            current: db.open_tree(TREE_CURRENT)?,
            meta: db.open_tree(TREE_META)?,
            db,
        })
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

fn read<T: DeserializeOwned + Default>(tree: &Tree, key: &[u8]) -> Result<T> {
    match tree.get(key)? {
        Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
        None => Ok(T::default()),
    }
}

fn write<T: Serialize>(tree: &Tree, key: &[u8], value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)?;
    tree.insert(key, bytes)?;
    Ok(())
}

fn read_all<T: DeserializeOwned>(tree: &Tree) -> Result<Vec<(ValAddress, T)>> {
    let mut out = Vec::new();
    // sled iterates in byte order, which is the String order of the keys
    for item in tree.iter() {
        let (key, value) = item?;
        let addr = String::from_utf8(key.to_vec())
            .map_err(|e| DistrError::CorruptRecord(format!("validator key: {}", e)))?;
        out.push((ValAddress::new(addr), serde_json::from_slice(&value)?));
    }
    Ok(out)
}

fn encode_all<T: Serialize>(
    entries: &std::collections::BTreeMap<ValAddress, T>,
) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
    entries
        .iter()
        .map(|(k, v)| -> Result<(Vec<u8>, Vec<u8>)> {
            Ok((k.as_bytes().to_vec(), serde_json::to_vec(v)?))
        })
        .collect()
}

impl RewardStore for SledStore {
    fn get_outstanding_rewards(&self, val: &ValAddress) -> Result<ValidatorOutstandingRewards> {
        read(&self.outstanding, val.as_bytes())
    }

    fn set_outstanding_rewards(
        &mut self,
        val: &ValAddress,
        rewards: &ValidatorOutstandingRewards,
    ) -> Result<()> {
        write(&self.outstanding, val.as_bytes(), rewards)
    }

    fn get_accumulated_commission(
        &self,
        val: &ValAddress,
    ) -> Result<ValidatorAccumulatedCommission> {
        read(&self.commission, val.as_bytes())
    }

    fn set_accumulated_commission(
        &mut self,
        val: &ValAddress,
        commission: &ValidatorAccumulatedCommission,
    ) -> Result<()> {
        write(&self.commission, val.as_bytes(), commission)
    }

    fn get_current_rewards(&self, val: &ValAddress) -> Result<ValidatorCurrentRewards> {
        read(&self.current, val.as_bytes())
    }

    fn set_current_rewards(
        &mut self,
        val: &ValAddress,
        rewards: &ValidatorCurrentRewards,
    ) -> Result<()> {
        write(&self.current, val.as_bytes(), rewards)
    }

    fn get_fee_pool(&self) -> Result<FeePool> {
        read(&self.meta, KEY_FEE_POOL)
    }

    fn set_fee_pool(&mut self, pool: &FeePool) -> Result<()> {
        write(&self.meta, KEY_FEE_POOL, pool)
    }

    fn all_outstanding_rewards(&self) -> Result<Vec<(ValAddress, ValidatorOutstandingRewards)>> {
        read_all(&self.outstanding)
    }

    fn all_accumulated_commissions(
        &self,
    ) -> Result<Vec<(ValAddress, ValidatorAccumulatedCommission)>> {
        read_all(&self.commission)
    }

    fn all_current_rewards(&self) -> Result<Vec<(ValAddress, ValidatorCurrentRewards)>> {
        read_all(&self.current)
    }

    /// All four trees commit together or not at all, then flush.
    fn commit(&mut self, batch: StoreBatch) -> Result<()> {
        use sled::Transactional;

        // Serialize outside the transaction; the closure may be retried.
        let outstanding = encode_all(&batch.outstanding)?;
        let commission = encode_all(&batch.commission)?;
        let current = encode_all(&batch.current)?;
        let fee_pool = batch
            .fee_pool
            .as_ref()
            .map(serde_json::to_vec)
            .transpose()?;

        (&self.outstanding, &self.commission, &self.current, &self.meta)
            .transaction(|(tx_out, tx_comm, tx_cur, tx_meta)| {
                for (key, value) in &outstanding {
                    tx_out.insert(key.as_slice(), value.as_slice())?;
                }
                for (key, value) in &commission {
                    tx_comm.insert(key.as_slice(), value.as_slice())?;
                }
                for (key, value) in &current {
                    tx_cur.insert(key.as_slice(), value.as_slice())?;
                }
                if let Some(pool) = &fee_pool {
                    tx_meta.insert(KEY_FEE_POOL, pool.as_slice())?;
                }
                Ok(())
            })
            .map_err(|e: sled::transaction::TransactionError<()>| {
                DistrError::Transaction(format!("{:?}", e))
            })?;

        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coins::DecCoins;
    use crate::decimal::Dec;
    use crate::store::{state_root, CacheStore};
    use tempfile::tempdir;

    fn coins(amount: u128) -> DecCoins {
        DecCoins::single("stake", Dec::from_int(amount)).unwrap()
    }

    #[test]
    fn test_unset_keys_read_as_zero() {
        let dir = tempdir().unwrap();
        let store = SledStore::open(dir.path()).unwrap();
        let val = ValAddress::new("valoper1");
        assert!(store.get_outstanding_rewards(&val).unwrap().rewards.is_zero());
        assert!(store.get_fee_pool().unwrap().community_pool.is_zero());
        assert!(store.all_current_rewards().unwrap().is_empty());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let val = ValAddress::new("valoper1");
        let root = {
            let mut store = SledStore::open(dir.path()).unwrap();
            store
                .set_accumulated_commission(
                    &val,
                    &ValidatorAccumulatedCommission {
                        commission: coins(5),
                    },
                )
                .unwrap();
            store
                .set_fee_pool(&FeePool {
                    community_pool: coins(2),
                })
                .unwrap();
            store.flush().unwrap();
            state_root(&store).unwrap()
        };

        let store = SledStore::open(dir.path()).unwrap();
        assert_eq!(
            store.get_accumulated_commission(&val).unwrap().commission,
            coins(5)
        );
        assert_eq!(store.get_fee_pool().unwrap().community_pool, coins(2));
        assert_eq!(state_root(&store).unwrap(), root);
    }

    #[test]
    fn test_batch_commit_through_cache() {
        let dir = tempdir().unwrap();
        let mut cache = CacheStore::new(SledStore::open(dir.path()).unwrap());
        let v1 = ValAddress::new("valoper1");
        let v2 = ValAddress::new("valoper2");
        cache
            .set_outstanding_rewards(&v2, &ValidatorOutstandingRewards { rewards: coins(2) })
            .unwrap();
        cache
            .set_outstanding_rewards(&v1, &ValidatorOutstandingRewards { rewards: coins(1) })
            .unwrap();
        cache
            .set_current_rewards(
                &v1,
                &ValidatorCurrentRewards {
                    rewards: coins(1),
                    period: 3,
                },
            )
            .unwrap();
        cache.write().unwrap();

        let store = cache.into_inner();
        let all = store.all_outstanding_rewards().unwrap();
        let keys: Vec<&str> = all.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["valoper1", "valoper2"]);
        assert_eq!(store.get_current_rewards(&v1).unwrap().period, 3);
    }
}
