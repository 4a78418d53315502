//! # Trusted Remote Registry
//!
//! Per-remote-chain authorized counterpart pairs, written only by the owner.
//! Every inbound event is authenticated against this table before it can
//! touch a record.

use crate::domain::{Address, AggregatorError, ChainId, RemotePair};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::info;

/// Owner-administered trust table.
#[derive(Debug)]
pub struct TrustedRemoteRegistry {
    owner: RwLock<Address>,
    remotes: RwLock<HashMap<ChainId, RemotePair>>,
}

impl TrustedRemoteRegistry {
    /// Empty registry administered by `owner`.
    pub fn new(owner: Address) -> Self {
        Self {
            owner: RwLock::new(owner),
            remotes: RwLock::new(HashMap::new()),
        }
    }

    /// Current owner.
    pub fn owner(&self) -> Address {
        *self.owner.read()
    }

    /// Fail with `NotOwner` unless `caller` is the owner.
    pub fn ensure_owner(&self, caller: &Address) -> Result<(), AggregatorError> {
        if *caller != *self.owner.read() {
            return Err(AggregatorError::NotOwner);
        }
        Ok(())
    }

    /// Register or overwrite the pair for `chain`.
    pub fn set_trusted_remote(
        &self,
        caller: Address,
        chain: ChainId,
        pair: RemotePair,
    ) -> Result<(), AggregatorError> {
        self.ensure_owner(&caller)?;
        let previous = self.remotes.write().insert(chain, pair);
        info!(
            chain = %chain,
            remote = %hex::encode(pair.remote),
            replaced = previous.is_some(),
            "Trusted remote set"
        );
        Ok(())
    }

    /// Register from the packed 40-byte `remote || local` path.
    pub fn set_trusted_remote_path(
        &self,
        caller: Address,
        chain: ChainId,
        path: &[u8],
    ) -> Result<(), AggregatorError> {
        self.ensure_owner(&caller)?;
        let pair = RemotePair::from_path(path)?;
        self.set_trusted_remote(caller, chain, pair)
    }

    /// Drop the entry for `chain`. Subsequent events from it are untrusted.
    pub fn remove_trusted_remote(
        &self,
        caller: Address,
        chain: ChainId,
    ) -> Result<Option<RemotePair>, AggregatorError> {
        self.ensure_owner(&caller)?;
        let removed = self.remotes.write().remove(&chain);
        info!(chain = %chain, removed = removed.is_some(), "Trusted remote removed");
        Ok(removed)
    }

    /// Hand administration to `new_owner`.
    pub fn transfer_ownership(
        &self,
        caller: Address,
        new_owner: Address,
    ) -> Result<(), AggregatorError> {
        let mut owner = self.owner.write();
        if caller != *owner {
            return Err(AggregatorError::NotOwner);
        }
        *owner = new_owner;
        info!(new_owner = %hex::encode(new_owner), "Ownership transferred");
        Ok(())
    }

    /// Pure lookup: is `claimed_remote` the registered counterpart on `chain`?
    pub fn is_trusted(&self, chain: ChainId, claimed_remote: &Address) -> bool {
        self.remotes
            .read()
            .get(&chain)
            .is_some_and(|pair| pair.remote == *claimed_remote)
    }

    /// Registered pair for `chain`.
    pub fn trusted_remote(&self, chain: ChainId) -> Option<RemotePair> {
        self.remotes.read().get(&chain).copied()
    }

    /// Registered pair for `chain` as packed path bytes.
    pub fn trusted_remote_path(&self, chain: ChainId) -> Option<[u8; 40]> {
        self.trusted_remote(chain).map(|pair| pair.to_path())
    }
}
