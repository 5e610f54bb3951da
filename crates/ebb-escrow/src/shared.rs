//! Thread-safe handle to an escrow.

use std::sync::Arc;

use parking_lot::RwLock;

use ebb_core::error::EscrowError;
use ebb_core::traits::AssetVault;
use ebb_core::types::{Address, LockId, Principal, Role, Subject};

use crate::escrow::VotingEscrow;
use crate::vault::MemoryVault;

/// Cloneable handle sharing one [`VotingEscrow`] behind a `RwLock`.
///
/// Queries take a read lock, so they run concurrently with each other;
/// mutations serialize on the write lock.
pub struct SharedEscrow<V: AssetVault = MemoryVault> {
    inner: Arc<RwLock<VotingEscrow<V>>>,
}

impl<V: AssetVault> Clone for SharedEscrow<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: AssetVault> SharedEscrow<V> {
    pub fn new(escrow: VotingEscrow<V>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(escrow)),
        }
    }

    /// Run `f` under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&VotingEscrow<V>) -> R) -> R {
        f(&self.inner.read())
    }

    /// Run `f` under the write lock.
    pub fn write<R>(&self, f: impl FnOnce(&mut VotingEscrow<V>) -> R) -> R {
        f(&mut self.inner.write())
    }

    pub fn create_lock(
        &self,
        owner: Address,
        principal: Principal,
        expiry: u64,
        now: u64,
    ) -> Result<LockId, EscrowError> {
        self.inner.write().create_lock(owner, principal, expiry, now)
    }

    pub fn balance_of_at(&self, account: Address, t: u64, role: Role) -> Result<u128, EscrowError> {
        self.inner.read().balance_of_at(account, t, role)
    }

    pub fn total_supply_at(&self, t: u64) -> Result<u128, EscrowError> {
        self.inner.read().total_supply_at(t)
    }

    pub fn nudge(&self, subject: Subject, now: u64, max_epochs: u64) -> Result<u64, EscrowError> {
        self.inner.write().nudge(subject, now, max_epochs)
    }
}
