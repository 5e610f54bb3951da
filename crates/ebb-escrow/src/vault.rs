//! In-memory asset vault.
//!
//! [`MemoryVault`] implements [`AssetVault`] over plain maps. It is suitable
//! for tests and simulations; a host environment supplies real custody.

use std::collections::BTreeMap;

use ebb_core::error::VaultError;
use ebb_core::traits::AssetVault;
use ebb_core::types::{Address, Principal};

/// Free balances per account plus the escrowed total.
#[derive(Debug, Clone, Default)]
pub struct MemoryVault {
    balances: BTreeMap<Address, Principal>,
    escrow: Principal,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `account` with spendable principal.
    pub fn fund(&mut self, account: Address, amount: Principal) {
        let entry = self.balances.entry(account).or_default();
        entry.native = entry.native.saturating_add(amount.native);
        entry.token = entry.token.saturating_add(amount.token);
    }

    /// Spendable balance of `account`.
    pub fn balance_of(&self, account: &Address) -> Principal {
        self.balances.get(account).copied().unwrap_or_default()
    }
}

impl AssetVault for MemoryVault {
    fn deposit(&mut self, from: Address, amount: Principal) -> Result<(), VaultError> {
        let have = self.balance_of(&from);
        if have.native < amount.native || have.token < amount.token {
            return Err(VaultError::InsufficientBalance {
                account: from,
                have: have.native.saturating_add(have.token),
                need: amount.native.saturating_add(amount.token),
            });
        }
        self.balances.insert(
            from,
            Principal {
                native: have.native - amount.native,
                token: have.token - amount.token,
            },
        );
        self.escrow.native = self.escrow.native.saturating_add(amount.native);
        self.escrow.token = self.escrow.token.saturating_add(amount.token);
        Ok(())
    }

    fn withdraw(&mut self, to: Address, amount: Principal) -> Result<(), VaultError> {
        if self.escrow.native < amount.native || self.escrow.token < amount.token {
            return Err(VaultError::InsufficientEscrow {
                have: self.escrow.native.saturating_add(self.escrow.token),
                need: amount.native.saturating_add(amount.token),
            });
        }
        self.escrow.native -= amount.native;
        self.escrow.token -= amount.token;
        self.fund(to, amount);
        Ok(())
    }

    fn escrowed(&self) -> Principal {
        self.escrow
    }
}
