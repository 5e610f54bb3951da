//! Trait interfaces for the Ebb vote-escrow.
//!
//! - [`AssetVault`]: custody of locked principal (ebb-escrow ships an
//!   in-memory implementation; a host chain supplies the real one)

use crate::error::VaultError;
use crate::types::{Address, Principal};

/// Custody of the two principal components.
///
/// The escrow calls [`deposit`](Self::deposit) when principal is locked and
/// [`withdraw`](Self::withdraw) when it is released. Both components move
/// together or not at all: an implementation must check both before moving
/// either.
pub trait AssetVault: Send + Sync {
    /// Move `amount` from `from` into escrow custody.
    fn deposit(&mut self, from: Address, amount: Principal) -> Result<(), VaultError>;

    /// Release `amount` from escrow custody to `to`.
    fn withdraw(&mut self, to: Address, amount: Principal) -> Result<(), VaultError>;

    /// Total principal currently in escrow custody.
    fn escrowed(&self) -> Principal;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    // ------------------------------------------------------------------
    // Mock: AssetVault that only tracks custody, never balances
    // ------------------------------------------------------------------

    #[derive(Default)]
    struct CountingVault {
        escrow: Principal,
        released: HashMap<Address, Principal>,
    }

    impl AssetVault for CountingVault {
        fn deposit(&mut self, _from: Address, amount: Principal) -> Result<(), VaultError> {
            self.escrow.native += amount.native;
            self.escrow.token += amount.token;
            Ok(())
        }

        fn withdraw(&mut self, to: Address, amount: Principal) -> Result<(), VaultError> {
            if amount.native > self.escrow.native || amount.token > self.escrow.token {
                return Err(VaultError::InsufficientEscrow {
                    have: self.escrow.native + self.escrow.token,
                    need: amount.native + amount.token,
                });
            }
            self.escrow.native -= amount.native;
            self.escrow.token -= amount.token;
            let entry = self.released.entry(to).or_default();
            entry.native += amount.native;
            entry.token += amount.token;
            Ok(())
        }

        fn escrowed(&self) -> Principal {
            self.escrow
        }
    }

    #[test]
    fn vault_is_object_safe() {
        let mut v = CountingVault::default();
        let dyn_v: &mut dyn AssetVault = &mut v;
        dyn_v.deposit(Address([1; 20]), Principal::new(5, 6)).unwrap();
        assert_eq!(dyn_v.escrowed(), Principal::new(5, 6));
    }

    #[test]
    fn withdraw_beyond_escrow_fails() {
        let mut v = CountingVault::default();
        v.deposit(Address([1; 20]), Principal::new(5, 0)).unwrap();
        assert!(v.withdraw(Address([1; 20]), Principal::new(6, 0)).is_err());
        v.withdraw(Address([2; 20]), Principal::new(5, 0)).unwrap();
        assert_eq!(v.released[&Address([2; 20])], Principal::new(5, 0));
    }
}
