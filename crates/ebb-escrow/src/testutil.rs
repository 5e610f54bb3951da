//! Fixtures shared by this crate's unit tests.

use ebb_core::config::{EscrowConfig, Roles};
use ebb_core::types::{Address, Principal};

use crate::escrow::VotingEscrow;
use crate::vault::MemoryVault;

pub const EPOCH: u64 = 100;
pub const MAX: u64 = 100 * EPOCH;
pub const CATCH_UP: u64 = 50;

pub const ADMIN: Address = Address([0xAA; 20]);
pub const DELEGATE: Address = Address([0xD1; 20]);
pub const OTHER_DELEGATE: Address = Address([0xD2; 20]);

pub fn addr(seed: u8) -> Address {
    Address([seed; 20])
}

pub fn epoch(k: u64) -> u64 {
    k * EPOCH
}

/// Native-only principal.
pub fn p(amount: u128) -> Principal {
    Principal::new(amount, 0)
}

pub fn config() -> EscrowConfig {
    EscrowConfig {
        epoch_duration: EPOCH,
        max_lock_duration: MAX,
        min_lock_epochs: 3,
        max_catch_up_epochs: CATCH_UP,
    }
}

/// Escrow with accounts 1..=16 funded, two registered delegates and no
/// pending events.
pub fn escrow() -> VotingEscrow<MemoryVault> {
    let mut vault = MemoryVault::new();
    for seed in 1..=16 {
        vault.fund(addr(seed), Principal::new(10_000_000, 10_000_000));
    }
    let mut e = VotingEscrow::new(config(), Roles::single(ADMIN), vault).unwrap();
    e.register_delegate(ADMIN, DELEGATE).unwrap();
    e.register_delegate(ADMIN, OTHER_DELEGATE).unwrap();
    e.drain_events();
    e
}
