//! Shared test helpers for scenario and property tests.

use std::sync::Once;

use ebb_core::config::{EscrowConfig, Roles};
use ebb_core::types::{Address, Principal, Role};
use ebb_escrow::{MemoryVault, VotingEscrow};

pub const ADMIN: Address = Address([0xAA; 20]);

/// Address from a seed byte.
pub fn addr(seed: u8) -> Address {
    Address([seed; 20])
}

/// Start of epoch `k` under `config`.
pub fn epoch_at(config: &EscrowConfig, k: u64) -> u64 {
    k * config.epoch_duration
}

/// Small, fast configuration: 100-second epochs, 100-epoch maximum lock.
pub fn small_config(max_catch_up_epochs: u64) -> EscrowConfig {
    EscrowConfig {
        epoch_duration: 100,
        max_lock_duration: 10_000,
        min_lock_epochs: 3,
        max_catch_up_epochs,
    }
}

/// Escrow with `accounts` funded with `balance` in each component, and the
/// given delegates registered. Setup events are drained.
pub fn funded_escrow(
    config: EscrowConfig,
    accounts: &[Address],
    balance: u128,
    delegates: &[Address],
) -> VotingEscrow<MemoryVault> {
    let mut vault = MemoryVault::new();
    for a in accounts {
        vault.fund(*a, Principal::new(balance, balance));
    }
    let mut e = VotingEscrow::new(config, Roles::single(ADMIN), vault)
        .unwrap_or_else(|err| panic!("bad test config: {err}"));
    for d in delegates {
        e.register_delegate(ADMIN, *d)
            .unwrap_or_else(|err| panic!("register {d}: {err}"));
    }
    e.drain_events();
    e
}

/// Sum of every lock's own power at `t`.
pub fn live_lock_power(e: &VotingEscrow<MemoryVault>, t: u64) -> u128 {
    e.state()
        .locks
        .values()
        .filter(|l| !l.unlocked)
        .map(|l| {
            l.power_at(t, e.config().max_lock_duration)
                .unwrap_or_else(|err| panic!("power of {}: {err}", l.id))
        })
        .sum()
}

/// Sum of personal and delegate balances of `accounts` at `t`.
pub fn attributed_power(e: &VotingEscrow<MemoryVault>, accounts: &[Address], t: u64) -> u128 {
    accounts
        .iter()
        .map(|a| {
            let personal = e.balance_of_at(*a, t, Role::Personal).unwrap_or(0);
            let delegated = e.balance_of_at(*a, t, Role::Delegate).unwrap_or(0);
            personal + delegated
        })
        .sum()
}

static LOGGING: Once = Once::new();

/// Route `tracing` output to the test harness. Honors `RUST_LOG`; defaults
/// to `warn`.
pub fn init_test_logging() {
    use tracing_subscriber::filter::EnvFilter;

    LOGGING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}
