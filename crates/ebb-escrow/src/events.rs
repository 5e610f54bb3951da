//! Notifications emitted for indexers and downstream consumers.

use serde::{Deserialize, Serialize};

use ebb_core::curve::DecayCurve;
use ebb_core::types::{Address, LockId, Principal, Subject};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum EscrowEvent {
    LockCreated {
        lock: LockId,
        owner: Address,
        principal: Principal,
        expiry: u64,
    },
    AmountIncreased {
        lock: LockId,
        added: Principal,
        principal: Principal,
    },
    DurationIncreased {
        lock: LockId,
        old_expiry: u64,
        new_expiry: u64,
    },
    Unlocked {
        lock: LockId,
        owner: Address,
        principal: Principal,
    },
    Delegated {
        lock: LockId,
        owner: Address,
        delegate: Address,
        effective_at: u64,
    },
    DelegateSwitched {
        lock: LockId,
        from: Address,
        to: Address,
        effective_at: u64,
    },
    Undelegated {
        lock: LockId,
        from: Address,
        effective_at: u64,
    },
    /// A subject's aggregate curve changed, by catch-up or by mutation.
    CheckpointUpdated {
        subject: Subject,
        epoch: u64,
        curve: DecayCurve,
    },
    DelegateRegistered(Address),
    DelegateDeregistered(Address),
    Paused,
    Unpaused,
    Frozen,
    /// One summary per emergency exit batch with at least one processed lock.
    EmergencyExit {
        locks: usize,
        native: u128,
        token: u128,
    },
}
