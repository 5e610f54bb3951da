//! # ebb-escrow
//! Vote-escrow engine: locks, delegation, lazy epoch checkpoints and
//! administrative controls.
//!
//! Power is tracked per [`Subject`](ebb_core::types::Subject) as a linear
//! decay curve that is only brought up to date when touched. Delegation
//! changes take effect from the next epoch boundary.

pub mod admin;
pub mod checkpoint;
pub mod delegation;
pub mod emergency;
pub mod escrow;
pub mod events;
pub mod lock;
pub mod pending;
pub mod schedule;
pub mod shared;
pub mod snapshot;
pub mod vault;

#[cfg(test)]
mod testutil;

pub use emergency::ExitSummary;
pub use escrow::{EscrowState, RiskState, VotingEscrow};
pub use events::EscrowEvent;
pub use lock::{DelegationState, Lock};
pub use shared::SharedEscrow;
pub use vault::MemoryVault;
