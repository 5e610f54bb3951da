//! Emergency exit for a frozen escrow.
//!
//! Once frozen, the emergency role can return principal to lock owners in
//! batches, regardless of expiry. Checkpoints are left as they are: a
//! frozen escrow's voting power is no longer meaningful.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use ebb_core::error::{ArithmeticError, EscrowError, StateError, ValidityError, VaultError};
use ebb_core::traits::AssetVault;
use ebb_core::types::{Address, LockId, Principal};

use crate::escrow::{RiskState, VotingEscrow};
use crate::events::EscrowEvent;

/// Outcome of one emergency exit batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExitSummary {
    /// Locks whose principal was returned.
    pub processed: usize,
    /// Unknown, already unlocked, or repeated ids.
    pub skipped: usize,
    pub native: u128,
    pub token: u128,
}

impl<V: AssetVault> VotingEscrow<V> {
    /// Return the principal of every listed live lock to its owner.
    ///
    /// Unknown and already-unlocked ids are skipped. The batch is
    /// all-or-nothing with respect to the vault: if the escrowed total cannot
    /// cover it, nothing is released.
    pub fn emergency_exit(&mut self, caller: Address, ids: &[LockId]) -> Result<ExitSummary, EscrowError> {
        self.require_role(self.roles.emergency_exit, "emergency-exit", caller)?;
        if self.state.risk != RiskState::Frozen {
            return Err(StateError::NotFrozen.into());
        }
        if ids.is_empty() {
            return Err(ValidityError::EmptyBatch.into());
        }

        let mut summary = ExitSummary::default();
        let mut seen = BTreeSet::new();
        let mut exits: Vec<(LockId, Address, Principal)> = Vec::new();
        for id in ids {
            if !seen.insert(*id) {
                summary.skipped += 1;
                continue;
            }
            match self.state.locks.get(id) {
                Some(lock) if !lock.unlocked => {
                    summary.native = summary
                        .native
                        .checked_add(lock.principal.native)
                        .ok_or(ArithmeticError::Overflow)?;
                    summary.token = summary
                        .token
                        .checked_add(lock.principal.token)
                        .ok_or(ArithmeticError::Overflow)?;
                    exits.push((*id, lock.owner, lock.principal));
                }
                _ => summary.skipped += 1,
            }
        }

        let escrowed = self.vault.escrowed();
        if escrowed.native < summary.native || escrowed.token < summary.token {
            return Err(VaultError::InsufficientEscrow {
                have: escrowed.native.saturating_add(escrowed.token),
                need: summary.native.saturating_add(summary.token),
            }
            .into());
        }

        for (id, owner, principal) in exits {
            self.vault.withdraw(owner, principal)?;
            if let Some(lock) = self.state.locks.get_mut(&id) {
                lock.principal = Principal::ZERO;
                lock.unlocked = true;
            }
            summary.processed += 1;
            debug!(%id, %owner, %principal, "escrow: emergency exit");
        }

        if summary.processed > 0 {
            warn!(
                processed = summary.processed,
                skipped = summary.skipped,
                native = summary.native,
                token = summary.token,
                "escrow: emergency exit batch"
            );
            self.emit(EscrowEvent::EmergencyExit {
                locks: summary.processed,
                native: summary.native,
                token: summary.token,
            });
        }
        Ok(summary)
    }
}
