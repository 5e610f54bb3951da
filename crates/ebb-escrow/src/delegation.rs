//! Delegation entry points.
//!
//! Delegating, switching and undelegating all redirect a lock's *future*
//! power from one holder to another. The holder at the time of the call
//! keeps the rest of the current epoch; the new holder receives the power
//! from the start of the next epoch. Concretely, each redirect
//!
//! - moves the lock's scheduled slope removal from the old future holder's
//!   subjects to the new one's,
//! - queues a pending move of the lock's full curve between the same
//!   subjects at the next epoch start,
//! - records the change in the lock's [`DelegationState`].
//!
//! Several redirects inside one epoch compose: the intermediate holder's
//! pending additions and subtractions cancel out.

use tracing::info;

use ebb_core::error::{AuthError, EscrowError, StateError, ValidityError};
use ebb_core::traits::AssetVault;
use ebb_core::types::{Address, Holder, LockId};

use crate::escrow::{subject_set, VotingEscrow, GLOBAL};
use crate::events::EscrowEvent;
use crate::lock::{DelegationState, Lock};

impl<V: AssetVault> VotingEscrow<V> {
    /// Delegate an undelegated lock to `to`. Effective next epoch.
    pub fn delegate(&mut self, caller: Address, id: LockId, to: Address, now: u64) -> Result<u64, EscrowError> {
        self.require_active()?;
        let lock = self.owned_lock(id, caller)?.clone();
        self.require_floor(lock.expiry, now)?;
        self.require_delegate_target(&lock, to)?;
        let state = lock.delegation.settled(now);
        match state.future_holder() {
            Holder::Owner => {}
            Holder::Delegate(d) if d == to => {
                return Err(ValidityError::AlreadyDelegatedTo(to).into());
            }
            Holder::Delegate(_) => return Err(StateError::AlreadyDelegated(id).into()),
        }

        let effective_at = self.redirect(&lock, state, Holder::Delegate(to), now)?;
        info!(%id, owner = %lock.owner, delegate = %to, effective_at, "escrow: delegated");
        self.emit(EscrowEvent::Delegated {
            lock: id,
            owner: lock.owner,
            delegate: to,
            effective_at,
        });
        Ok(effective_at)
    }

    /// Move a delegated lock to another delegate. Effective next epoch.
    pub fn switch_delegate(
        &mut self,
        caller: Address,
        id: LockId,
        to: Address,
        now: u64,
    ) -> Result<u64, EscrowError> {
        self.require_active()?;
        let lock = self.owned_lock(id, caller)?.clone();
        self.require_floor(lock.expiry, now)?;
        let state = lock.delegation.settled(now);
        let Holder::Delegate(from) = state.future_holder() else {
            return Err(StateError::NotDelegated(id).into());
        };
        if from == to {
            return Err(ValidityError::AlreadyDelegatedTo(to).into());
        }
        self.require_delegate_target(&lock, to)?;

        let effective_at = self.redirect(&lock, state, Holder::Delegate(to), now)?;
        info!(%id, %from, %to, effective_at, "escrow: delegate switched");
        self.emit(EscrowEvent::DelegateSwitched {
            lock: id,
            from,
            to,
            effective_at,
        });
        Ok(effective_at)
    }

    /// Return a delegated lock's power to its owner. Effective next epoch.
    ///
    /// Works even if the delegate has since been deregistered.
    pub fn undelegate(&mut self, caller: Address, id: LockId, now: u64) -> Result<u64, EscrowError> {
        self.require_active()?;
        let lock = self.owned_lock(id, caller)?.clone();
        self.require_floor(lock.expiry, now)?;
        let state = lock.delegation.settled(now);
        let Holder::Delegate(from) = state.future_holder() else {
            return Err(StateError::NotDelegated(id).into());
        };

        let effective_at = self.redirect(&lock, state, Holder::Owner, now)?;
        info!(%id, %from, effective_at, "escrow: undelegated");
        self.emit(EscrowEvent::Undelegated {
            lock: id,
            from,
            effective_at,
        });
        Ok(effective_at)
    }

    fn require_delegate_target(&self, lock: &Lock, to: Address) -> Result<(), EscrowError> {
        if to == lock.owner {
            return Err(ValidityError::SelfDelegation.into());
        }
        if !self.is_registered_delegate(&to) {
            return Err(AuthError::UnregisteredDelegate(to).into());
        }
        Ok(())
    }

    /// Redirect the lock's future power from its current future holder to
    /// `target`, effective at the next epoch start. Returns that timestamp.
    fn redirect(
        &mut self,
        lock: &Lock,
        state: DelegationState,
        target: Holder,
        now: u64,
    ) -> Result<u64, EscrowError> {
        let curve = lock.curve(self.config.max_lock_duration)?;
        let effective_at = self.next_epoch(now);
        let from = state.future_holder().subjects(lock.owner);
        let to = target.subjects(lock.owner);
        let touched = subject_set(&[GLOBAL, from.as_slice(), to.as_slice()]);

        self.require_caught_up(&touched, now)?;
        self.require_headroom(&touched, &[], &curve, now)?;
        for s in &to {
            self.state.schedule.check_add(*s, lock.expiry, curve.slope)?;
        }
        self.state
            .pending
            .check_move(&from, &to, effective_at, &curve)?;
        self.touch(&touched, now)?;
        self.state
            .schedule
            .shift(&from, &to, lock.expiry, curve.slope)?;
        self.state
            .pending
            .enqueue_move(&from, &to, effective_at, &curve)?;
        if let Some(l) = self.state.locks.get_mut(&lock.id) {
            l.delegation = state.redirect(now, target, effective_at);
        }
        Ok(effective_at)
    }
}
