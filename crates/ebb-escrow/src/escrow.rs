//! The vote-escrow engine.
//!
//! [`VotingEscrow`] owns every lock, the slope-change schedule, the pending
//! delta queue and the checkpoint book, and exposes the lock lifecycle,
//! delegation, query and administrative entry points.
//!
//! Every mutating entry point follows the same order:
//!
//! 1. check risk state, authorization and input validity,
//! 2. check that each subject it touches is within the catch-up bound and
//!    that every curve, schedule and pending sum it will write has room,
//! 3. move assets through the vault,
//! 4. advance the global checkpoint and every touched subject to the
//!    current epoch,
//! 5. apply its own change.
//!
//! Any failure in steps 1 to 3 leaves the engine unchanged.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use ebb_core::config::{EscrowConfig, Roles};
use ebb_core::curve::DecayCurve;
use ebb_core::epoch::{epoch_end, epoch_start, is_aligned, next_epoch_start};
use ebb_core::error::{
    ArithmeticError, AuthError, EscrowError, StateError, ValidityError,
};
use ebb_core::traits::AssetVault;
use ebb_core::types::{Address, Holder, LockId, Principal, Role, Subject};

use crate::checkpoint::{Advance, CheckpointBook};
use crate::events::EscrowEvent;
use crate::lock::{DelegationState, Lock};
use crate::pending::PendingQueue;
use crate::schedule::SlopeSchedule;
use crate::vault::MemoryVault;

/// Risk controls. `Paused → Frozen` is one-way.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default,
    bincode::Encode, bincode::Decode,
)]
pub enum RiskState {
    #[default]
    Active,
    Paused,
    Frozen,
}

/// Everything the engine persists. Nothing here is derivable from the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct EscrowState {
    pub locks: BTreeMap<LockId, Lock>,
    pub next_lock_id: u64,
    pub schedule: SlopeSchedule,
    pub pending: PendingQueue,
    pub checkpoints: CheckpointBook,
    pub delegates: BTreeSet<Address>,
    pub risk: RiskState,
}

/// How a lock mutation moves its slope-change entries.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Reschedule {
    /// Same expiry, more slope.
    Add { at: u64, slope: u128 },
    /// New expiry: cancel the old slope, schedule the new one.
    Move {
        from_at: u64,
        to_at: u64,
        old_slope: u128,
        new_slope: u128,
    },
}

/// Vote-escrow engine over an asset vault.
pub struct VotingEscrow<V: AssetVault = MemoryVault> {
    pub(crate) config: EscrowConfig,
    pub(crate) roles: Roles,
    pub(crate) state: EscrowState,
    pub(crate) vault: V,
    pub(crate) events: Vec<EscrowEvent>,
}

/// The global subject alone.
pub(crate) const GLOBAL: &[Subject] = &[Subject::Global];

/// Sorted, de-duplicated union of subject lists.
pub(crate) fn subject_set(groups: &[&[Subject]]) -> Vec<Subject> {
    let mut out: Vec<Subject> = groups.iter().flat_map(|g| g.iter().copied()).collect();
    out.sort();
    out.dedup();
    out
}

impl<V: AssetVault> VotingEscrow<V> {
    /// Create an empty escrow.
    pub fn new(config: EscrowConfig, roles: Roles, vault: V) -> Result<Self, EscrowError> {
        config.validate()?;
        Ok(Self {
            config,
            roles,
            state: EscrowState::default(),
            vault,
            events: Vec::new(),
        })
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn config(&self) -> &EscrowConfig {
        &self.config
    }

    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    pub fn state(&self) -> &EscrowState {
        &self.state
    }

    pub fn risk_state(&self) -> RiskState {
        self.state.risk
    }

    pub fn vault(&self) -> &V {
        &self.vault
    }

    /// Host-side access to the vault, e.g. to fund accounts.
    pub fn vault_mut(&mut self) -> &mut V {
        &mut self.vault
    }

    /// Events emitted since the last drain.
    pub fn events(&self) -> &[EscrowEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<EscrowEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn is_registered_delegate(&self, account: &Address) -> bool {
        self.state.delegates.contains(account)
    }

    // ------------------------------------------------------------------
    // Shared checks and primitives
    // ------------------------------------------------------------------

    pub(crate) fn current_epoch(&self, now: u64) -> u64 {
        epoch_start(now, self.config.epoch_duration)
    }

    pub(crate) fn next_epoch(&self, now: u64) -> u64 {
        next_epoch_start(now, self.config.epoch_duration)
    }

    pub(crate) fn emit(&mut self, event: EscrowEvent) {
        self.events.push(event);
    }

    pub(crate) fn require_active(&self) -> Result<(), EscrowError> {
        match self.state.risk {
            RiskState::Active => Ok(()),
            RiskState::Paused => Err(StateError::Paused.into()),
            RiskState::Frozen => Err(StateError::Frozen.into()),
        }
    }

    pub(crate) fn require_role(
        &self,
        holder: Address,
        role: &'static str,
        caller: Address,
    ) -> Result<(), EscrowError> {
        if caller != holder {
            return Err(AuthError::MissingRole { role, caller }.into());
        }
        Ok(())
    }

    /// A live lock the caller owns.
    pub(crate) fn owned_lock(&self, id: LockId, caller: Address) -> Result<&Lock, EscrowError> {
        let lock = self
            .state
            .locks
            .get(&id)
            .ok_or(StateError::LockNotFound(id))?;
        if lock.owner != caller {
            return Err(AuthError::NotOwner { lock: id, caller }.into());
        }
        if lock.unlocked {
            return Err(StateError::AlreadyUnlocked(id).into());
        }
        Ok(lock)
    }

    pub(crate) fn require_aligned(&self, t: u64) -> Result<(), EscrowError> {
        if !is_aligned(t, self.config.epoch_duration) {
            return Err(ValidityError::UnalignedTimestamp(t).into());
        }
        Ok(())
    }

    /// `expiry` must lie at least the liveliness floor past the current
    /// epoch start.
    pub(crate) fn require_floor(&self, expiry: u64, now: u64) -> Result<(), EscrowError> {
        let floor = self
            .current_epoch(now)
            .saturating_add(self.config.floor_duration());
        if expiry < floor {
            return Err(ValidityError::BelowLivelinessFloor { expiry, floor }.into());
        }
        Ok(())
    }

    pub(crate) fn require_max_duration(&self, expiry: u64, now: u64) -> Result<(), EscrowError> {
        let max = now.saturating_add(self.config.max_lock_duration);
        if expiry > max {
            return Err(ValidityError::DurationTooLong { expiry, max }.into());
        }
        Ok(())
    }

    /// Reject the call if any subject would need more than
    /// `max_catch_up_epochs` boundaries replayed.
    pub(crate) fn require_caught_up(&self, subjects: &[Subject], now: u64) -> Result<(), EscrowError> {
        let target = self.current_epoch(now);
        let max = self.config.max_catch_up_epochs;
        for subject in subjects {
            let behind =
                self.state
                    .checkpoints
                    .epochs_behind(*subject, target, self.config.epoch_duration);
            if behind > max {
                return Err(StateError::CatchUpRequired {
                    subject: *subject,
                    behind,
                    max,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Fail with the overflow that advancing `touched` to the current epoch
    /// and then crediting `delta` to `credited` would hit.
    pub(crate) fn require_headroom(
        &self,
        touched: &[Subject],
        credited: &[Subject],
        delta: &DecayCurve,
        now: u64,
    ) -> Result<(), EscrowError> {
        for subject in touched {
            let curve = self.curve_of(*subject, now)?;
            if credited.contains(subject) {
                curve.checked_add(delta)?;
            }
        }
        Ok(())
    }

    /// Advance the global checkpoint and each subject to the current epoch.
    pub(crate) fn touch(&mut self, subjects: &[Subject], now: u64) -> Result<(), EscrowError> {
        let target = self.current_epoch(now);
        let all = subject_set(&[GLOBAL, subjects]);
        for subject in all {
            self.advance_subject(subject, target, u64::MAX)?;
        }
        Ok(())
    }

    fn advance_subject(&mut self, subject: Subject, target: u64, max_epochs: u64) -> Result<u64, EscrowError> {
        let state = &mut self.state;
        let outcome = state.checkpoints.advance(
            subject,
            target,
            self.config.epoch_duration,
            max_epochs,
            &mut state.schedule,
            &mut state.pending,
        )?;
        match outcome {
            Advance::Advanced { to, epochs, .. } => {
                if let Some(cp) = self.state.checkpoints.get(subject).copied() {
                    self.emit(EscrowEvent::CheckpointUpdated {
                        subject,
                        epoch: to,
                        curve: cp.curve,
                    });
                }
                Ok(epochs)
            }
            Advance::Anchored | Advance::Unchanged => Ok(0),
        }
    }

    /// Add `delta` to each subject's current curve.
    pub(crate) fn credit(&mut self, subjects: &[Subject], delta: &DecayCurve) -> Result<(), EscrowError> {
        if delta.is_zero() {
            return Ok(());
        }
        for subject in subjects {
            let cp = self.state.checkpoints.credit(*subject, delta)?;
            self.emit(EscrowEvent::CheckpointUpdated {
                subject: *subject,
                epoch: cp.last_updated,
                curve: cp.curve,
            });
        }
        Ok(())
    }

    /// Apply a lock's curve growth: immediately to whoever holds the lock
    /// now, in the slope schedule of whoever will hold it, and as a pending
    /// move between the two when a delegation change is still in flight.
    pub(crate) fn apply_growth(
        &mut self,
        owner: Address,
        delegation: DelegationState,
        delta: &DecayCurve,
        reschedule: Reschedule,
        deposit: Option<Principal>,
        now: u64,
    ) -> Result<(), EscrowError> {
        let current = delegation.holder_at(now);
        let future = delegation.future_holder();
        let current_subjects = current.subjects(owner);
        let future_subjects = future.subjects(owner);
        let held = subject_set(&[GLOBAL, current_subjects.as_slice()]);
        let scheduled = subject_set(&[GLOBAL, future_subjects.as_slice()]);
        let touched = subject_set(&[held.as_slice(), scheduled.as_slice()]);

        self.require_caught_up(&touched, now)?;
        self.require_headroom(&touched, &held, delta, now)?;
        let (at, slope) = match reschedule {
            Reschedule::Add { at, slope } => (at, slope),
            Reschedule::Move { to_at, new_slope, .. } => (to_at, new_slope),
        };
        for s in &scheduled {
            self.state.schedule.check_add(*s, at, slope)?;
        }
        let in_flight = match delegation.pending_until() {
            Some(at) if current != future => Some(at),
            _ => None,
        };
        if let Some(at) = in_flight {
            self.state
                .pending
                .check_move(&current_subjects, &future_subjects, at, delta)?;
        }

        if let Some(amount) = deposit {
            self.vault.deposit(owner, amount)?;
        }
        self.touch(&touched, now)?;
        self.credit(&held, delta)?;

        match reschedule {
            Reschedule::Add { at, slope } => {
                for s in &scheduled {
                    self.state.schedule.add(*s, at, slope)?;
                }
            }
            Reschedule::Move {
                from_at,
                to_at,
                old_slope,
                new_slope,
            } => {
                for s in &scheduled {
                    self.state.schedule.remove(*s, from_at, old_slope);
                    self.state.schedule.add(*s, to_at, new_slope)?;
                }
            }
        }

        if let Some(at) = in_flight {
            self.state
                .pending
                .enqueue_move(&current_subjects, &future_subjects, at, delta)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lock lifecycle
    // ------------------------------------------------------------------

    /// Lock `principal` from `owner` until `expiry`.
    pub fn create_lock(
        &mut self,
        owner: Address,
        principal: Principal,
        expiry: u64,
        now: u64,
    ) -> Result<LockId, EscrowError> {
        self.require_active()?;
        if owner.is_zero() {
            return Err(ValidityError::ZeroAddress.into());
        }
        if principal.is_zero() {
            return Err(ValidityError::ZeroAmount.into());
        }
        self.require_aligned(expiry)?;
        self.require_floor(expiry, now)?;
        self.require_max_duration(expiry, now)?;
        let total = principal.total()?;
        let min = self.config.min_principal();
        if total < min {
            return Err(ArithmeticError::PrincipalTooSmall { total, min }.into());
        }
        let curve = DecayCurve::from_principal(total, expiry, self.config.max_lock_duration)?;

        let subjects = [Subject::Global, Subject::User(owner)];
        self.require_caught_up(&subjects, now)?;
        self.require_headroom(&subjects, &subjects, &curve, now)?;
        for s in subjects {
            self.state.schedule.check_add(s, expiry, curve.slope)?;
        }
        self.vault.deposit(owner, principal)?;
        self.touch(&subjects, now)?;
        self.credit(&subjects, &curve)?;
        for s in subjects {
            self.state.schedule.add(s, expiry, curve.slope)?;
        }

        let id = LockId(self.state.next_lock_id);
        self.state.next_lock_id += 1;
        self.state.locks.insert(
            id,
            Lock {
                id,
                owner,
                principal,
                expiry,
                unlocked: false,
                delegation: DelegationState::NotDelegated,
                created_at: now,
            },
        );
        info!(%id, %owner, %principal, expiry, slope = curve.slope, "escrow: lock created");
        self.emit(EscrowEvent::LockCreated {
            lock: id,
            owner,
            principal,
            expiry,
        });
        Ok(id)
    }

    /// Add `extra` principal to a lock, keeping its expiry.
    pub fn increase_amount(
        &mut self,
        caller: Address,
        id: LockId,
        extra: Principal,
        now: u64,
    ) -> Result<Principal, EscrowError> {
        self.require_active()?;
        if extra.is_zero() {
            return Err(ValidityError::ZeroAmount.into());
        }
        let lock = self.owned_lock(id, caller)?.clone();
        self.require_floor(lock.expiry, now)?;

        let max = self.config.max_lock_duration;
        let principal = lock.principal.checked_add(&extra)?;
        let old = lock.curve(max)?;
        let new = DecayCurve::from_principal(principal.total()?, lock.expiry, max)?;
        let delta = new.increase_over(&old);
        let delegation = lock.delegation.settled(now);

        self.apply_growth(
            lock.owner,
            delegation,
            &delta,
            Reschedule::Add {
                at: lock.expiry,
                slope: delta.slope,
            },
            Some(extra),
            now,
        )?;

        if let Some(l) = self.state.locks.get_mut(&id) {
            l.principal = principal;
            l.delegation = delegation;
        }
        info!(%id, %extra, %principal, "escrow: amount increased");
        self.emit(EscrowEvent::AmountIncreased {
            lock: id,
            added: extra,
            principal,
        });
        Ok(principal)
    }

    /// Move a lock's expiry later.
    pub fn increase_duration(
        &mut self,
        caller: Address,
        id: LockId,
        new_expiry: u64,
        now: u64,
    ) -> Result<(), EscrowError> {
        self.require_active()?;
        let lock = self.owned_lock(id, caller)?.clone();
        self.require_aligned(new_expiry)?;
        self.require_floor(lock.expiry, now)?;
        if new_expiry <= lock.expiry {
            return Err(ValidityError::ExpiryNotExtended {
                current: lock.expiry,
                new: new_expiry,
            }
            .into());
        }
        self.require_max_duration(new_expiry, now)?;

        let max = self.config.max_lock_duration;
        let old = lock.curve(max)?;
        let new = DecayCurve::from_principal(lock.principal.total()?, new_expiry, max)?;
        let delta = new.increase_over(&old);
        let delegation = lock.delegation.settled(now);

        self.apply_growth(
            lock.owner,
            delegation,
            &delta,
            Reschedule::Move {
                from_at: lock.expiry,
                to_at: new_expiry,
                old_slope: old.slope,
                new_slope: new.slope,
            },
            None,
            now,
        )?;

        if let Some(l) = self.state.locks.get_mut(&id) {
            l.expiry = new_expiry;
            l.delegation = delegation;
        }
        info!(%id, old_expiry = lock.expiry, new_expiry, "escrow: duration increased");
        self.emit(EscrowEvent::DurationIncreased {
            lock: id,
            old_expiry: lock.expiry,
            new_expiry,
        });
        Ok(())
    }

    /// Release an expired lock's principal to its owner.
    ///
    /// The owner receives the funds even while the lock is still nominally
    /// delegated; delegation never conveys custody.
    pub fn unlock(&mut self, caller: Address, id: LockId, now: u64) -> Result<Principal, EscrowError> {
        self.require_active()?;
        let lock = self.owned_lock(id, caller)?;
        if !lock.is_expired(now) {
            return Err(StateError::NotExpired {
                expiry: lock.expiry,
                now,
            }
            .into());
        }
        let owner = lock.owner;
        let principal = lock.principal;

        self.require_caught_up(&[Subject::Global], now)?;
        self.vault.withdraw(owner, principal)?;
        self.touch(&[], now)?;

        if let Some(l) = self.state.locks.get_mut(&id) {
            l.principal = Principal::ZERO;
            l.unlocked = true;
            l.delegation = l.delegation.settled(now);
        }
        info!(%id, %owner, %principal, "escrow: unlocked");
        self.emit(EscrowEvent::Unlocked {
            lock: id,
            owner,
            principal,
        });
        Ok(principal)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Curve in force for `subject` during the epoch containing `t`.
    pub fn curve_of(&self, subject: Subject, t: u64) -> Result<DecayCurve, EscrowError> {
        Ok(self.state.checkpoints.curve_at(
            subject,
            t,
            self.config.epoch_duration,
            &self.state.schedule,
            &self.state.pending,
        )?)
    }

    /// Voting power of `subject` at `t`.
    pub fn power_at(&self, subject: Subject, t: u64) -> Result<u128, EscrowError> {
        Ok(self.curve_of(subject, t)?.value_at(t))
    }

    /// Voting power of `account` in `role` at `t`.
    ///
    /// Quantized to epochs: `t` is evaluated on the curve in force for its
    /// whole epoch, so a lock created or grown later in that epoch already
    /// counts at earlier `t` within it.
    pub fn balance_of_at(&self, account: Address, t: u64, role: Role) -> Result<u128, EscrowError> {
        self.power_at(Subject::for_role(account, role), t)
    }

    /// Voting power of `account` in `role` at the end of epoch `epoch`,
    /// using the curve in force during that epoch.
    pub fn balance_at_epoch_end(
        &self,
        account: Address,
        epoch: u64,
        role: Role,
    ) -> Result<u128, EscrowError> {
        self.power_at_epoch_end(Subject::for_role(account, role), epoch)
    }

    /// Voting power of `subject` at the end of epoch `epoch`.
    pub fn power_at_epoch_end(&self, subject: Subject, epoch: u64) -> Result<u128, EscrowError> {
        let duration = self.config.epoch_duration;
        let start = epoch.saturating_mul(duration);
        let curve = self.curve_of(subject, start)?;
        Ok(curve.value_at(epoch_end(epoch, duration)))
    }

    pub fn total_supply_at(&self, t: u64) -> Result<u128, EscrowError> {
        self.power_at(Subject::Global, t)
    }

    /// Power flowing from `owner` to `delegate` at `t`.
    pub fn pair_balance_at(&self, owner: Address, delegate: Address, t: u64) -> Result<u128, EscrowError> {
        self.power_at(Subject::Pair(owner, delegate), t)
    }

    /// Total supply recorded when the global checkpoint crossed boundary `at`.
    pub fn finalized_total_supply(&self, at: u64) -> Option<u128> {
        self.state.checkpoints.finalized_supply(at)
    }

    pub fn lock(&self, id: LockId) -> Option<&Lock> {
        self.state.locks.get(&id)
    }

    pub fn locks_of(&self, owner: &Address) -> Vec<&Lock> {
        self.state
            .locks
            .values()
            .filter(|l| l.owner == *owner)
            .collect()
    }

    /// A single lock's own voting power at `t`.
    pub fn lock_power_at(&self, id: LockId, t: u64) -> Result<u128, EscrowError> {
        let lock = self.lock(id).ok_or(StateError::LockNotFound(id))?;
        Ok(lock.power_at(t, self.config.max_lock_duration)?)
    }

    /// Who receives a lock's voting power at `t`.
    pub fn lock_holder_at(&self, id: LockId, t: u64) -> Result<Holder, EscrowError> {
        let lock = self.lock(id).ok_or(StateError::LockNotFound(id))?;
        Ok(lock.delegation.holder_at(t))
    }

    // ------------------------------------------------------------------
    // Catch-up maintenance
    // ------------------------------------------------------------------

    /// Epochs `subject` lags behind the epoch containing `now`.
    pub fn epochs_behind(&self, subject: Subject, now: u64) -> u64 {
        self.state.checkpoints.epochs_behind(
            subject,
            self.current_epoch(now),
            self.config.epoch_duration,
        )
    }

    /// Advance `subject` by at most `max_epochs` (capped by the configured
    /// catch-up bound). Permissionless. Returns the epochs advanced.
    ///
    /// A subject that has never been anchored is left alone.
    pub fn nudge(&mut self, subject: Subject, now: u64, max_epochs: u64) -> Result<u64, EscrowError> {
        let max = max_epochs.min(self.config.max_catch_up_epochs);
        if max == 0 || self.state.checkpoints.get(subject).is_none() {
            return Ok(0);
        }
        let target = self.current_epoch(now);
        let advanced = self.advance_subject(subject, target, max)?;
        debug!(%subject, advanced, behind = self.epochs_behind(subject, now), "escrow: nudged");
        Ok(advanced)
    }
}
