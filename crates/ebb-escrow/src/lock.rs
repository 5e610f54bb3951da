//! Lock records and delegation state.

use serde::{Deserialize, Serialize};

use ebb_core::curve::DecayCurve;
use ebb_core::error::ArithmeticError;
use ebb_core::types::{Address, Holder, LockId, Principal};

/// Delegation state of a lock.
///
/// A change requested during epoch `e` becomes effective at the start of
/// `e + 1`. Until then the lock is `Pending`: `current` still receives its
/// power, `target` receives it from `effective_at` onward.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default,
    bincode::Encode, bincode::Decode,
)]
pub enum DelegationState {
    #[default]
    NotDelegated,
    Active {
        delegate: Address,
    },
    Pending {
        current: Holder,
        target: Holder,
        effective_at: u64,
    },
}

impl DelegationState {
    /// Settled state for a holder.
    pub fn from_holder(holder: Holder) -> Self {
        match holder {
            Holder::Owner => Self::NotDelegated,
            Holder::Delegate(delegate) => Self::Active { delegate },
        }
    }

    /// Collapse a pending change whose activation epoch has been reached.
    pub fn settled(self, now: u64) -> Self {
        match self {
            Self::Pending {
                target,
                effective_at,
                ..
            } if now >= effective_at => Self::from_holder(target),
            other => other,
        }
    }

    /// Who receives the lock's power at `now`.
    pub fn holder_at(&self, now: u64) -> Holder {
        match *self {
            Self::NotDelegated => Holder::Owner,
            Self::Active { delegate } => Holder::Delegate(delegate),
            Self::Pending {
                current,
                target,
                effective_at,
            } => {
                if now >= effective_at {
                    target
                } else {
                    current
                }
            }
        }
    }

    /// Who will receive the lock's power once any pending change activates.
    pub fn future_holder(&self) -> Holder {
        match *self {
            Self::NotDelegated => Holder::Owner,
            Self::Active { delegate } => Holder::Delegate(delegate),
            Self::Pending { target, .. } => target,
        }
    }

    /// Activation timestamp of a pending change.
    pub fn pending_until(&self) -> Option<u64> {
        match *self {
            Self::Pending { effective_at, .. } => Some(effective_at),
            _ => None,
        }
    }

    /// State after redirecting the lock's future power to `target` at
    /// `effective_at`. The holder at `now` keeps the current epoch.
    pub fn redirect(&self, now: u64, target: Holder, effective_at: u64) -> Self {
        let current = self.holder_at(now);
        if current == target {
            Self::from_holder(target)
        } else {
            Self::Pending {
                current,
                target,
                effective_at,
            }
        }
    }
}

/// A single vote-escrow lock.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Lock {
    pub id: LockId,
    /// Sole authority over the lock and recipient of its principal.
    pub owner: Address,
    pub principal: Principal,
    /// Epoch-aligned expiry timestamp.
    pub expiry: u64,
    /// Terminal. Set by unlock or emergency exit.
    pub unlocked: bool,
    pub delegation: DelegationState,
    pub created_at: u64,
}

impl Lock {
    /// Decay curve derived from the lock's principal and expiry.
    pub fn curve(&self, max_duration: u64) -> Result<DecayCurve, ArithmeticError> {
        if self.unlocked {
            return Ok(DecayCurve::ZERO);
        }
        DecayCurve::from_principal(self.principal.total()?, self.expiry, max_duration)
    }

    /// The lock's own voting power at `t`.
    pub fn power_at(&self, t: u64, max_duration: u64) -> Result<u128, ArithmeticError> {
        Ok(self.curve(max_duration)?.value_at(t))
    }

    /// Delegate the lock's power will go to, once any pending change settles.
    pub fn delegate(&self) -> Option<Address> {
        self.delegation.future_holder().delegate()
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expiry
    }
}
