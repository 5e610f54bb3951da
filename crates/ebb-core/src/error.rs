//! Error types for the Ebb vote-escrow.
use thiserror::Error;

use crate::types::{Address, LockId, Subject};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("{caller} is not the owner of {lock}")] NotOwner { lock: LockId, caller: Address },
    #[error("{0} is not a registered delegate")] UnregisteredDelegate(Address),
    #[error("{caller} lacks the {role} role")] MissingRole { role: &'static str, caller: Address },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidityError {
    #[error("timestamp {0} is not epoch-aligned")] UnalignedTimestamp(u64),
    #[error("expiry {expiry} below liveliness floor {floor}")] BelowLivelinessFloor { expiry: u64, floor: u64 },
    #[error("expiry {expiry} exceeds maximum {max}")] DurationTooLong { expiry: u64, max: u64 },
    #[error("empty batch")] EmptyBatch,
    #[error("cannot delegate to self")] SelfDelegation,
    #[error("already delegated to {0}")] AlreadyDelegatedTo(Address),
    #[error("new expiry {new} does not extend {current}")] ExpiryNotExtended { current: u64, new: u64 },
    #[error("zero amount")] ZeroAmount,
    #[error("zero address")] ZeroAddress,
    #[error("invalid config: {0}")] InvalidConfig(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("lock not found: {0}")] LockNotFound(LockId),
    #[error("{0} already unlocked")] AlreadyUnlocked(LockId),
    #[error("{0} is not delegated")] NotDelegated(LockId),
    #[error("{0} is already delegated")] AlreadyDelegated(LockId),
    #[error("lock expires at {expiry}, now {now}")] NotExpired { expiry: u64, now: u64 },
    #[error("escrow is paused")] Paused,
    #[error("escrow is frozen")] Frozen,
    #[error("escrow is not paused")] NotPaused,
    #[error("escrow is not frozen")] NotFrozen,
    #[error("escrow is already frozen")] AlreadyFrozen,
    #[error("{subject} is {behind} epochs behind (max {max}); nudge first")] CatchUpRequired { subject: Subject, behind: u64, max: u64 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArithmeticError {
    #[error("principal {total} below minimum {min}")] PrincipalTooSmall { total: u128, min: u128 },
    #[error("arithmetic overflow")] Overflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    #[error("insufficient balance for {account}: have {have}, need {need}")] InsufficientBalance { account: Address, have: u128, need: u128 },
    #[error("insufficient escrow: have {have}, need {need}")] InsufficientEscrow { have: u128, need: u128 },
}

/// Coarse classification of an [`EscrowError`], for callers that only need
/// to tell "not authorized" from "bad input" from "wrong state".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Authorization,
    Validity,
    State,
    Arithmetic,
    Vault,
    Storage,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EscrowError {
    #[error(transparent)] Auth(#[from] AuthError),
    #[error(transparent)] Validity(#[from] ValidityError),
    #[error(transparent)] State(#[from] StateError),
    #[error(transparent)] Arithmetic(#[from] ArithmeticError),
    #[error(transparent)] Vault(#[from] VaultError),
    #[error("storage: {0}")] Storage(String),
}

impl EscrowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth(_) => ErrorKind::Authorization,
            Self::Validity(_) => ErrorKind::Validity,
            Self::State(_) => ErrorKind::State,
            Self::Arithmetic(_) => ErrorKind::Arithmetic,
            Self::Vault(_) => ErrorKind::Vault,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}
