//! Core identifiers and value types: accounts, locks, principal, subjects.
//!
//! All amounts are `u128` base units. All timestamps are `u64` Unix seconds.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ArithmeticError;

/// A 20-byte account address.
///
/// Identifies lock owners, delegates and role holders. Displayed as
/// `0x`-prefixed lowercase hex.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address. The escrow rejects it as a lock owner and as a
    /// delegate.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Create an address from a byte array.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Check if this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Parse from hex, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 20] = bytes.try_into().ok()?;
        Some(Self(arr))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

/// Sequential lock identifier, assigned at creation.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct LockId(pub u64);

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lock#{}", self.0)
    }
}

/// The two asset components backing a lock.
///
/// `native` is transferred with the call itself, `token` via a separate asset
/// transfer. Both contribute equally to voting power.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Principal {
    /// Natively transferred component.
    pub native: u128,
    /// Separately transferred asset component.
    pub token: u128,
}

impl Principal {
    /// Zero principal.
    pub const ZERO: Self = Self { native: 0, token: 0 };

    pub fn new(native: u128, token: u128) -> Self {
        Self { native, token }
    }

    /// Sum of both components.
    pub fn total(&self) -> Result<u128, ArithmeticError> {
        self.native
            .checked_add(self.token)
            .ok_or(ArithmeticError::Overflow)
    }

    pub fn is_zero(&self) -> bool {
        self.native == 0 && self.token == 0
    }

    /// Componentwise checked addition.
    pub fn checked_add(&self, other: &Principal) -> Result<Principal, ArithmeticError> {
        Ok(Principal {
            native: self
                .native
                .checked_add(other.native)
                .ok_or(ArithmeticError::Overflow)?,
            token: self
                .token
                .checked_add(other.token)
                .ok_or(ArithmeticError::Overflow)?,
        })
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.native, self.token)
    }
}

/// Anything that owns a checkpoint, a slope-change schedule and a
/// pending-delta queue.
///
/// A single keyed store replaces separate global, per-user, per-delegate and
/// per-pair tables.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode, bincode::Decode,
)]
pub enum Subject {
    /// Aggregate of every live lock.
    Global,
    /// An account in its personal role (undelegated locks it owns).
    User(Address),
    /// An account in its delegate role (locks delegated to it).
    Delegate(Address),
    /// Power flowing from `owner` to `delegate`.
    Pair(Address, Address),
}

impl Subject {
    /// Short label for logs and events.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::User(_) => "user",
            Self::Delegate(_) => "delegate",
            Self::Pair(_, _) => "pair",
        }
    }

    /// Subject for an account in the given role.
    pub fn for_role(account: Address, role: Role) -> Self {
        match role {
            Role::Personal => Self::User(account),
            Role::Delegate => Self::Delegate(account),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::User(a) => write!(f, "user:{a}"),
            Self::Delegate(a) => write!(f, "delegate:{a}"),
            Self::Pair(o, d) => write!(f, "pair:{o}->{d}"),
        }
    }
}

/// Which role of an account a balance query refers to.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Power from the account's own undelegated locks.
    Personal,
    /// Power delegated to the account by others.
    Delegate,
}

/// Who receives a lock's voting power.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash,
    bincode::Encode, bincode::Decode,
)]
pub enum Holder {
    Owner,
    Delegate(Address),
}

impl Holder {
    /// The checkpoint subjects that carry this holder's share of a lock
    /// owned by `owner`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ebb_core::types::{Address, Holder, Subject};
    /// let owner = Address([1; 20]);
    /// let d = Address([2; 20]);
    /// assert_eq!(Holder::Owner.subjects(owner), vec![Subject::User(owner)]);
    /// assert_eq!(
    ///     Holder::Delegate(d).subjects(owner),
    ///     vec![Subject::Delegate(d), Subject::Pair(owner, d)],
    /// );
    /// ```
    pub fn subjects(&self, owner: Address) -> Vec<Subject> {
        match self {
            Self::Owner => vec![Subject::User(owner)],
            Self::Delegate(d) => vec![Subject::Delegate(*d), Subject::Pair(owner, *d)],
        }
    }

    /// The delegate address, if any.
    pub fn delegate(&self) -> Option<Address> {
        match self {
            Self::Owner => None,
            Self::Delegate(d) => Some(*d),
        }
    }
}
