//! Protocol constants. All amounts are in base units (1 EBB = 10^18 units).
//! All timestamps are Unix seconds.

/// One whole token in base units.
pub const UNIT: u128 = 1_000_000_000_000_000_000;

/// Length of one epoch in seconds (one week).
///
/// Every expiry, delegation activation and checkpoint boundary is a
/// multiple of this value.
///
/// # Examples
///
/// ```
/// use ebb_core::constants::EPOCH_DURATION;
/// assert_eq!(EPOCH_DURATION, 7 * 24 * 60 * 60);
/// ```
pub const EPOCH_DURATION: u64 = 7 * 24 * 60 * 60;

/// Maximum lock duration: 104 epochs (two years).
///
/// A lock of exactly this duration starts with voting power equal to its
/// principal (minus slope truncation).
pub const MAX_LOCK_DURATION: u64 = 104 * EPOCH_DURATION;

/// Liveliness floor, in epochs.
///
/// A lock must expire at least this many epochs after the start of the epoch
/// in which it is created, mutated or (un)delegated. Delegation changes only
/// take effect at the next epoch boundary, so three epochs guarantee strictly
/// positive power for at least one full epoch after activation.
pub const MIN_LOCK_EPOCHS: u64 = 3;

/// Default bound on the number of epochs a single mutating call may catch a
/// checkpoint up by. Larger gaps must be closed with `nudge` first.
pub const MAX_CATCH_UP_EPOCHS: u64 = 128;

/// Testnet epoch length (one hour), for fast iteration.
pub const TESTNET_EPOCH_DURATION: u64 = 60 * 60;

/// Testnet maximum lock duration: 104 testnet epochs.
pub const TESTNET_MAX_LOCK_DURATION: u64 = 104 * TESTNET_EPOCH_DURATION;
