//! Epoch arithmetic.
//!
//! Epochs are fixed-length windows aligned to multiples of the epoch
//! duration: epoch `n` covers `[n * duration, (n + 1) * duration)`.

/// Start of the epoch containing `t`.
///
/// # Examples
///
/// ```
/// use ebb_core::epoch::epoch_start;
/// assert_eq!(epoch_start(0, 100), 0);
/// assert_eq!(epoch_start(99, 100), 0);
/// assert_eq!(epoch_start(100, 100), 100);
/// assert_eq!(epoch_start(250, 100), 200);
/// ```
pub fn epoch_start(t: u64, duration: u64) -> u64 {
    t - t % duration
}

/// Start of the epoch following the one containing `t`.
pub fn next_epoch_start(t: u64, duration: u64) -> u64 {
    epoch_start(t, duration).saturating_add(duration)
}

/// Index of the epoch containing `t`.
pub fn epoch_index(t: u64, duration: u64) -> u64 {
    t / duration
}

/// End timestamp of epoch `index` (the start of epoch `index + 1`).
pub fn epoch_end(index: u64, duration: u64) -> u64 {
    index.saturating_add(1).saturating_mul(duration)
}

/// Whether `t` falls exactly on an epoch boundary.
pub fn is_aligned(t: u64, duration: u64) -> bool {
    t % duration == 0
}

/// Number of whole epochs from `from` to `to` (both epoch starts).
/// Zero if `to <= from`.
pub fn epochs_between(from: u64, to: u64, duration: u64) -> u64 {
    to.saturating_sub(from) / duration
}
