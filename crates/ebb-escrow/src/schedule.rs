//! Slope-change schedule.
//!
//! Records, per subject and per future epoch-aligned timestamp, how much
//! slope must be removed from that subject's curve when its checkpoint
//! crosses the timestamp. One keyed store serves the global, user, delegate
//! and pair subjects alike.
//!
//! Entries are added when a lock is created or extended under a subject,
//! moved between subjects when the lock's future holder changes, and
//! consumed exactly once by the checkpoint engine.

use std::collections::BTreeMap;
use std::ops::Bound;

use ebb_core::error::ArithmeticError;
use ebb_core::types::Subject;
use tracing::warn;

/// `(subject, timestamp) → slope` to subtract at that timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct SlopeSchedule {
    changes: BTreeMap<(Subject, u64), u128>,
}

impl SlopeSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slope scheduled for removal from `subject` at `at`.
    pub fn get(&self, subject: Subject, at: u64) -> u128 {
        self.changes.get(&(subject, at)).copied().unwrap_or(0)
    }

    /// Fails if scheduling `slope` more at `at` would overflow. Changes
    /// nothing.
    pub fn check_add(&self, subject: Subject, at: u64, slope: u128) -> Result<(), ArithmeticError> {
        self.get(subject, at)
            .checked_add(slope)
            .map(|_| ())
            .ok_or(ArithmeticError::Overflow)
    }

    /// Schedule `slope` more for removal from `subject` at `at`.
    pub fn add(&mut self, subject: Subject, at: u64, slope: u128) -> Result<(), ArithmeticError> {
        if slope == 0 {
            return Ok(());
        }
        let entry = self.changes.entry((subject, at)).or_insert(0);
        *entry = entry.checked_add(slope).ok_or(ArithmeticError::Overflow)?;
        Ok(())
    }

    /// Cancel `slope` previously scheduled for `subject` at `at`.
    ///
    /// Cancelling more than is scheduled saturates and is logged.
    pub fn remove(&mut self, subject: Subject, at: u64, slope: u128) {
        if slope == 0 {
            return;
        }
        let key = (subject, at);
        let current = self.changes.get(&key).copied().unwrap_or(0);
        if slope > current {
            warn!(%subject, at, current, slope, "schedule: removing more slope than scheduled");
        }
        let left = current.saturating_sub(slope);
        if left == 0 {
            self.changes.remove(&key);
        } else {
            self.changes.insert(key, left);
        }
    }

    /// Consume the entry for `subject` at `at`, returning its slope.
    pub fn take(&mut self, subject: Subject, at: u64) -> u128 {
        self.changes.remove(&(subject, at)).unwrap_or(0)
    }

    /// Move `slope` at `at` from every subject in `from` to every subject
    /// in `to`.
    pub fn shift(
        &mut self,
        from: &[Subject],
        to: &[Subject],
        at: u64,
        slope: u128,
    ) -> Result<(), ArithmeticError> {
        for s in from {
            self.remove(*s, at, slope);
        }
        for s in to {
            self.add(*s, at, slope)?;
        }
        Ok(())
    }

    /// Number of non-zero entries.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Entries for `subject` in `(after, upto]`, in timestamp order.
    pub fn range(&self, subject: Subject, after: u64, upto: u64) -> impl Iterator<Item = (u64, u128)> + '_ {
        self.changes
            .range((Bound::Excluded((subject, after)), Bound::Included((subject, upto))))
            .map(|((_, at), slope)| (*at, *slope))
    }

    /// All entries scheduled for `subject`, in timestamp order.
    pub fn entries_for(&self, subject: Subject) -> Vec<(u64, u128)> {
        self.changes
            .range((subject, 0)..=(subject, u64::MAX))
            .map(|((_, at), slope)| (*at, *slope))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ebb_core::types::Address;

    fn user(seed: u8) -> Subject {
        Subject::User(Address([seed; 20]))
    }

    #[test]
    fn add_accumulates() {
        let mut s = SlopeSchedule::new();
        s.add(Subject::Global, 100, 5).unwrap();
        s.add(Subject::Global, 100, 7).unwrap();
        assert_eq!(s.get(Subject::Global, 100), 12);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn add_zero_creates_no_entry() {
        let mut s = SlopeSchedule::new();
        s.add(Subject::Global, 100, 0).unwrap();
        assert!(s.is_empty());
    }

    #[test]
    fn subjects_are_independent() {
        let mut s = SlopeSchedule::new();
        s.add(user(1), 100, 5).unwrap();
        s.add(user(2), 100, 9).unwrap();
        assert_eq!(s.get(user(1), 100), 5);
        assert_eq!(s.get(user(2), 100), 9);
        assert_eq!(s.get(Subject::Global, 100), 0);
    }

    #[test]
    fn remove_to_zero_deletes_entry() {
        let mut s = SlopeSchedule::new();
        s.add(Subject::Global, 100, 5).unwrap();
        s.remove(Subject::Global, 100, 5);
        assert!(s.is_empty());
    }

    #[test]
    fn remove_saturates() {
        let mut s = SlopeSchedule::new();
        s.add(Subject::Global, 100, 5).unwrap();
        s.remove(Subject::Global, 100, 50);
        assert_eq!(s.get(Subject::Global, 100), 0);
        assert!(s.is_empty());
    }

    #[test]
    fn take_consumes_once() {
        let mut s = SlopeSchedule::new();
        s.add(Subject::Global, 100, 5).unwrap();
        assert_eq!(s.take(Subject::Global, 100), 5);
        assert_eq!(s.take(Subject::Global, 100), 0);
    }

    #[test]
    fn shift_moves_between_subjects() {
        let mut s = SlopeSchedule::new();
        let d = Address([9; 20]);
        let o = Address([1; 20]);
        s.add(Subject::User(o), 300, 10).unwrap();
        s.shift(
            &[Subject::User(o)],
            &[Subject::Delegate(d), Subject::Pair(o, d)],
            300,
            10,
        )
        .unwrap();
        assert_eq!(s.get(Subject::User(o), 300), 0);
        assert_eq!(s.get(Subject::Delegate(d), 300), 10);
        assert_eq!(s.get(Subject::Pair(o, d), 300), 10);
    }

    #[test]
    fn entries_for_is_ordered() {
        let mut s = SlopeSchedule::new();
        s.add(user(1), 300, 1).unwrap();
        s.add(user(1), 100, 2).unwrap();
        s.add(user(2), 200, 3).unwrap();
        assert_eq!(s.entries_for(user(1)), vec![(100, 2), (300, 1)]);
    }

    #[test]
    fn range_is_half_open_and_per_subject() {
        let mut s = SlopeSchedule::new();
        s.add(user(1), 100, 1).unwrap();
        s.add(user(1), 200, 2).unwrap();
        s.add(user(1), 300, 3).unwrap();
        s.add(user(2), 200, 9).unwrap();
        let got: Vec<_> = s.range(user(1), 100, 300).collect();
        assert_eq!(got, vec![(200, 2), (300, 3)]);
        assert_eq!(s.range(user(1), 300, u64::MAX).count(), 0);
    }

    #[test]
    fn check_add_reports_overflow_without_writing() {
        let mut s = SlopeSchedule::new();
        s.add(Subject::Global, 100, u128::MAX - 1).unwrap();
        assert!(s.check_add(Subject::Global, 100, 1).is_ok());
        assert_eq!(s.check_add(Subject::Global, 100, 2), Err(ArithmeticError::Overflow));
        assert_eq!(s.get(Subject::Global, 100), u128::MAX - 1);
        assert_eq!(s.len(), 1);
    }
}
