//! Lazy checkpoint engine.
//!
//! Every subject (global, user, delegate, pair) carries a [`Checkpoint`]: its
//! aggregate curve and the epoch start it was last advanced to. Advancing a
//! checkpoint steps one epoch at a time, and at each boundary `b`:
//!
//! 1. removes the slope scheduled for the subject at `b`
//!    (see [`SlopeSchedule`]),
//! 2. folds in the pending delta queued for the subject at `b`
//!    (see [`PendingQueue`]),
//! 3. records the resulting curve in the subject's history, and for the
//!    global subject the finalized total supply at `b`.
//!
//! A subject seen for the first time is anchored at the current epoch with a
//! zero curve; nothing before its first appearance needs replaying.
//!
//! Reads never advance state. [`CheckpointBook::curve_at`] answers from
//! history for past epochs and simulates the catch-up for future ones,
//! visiting only the boundaries that carry a schedule or pending entry.

use std::collections::BTreeMap;

use ebb_core::curve::DecayCurve;
use ebb_core::epoch::{epoch_start, epochs_between};
use ebb_core::error::ArithmeticError;
use ebb_core::types::Subject;
use tracing::debug;

use crate::pending::{PendingDelta, PendingQueue};
use crate::schedule::SlopeSchedule;

/// Last known curve of a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct Checkpoint {
    pub curve: DecayCurve,
    /// Epoch start the curve is valid for.
    pub last_updated: u64,
}

/// Result of advancing one checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// First sighting; anchored at the target epoch with a zero curve.
    Anchored,
    /// Already at or past the target epoch.
    Unchanged,
    /// Stepped forward by `epochs` boundaries, ending at `to`.
    Advanced { from: u64, to: u64, epochs: u64 },
}

/// Checkpoints, curve history and finalized supply for every subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct CheckpointBook {
    current: BTreeMap<Subject, Checkpoint>,
    /// Curve in force during each epoch, keyed by epoch start.
    history: BTreeMap<Subject, BTreeMap<u64, DecayCurve>>,
    /// Global value at each crossed boundary.
    supply: BTreeMap<u64, u128>,
}

impl CheckpointBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, subject: Subject) -> Option<&Checkpoint> {
        self.current.get(&subject)
    }

    /// Epochs between the subject's checkpoint and `target` (an epoch start).
    /// Zero for a subject that has never been anchored.
    pub fn epochs_behind(&self, subject: Subject, target: u64, duration: u64) -> u64 {
        match self.current.get(&subject) {
            Some(cp) => epochs_between(cp.last_updated, target, duration),
            None => 0,
        }
    }

    /// Advance `subject` toward `target` by at most `max_epochs` boundaries,
    /// consuming schedule and pending entries as they are crossed.
    pub fn advance(
        &mut self,
        subject: Subject,
        target: u64,
        duration: u64,
        max_epochs: u64,
        schedule: &mut SlopeSchedule,
        pending: &mut PendingQueue,
    ) -> Result<Advance, ArithmeticError> {
        let Some(mut cp) = self.current.get(&subject).copied() else {
            self.current.insert(
                subject,
                Checkpoint {
                    curve: DecayCurve::ZERO,
                    last_updated: target,
                },
            );
            self.history
                .entry(subject)
                .or_default()
                .insert(target, DecayCurve::ZERO);
            debug!(%subject, epoch = target, "checkpoint: anchored");
            return Ok(Advance::Anchored);
        };

        if cp.last_updated >= target {
            return Ok(Advance::Unchanged);
        }

        let from = cp.last_updated;
        let mut epochs = 0u64;
        let history = self.history.entry(subject).or_default();
        while cp.last_updated < target && epochs < max_epochs {
            let boundary = cp.last_updated + duration;
            let expiring = schedule.take(subject, boundary);
            let mut curve = cp.curve.remove_expired(expiring, boundary);
            if let Some(delta) = pending.take(subject, boundary) {
                curve = delta.apply(&curve)?;
            }
            history.insert(boundary, curve);
            if subject == Subject::Global {
                self.supply.insert(boundary, curve.value_at(boundary));
            }
            cp = Checkpoint {
                curve,
                last_updated: boundary,
            };
            epochs += 1;
        }
        self.current.insert(subject, cp);
        debug!(%subject, from, to = cp.last_updated, epochs, "checkpoint: advanced");
        Ok(Advance::Advanced {
            from,
            to: cp.last_updated,
            epochs,
        })
    }

    /// Add `delta` to the subject's current curve, effective immediately.
    ///
    /// The subject must already be anchored at the current epoch.
    pub fn credit(&mut self, subject: Subject, delta: &DecayCurve) -> Result<Checkpoint, ArithmeticError> {
        let cp = self.current.entry(subject).or_insert(Checkpoint {
            curve: DecayCurve::ZERO,
            last_updated: 0,
        });
        cp.curve = cp.curve.checked_add(delta)?;
        let cp = *cp;
        self.history
            .entry(subject)
            .or_default()
            .insert(cp.last_updated, cp.curve);
        Ok(cp)
    }

    /// Remove `delta` from the subject's current curve, effective immediately.
    pub fn debit(&mut self, subject: Subject, delta: &DecayCurve) -> Option<Checkpoint> {
        let cp = self.current.get_mut(&subject)?;
        cp.curve = cp.curve.saturating_sub(delta);
        let cp = *cp;
        self.history
            .entry(subject)
            .or_default()
            .insert(cp.last_updated, cp.curve);
        Some(cp)
    }

    /// Curve in force for `subject` during the epoch containing `t`.
    ///
    /// Past epochs come from history. Epochs at or after the checkpoint are
    /// projected by replaying the scheduled removals and pending deltas that
    /// fall in between, without persisting anything. Boundaries with no
    /// entry leave the curve unchanged, so the cost follows the number of
    /// entries and not the distance to `t`.
    ///
    /// The whole epoch shares one curve: a mutation made late in an epoch
    /// already shows at earlier times in that same epoch.
    pub fn curve_at(
        &self,
        subject: Subject,
        t: u64,
        duration: u64,
        schedule: &SlopeSchedule,
        pending: &PendingQueue,
    ) -> Result<DecayCurve, ArithmeticError> {
        let Some(cp) = self.current.get(&subject) else {
            return Ok(DecayCurve::ZERO);
        };
        let target = epoch_start(t, duration);

        if target < cp.last_updated {
            let curve = self
                .history
                .get(&subject)
                .and_then(|h| h.range(..=target).next_back())
                .map(|(_, c)| *c)
                .unwrap_or(DecayCurve::ZERO);
            return Ok(curve);
        }

        let mut steps: BTreeMap<u64, (u128, Option<&PendingDelta>)> = BTreeMap::new();
        for (at, slope) in schedule.range(subject, cp.last_updated, target) {
            steps.entry(at).or_default().0 = slope;
        }
        for (at, delta) in pending.range(subject, cp.last_updated, target) {
            steps.entry(at).or_default().1 = Some(delta);
        }

        let mut curve = cp.curve;
        for (at, (expiring, delta)) in steps {
            curve = curve.remove_expired(expiring, at);
            if let Some(delta) = delta {
                curve = delta.apply(&curve)?;
            }
        }
        Ok(curve)
    }

    /// Total supply finalized at boundary `at`, if the global checkpoint has
    /// crossed it.
    pub fn finalized_supply(&self, at: u64) -> Option<u128> {
        self.supply.get(&at).copied()
    }

    /// Number of subjects with a checkpoint.
    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ebb_core::types::Address;
    use proptest::prelude::*;

    const D: u64 = 100;

    struct Fixture {
        book: CheckpointBook,
        schedule: SlopeSchedule,
        pending: PendingQueue,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                book: CheckpointBook::new(),
                schedule: SlopeSchedule::new(),
                pending: PendingQueue::new(),
            }
        }

        fn advance(&mut self, subject: Subject, target: u64) -> Advance {
            self.book
                .advance(subject, target, D, u64::MAX, &mut self.schedule, &mut self.pending)
                .unwrap()
        }
    }

    fn user(seed: u8) -> Subject {
        Subject::User(Address([seed; 20]))
    }

    // --- advance ---

    #[test]
    fn first_advance_anchors() {
        let mut f = Fixture::new();
        assert_eq!(f.advance(Subject::Global, 500), Advance::Anchored);
        let cp = f.book.get(Subject::Global).unwrap();
        assert_eq!(cp.last_updated, 500);
        assert_eq!(cp.curve, DecayCurve::ZERO);
    }

    #[test]
    fn advance_twice_same_epoch_is_idempotent() {
        let mut f = Fixture::new();
        f.advance(Subject::Global, 100);
        f.book.credit(Subject::Global, &DecayCurve::new(1_000, 2)).unwrap();
        f.advance(Subject::Global, 300);
        let snapshot = f.book.clone();
        assert_eq!(f.advance(Subject::Global, 300), Advance::Unchanged);
        assert_eq!(f.book, snapshot);
    }

    #[test]
    fn advance_applies_scheduled_removal() {
        let mut f = Fixture::new();
        f.advance(Subject::Global, 100);
        let lock = DecayCurve::from_principal(1_000, 300, 1_000).unwrap();
        f.book.credit(Subject::Global, &lock).unwrap();
        f.schedule.add(Subject::Global, 300, lock.slope).unwrap();

        let out = f.advance(Subject::Global, 400);
        assert_eq!(out, Advance::Advanced { from: 100, to: 400, epochs: 3 });
        assert_eq!(f.book.get(Subject::Global).unwrap().curve, DecayCurve::ZERO);
        assert!(f.schedule.is_empty());
    }

    #[test]
    fn advance_records_finalized_supply() {
        let mut f = Fixture::new();
        f.advance(Subject::Global, 100);
        let lock = DecayCurve::from_principal(1_000, 500, 1_000).unwrap();
        f.book.credit(Subject::Global, &lock).unwrap();
        f.schedule.add(Subject::Global, 500, lock.slope).unwrap();
        f.advance(Subject::Global, 600);

        assert_eq!(f.book.finalized_supply(200), Some(lock.value_at(200)));
        assert_eq!(f.book.finalized_supply(400), Some(100));
        assert_eq!(f.book.finalized_supply(500), Some(0));
        assert_eq!(f.book.finalized_supply(100), None);
    }

    #[test]
    fn advance_applies_pending_delta_once() {
        let mut f = Fixture::new();
        f.advance(user(1), 100);
        let c = DecayCurve::new(10_000, 10);
        f.pending.enqueue_addition(user(1), 200, &c).unwrap();
        f.advance(user(1), 300);
        assert_eq!(f.book.get(user(1)).unwrap().curve, c);
        assert!(f.pending.is_empty());
    }

    #[test]
    fn advance_respects_max_epochs() {
        let mut f = Fixture::new();
        f.advance(Subject::Global, 100);
        let out = f
            .book
            .advance(Subject::Global, 1_100, D, 4, &mut f.schedule, &mut f.pending)
            .unwrap();
        assert_eq!(out, Advance::Advanced { from: 100, to: 500, epochs: 4 });
        assert_eq!(f.book.epochs_behind(Subject::Global, 1_100, D), 6);
    }

    #[test]
    fn epochs_behind_unknown_subject_is_zero() {
        let f = Fixture::new();
        assert_eq!(f.book.epochs_behind(user(3), 10_000, D), 0);
    }

    // --- credit / debit ---

    #[test]
    fn credit_and_debit_update_current_epoch_history() {
        let mut f = Fixture::new();
        f.advance(user(1), 200);
        f.book.credit(user(1), &DecayCurve::new(900, 3)).unwrap();
        f.book.debit(user(1), &DecayCurve::new(300, 1)).unwrap();
        let curve = f
            .book
            .curve_at(user(1), 250, D, &f.schedule, &f.pending)
            .unwrap();
        assert_eq!(curve, DecayCurve::new(600, 2));
    }

    #[test]
    fn debit_unknown_subject_is_none() {
        let mut f = Fixture::new();
        assert!(f.book.debit(user(5), &DecayCurve::new(1, 1)).is_none());
    }

    // --- curve_at ---

    #[test]
    fn curve_at_unknown_subject_is_zero() {
        let f = Fixture::new();
        let c = f
            .book
            .curve_at(user(9), 1_000, D, &f.schedule, &f.pending)
            .unwrap();
        assert_eq!(c, DecayCurve::ZERO);
    }

    #[test]
    fn curve_at_projection_matches_advance() {
        let mut f = Fixture::new();
        f.advance(user(1), 100);
        let lock = DecayCurve::from_principal(5_000, 400, 1_000).unwrap();
        f.book.credit(user(1), &lock).unwrap();
        f.schedule.add(user(1), 400, lock.slope).unwrap();
        f.pending
            .enqueue_addition(user(1), 300, &DecayCurve::new(7_000, 5))
            .unwrap();

        let projected: Vec<DecayCurve> = (1..=5)
            .map(|e| {
                f.book
                    .curve_at(user(1), e * D, D, &f.schedule, &f.pending)
                    .unwrap()
            })
            .collect();
        f.advance(user(1), 500);
        let replayed: Vec<DecayCurve> = (1..=5)
            .map(|e| {
                f.book
                    .curve_at(user(1), e * D, D, &f.schedule, &f.pending)
                    .unwrap()
            })
            .collect();
        assert_eq!(projected, replayed);
    }

    proptest! {
        /// Reading ahead never disagrees with actually advancing.
        #[test]
        fn prop_projection_equals_replay(
            locks in proptest::collection::vec((1_000u128..1_000_000, 2u64..30), 1..12),
            moves in proptest::collection::vec((1u64..30, 0u128..50_000), 0..6),
            target in 1u64..40,
        ) {
            let mut f = Fixture::new();
            f.advance(user(1), D);
            for (total, e) in &locks {
                let expiry = D + e * D;
                let c = DecayCurve::from_principal(*total, expiry, 3_000).unwrap();
                f.book.credit(user(1), &c).unwrap();
                f.schedule.add(user(1), expiry, c.slope).unwrap();
            }
            for (e, bias) in &moves {
                f.pending
                    .enqueue_addition(user(1), D + e * D, &DecayCurve::new(*bias, 0))
                    .unwrap();
            }
            let t = D + target * D;
            let projected = f.book.curve_at(user(1), t, D, &f.schedule, &f.pending).unwrap();
            f.advance(user(1), t);
            prop_assert_eq!(f.book.get(user(1)).unwrap().curve, projected);
        }
    }

    #[test]
    fn curve_at_before_anchor_is_zero() {
        let mut f = Fixture::new();
        f.advance(user(1), 500);
        f.book.credit(user(1), &DecayCurve::new(10_000, 1)).unwrap();
        f.advance(user(1), 700);
        let c = f
            .book
            .curve_at(user(1), 250, D, &f.schedule, &f.pending)
            .unwrap();
        assert_eq!(c, DecayCurve::ZERO);
    }

    #[test]
    fn curve_at_far_future_only_visits_entries() {
        let mut f = Fixture::new();
        f.advance(user(1), D);
        let lock = DecayCurve::from_principal(50_000, 10 * D, 1_000).unwrap();
        f.book.credit(user(1), &lock).unwrap();
        f.schedule.add(user(1), 10 * D, lock.slope).unwrap();
        let late = DecayCurve::new(1_000_000, 0);
        f.pending.enqueue_addition(user(1), 20 * D, &late).unwrap();

        let c = f
            .book
            .curve_at(user(1), u64::MAX, D, &f.schedule, &f.pending)
            .unwrap();
        assert_eq!(c, late);
        assert_eq!(c.value_at(u64::MAX), 1_000_000);
    }
}
