//! Pending-delta queue.
//!
//! A delegation change made during epoch `e` must not alter anyone's power
//! in `e`. Instead the change is queued against the start of `e + 1` for each
//! affected subject and folded into that subject's curve when its
//! checkpoint first crosses that boundary.

use std::collections::BTreeMap;
use std::ops::Bound;

use ebb_core::curve::DecayCurve;
use ebb_core::error::ArithmeticError;
use ebb_core::types::Subject;

/// Additions and subtractions queued for one subject at one boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct PendingDelta {
    pub has_addition: bool,
    pub has_subtraction: bool,
    pub additions: DecayCurve,
    pub subtractions: DecayCurve,
}

impl PendingDelta {
    /// Apply to `curve`: additions first, then subtractions.
    pub fn apply(&self, curve: &DecayCurve) -> Result<DecayCurve, ArithmeticError> {
        let mut out = *curve;
        if self.has_addition {
            out = out.checked_add(&self.additions)?;
        }
        if self.has_subtraction {
            out = out.saturating_sub(&self.subtractions);
        }
        Ok(out)
    }

    /// Net effect on a curve that already holds the subtracted amount.
    pub fn is_net_zero(&self) -> bool {
        self.additions == self.subtractions
    }
}

/// `(subject, boundary) → PendingDelta`.
#[derive(Debug, Clone, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct PendingQueue {
    entries: BTreeMap<(Subject, u64), PendingDelta>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an addition of `curve` to `subject` at `at`.
    pub fn enqueue_addition(
        &mut self,
        subject: Subject,
        at: u64,
        curve: &DecayCurve,
    ) -> Result<(), ArithmeticError> {
        let entry = self.entries.entry((subject, at)).or_default();
        entry.additions = entry.additions.checked_add(curve)?;
        entry.has_addition = true;
        Ok(())
    }

    /// Queue a subtraction of `curve` from `subject` at `at`.
    pub fn enqueue_subtraction(
        &mut self,
        subject: Subject,
        at: u64,
        curve: &DecayCurve,
    ) -> Result<(), ArithmeticError> {
        let entry = self.entries.entry((subject, at)).or_default();
        entry.subtractions = entry.subtractions.checked_add(curve)?;
        entry.has_subtraction = true;
        Ok(())
    }

    /// Queue `curve` to leave every subject in `from` and arrive at every
    /// subject in `to` at `at`.
    pub fn enqueue_move(
        &mut self,
        from: &[Subject],
        to: &[Subject],
        at: u64,
        curve: &DecayCurve,
    ) -> Result<(), ArithmeticError> {
        for s in from {
            self.enqueue_subtraction(*s, at, curve)?;
        }
        for s in to {
            self.enqueue_addition(*s, at, curve)?;
        }
        Ok(())
    }

    /// Fails if [`enqueue_move`](Self::enqueue_move) with the same
    /// arguments would overflow. Changes nothing.
    pub fn check_move(
        &self,
        from: &[Subject],
        to: &[Subject],
        at: u64,
        curve: &DecayCurve,
    ) -> Result<(), ArithmeticError> {
        let queued = |s: &Subject| self.get(*s, at).copied().unwrap_or_default();
        for s in from {
            queued(s).subtractions.checked_add(curve)?;
        }
        for s in to {
            queued(s).additions.checked_add(curve)?;
        }
        Ok(())
    }

    pub fn get(&self, subject: Subject, at: u64) -> Option<&PendingDelta> {
        self.entries.get(&(subject, at))
    }

    /// Entries for `subject` in `(after, upto]`, in boundary order.
    pub fn range(
        &self,
        subject: Subject,
        after: u64,
        upto: u64,
    ) -> impl Iterator<Item = (u64, &PendingDelta)> + '_ {
        self.entries
            .range((Bound::Excluded((subject, after)), Bound::Included((subject, upto))))
            .map(|((_, at), delta)| (*at, delta))
    }

    /// Remove and return the entry for `subject` at `at`.
    pub fn take(&mut self, subject: Subject, at: u64) -> Option<PendingDelta> {
        self.entries.remove(&(subject, at))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
