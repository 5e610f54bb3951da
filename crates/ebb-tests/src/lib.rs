//! Cross-crate test suite for the Ebb vote-escrow.
//!
//! Scenario tests walk the lock and delegation lifecycle end to end;
//! property tests drive random operation sequences and check conservation
//! of voting power after every step.

pub mod helpers;
