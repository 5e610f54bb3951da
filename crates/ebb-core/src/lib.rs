//! # ebb-core
//! Foundation types, decay-curve math and errors for the Ebb vote-escrow.

pub mod config;
pub mod constants;
pub mod curve;
pub mod epoch;
pub mod error;
pub mod traits;
pub mod types;
