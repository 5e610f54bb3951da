//! Escrow configuration.
//!
//! Provides [`EscrowConfig`] with protocol defaults and presets, and
//! [`Roles`] naming the accounts allowed to run administrative operations.
//! Both can be loaded from JSON.

use serde::{Deserialize, Serialize};

use crate::constants::{
    EPOCH_DURATION, MAX_CATCH_UP_EPOCHS, MAX_LOCK_DURATION, MIN_LOCK_EPOCHS,
    TESTNET_EPOCH_DURATION, TESTNET_MAX_LOCK_DURATION,
};
use crate::error::ValidityError;
use crate::types::Address;

/// Timing parameters of a vote-escrow instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscrowConfig {
    /// Epoch length in seconds.
    pub epoch_duration: u64,
    /// Longest allowed lock, in seconds. Must be a multiple of `epoch_duration`.
    pub max_lock_duration: u64,
    /// Liveliness floor in epochs.
    pub min_lock_epochs: u64,
    /// Most epochs a single mutating call may catch one checkpoint up by.
    pub max_catch_up_epochs: u64,
}

impl Default for EscrowConfig {
    fn default() -> Self {
        Self {
            epoch_duration: EPOCH_DURATION,
            max_lock_duration: MAX_LOCK_DURATION,
            min_lock_epochs: MIN_LOCK_EPOCHS,
            max_catch_up_epochs: MAX_CATCH_UP_EPOCHS,
        }
    }
}

impl EscrowConfig {
    /// Production preset: weekly epochs, two-year maximum lock.
    pub fn mainnet() -> Self {
        Self::default()
    }

    /// Testnet preset: hourly epochs.
    pub fn testnet() -> Self {
        Self {
            epoch_duration: TESTNET_EPOCH_DURATION,
            max_lock_duration: TESTNET_MAX_LOCK_DURATION,
            ..Self::default()
        }
    }

    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ValidityError> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| ValidityError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), ValidityError> {
        if self.epoch_duration == 0 {
            return Err(ValidityError::InvalidConfig("epoch_duration is zero".into()));
        }
        if self.max_lock_duration % self.epoch_duration != 0 {
            return Err(ValidityError::InvalidConfig(
                "max_lock_duration is not a multiple of epoch_duration".into(),
            ));
        }
        if self.min_lock_epochs == 0 {
            return Err(ValidityError::InvalidConfig("min_lock_epochs is zero".into()));
        }
        if self.min_lock_epochs.saturating_mul(self.epoch_duration) > self.max_lock_duration {
            return Err(ValidityError::InvalidConfig(
                "liveliness floor exceeds max_lock_duration".into(),
            ));
        }
        if self.max_catch_up_epochs == 0 {
            return Err(ValidityError::InvalidConfig("max_catch_up_epochs is zero".into()));
        }
        Ok(())
    }

    /// Liveliness floor in seconds.
    pub fn floor_duration(&self) -> u64 {
        self.min_lock_epochs.saturating_mul(self.epoch_duration)
    }

    /// Smallest principal total that yields a non-zero slope.
    pub fn min_principal(&self) -> u128 {
        self.max_lock_duration as u128
    }
}

/// Accounts holding administrative roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Roles {
    /// May pause, unpause and freeze.
    pub risk_manager: Address,
    /// May run emergency exit batches once frozen.
    pub emergency_exit: Address,
    /// May register and deregister delegates.
    pub registrar: Address,
}

impl Roles {
    /// All roles held by one account.
    pub fn single(admin: Address) -> Self {
        Self {
            risk_manager: admin,
            emergency_exit: admin,
            registrar: admin,
        }
    }
}
