//! Binary snapshots of escrow state.
//!
//! Only [`EscrowState`] is persisted. Configuration, roles and the vault are
//! supplied by the host on restore, so a snapshot cannot smuggle in a
//! different epoch length or administrator.

use tracing::info;

use ebb_core::config::{EscrowConfig, Roles};
use ebb_core::error::EscrowError;
use ebb_core::traits::AssetVault;

use crate::escrow::{EscrowState, VotingEscrow};

impl<V: AssetVault> VotingEscrow<V> {
    /// Encode the persisted state with bincode's standard configuration.
    pub fn snapshot(&self) -> Result<Vec<u8>, EscrowError> {
        bincode::encode_to_vec(&self.state, bincode::config::standard())
            .map_err(|e| EscrowError::Storage(e.to_string()))
    }

    /// Rebuild an escrow from a snapshot.
    pub fn restore(config: EscrowConfig, roles: Roles, vault: V, bytes: &[u8]) -> Result<Self, EscrowError> {
        let (state, read): (EscrowState, usize) =
            bincode::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| EscrowError::Storage(e.to_string()))?;
        if read != bytes.len() {
            return Err(EscrowError::Storage(format!(
                "trailing bytes: read {read} of {}",
                bytes.len()
            )));
        }
        let mut escrow = Self::new(config, roles, vault)?;
        info!(
            locks = state.locks.len(),
            checkpoints = state.checkpoints.len(),
            "escrow: restored from snapshot"
        );
        escrow.state = state;
        Ok(escrow)
    }
}
