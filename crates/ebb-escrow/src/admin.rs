//! Role-gated administration: the delegate registry and risk controls.

use tracing::{info, warn};

use ebb_core::error::{EscrowError, StateError, ValidityError};
use ebb_core::traits::AssetVault;
use ebb_core::types::Address;

use crate::escrow::{RiskState, VotingEscrow};
use crate::events::EscrowEvent;

impl<V: AssetVault> VotingEscrow<V> {
    /// Allow `delegate` to receive delegations. Returns `false` if it was
    /// already registered.
    pub fn register_delegate(&mut self, caller: Address, delegate: Address) -> Result<bool, EscrowError> {
        self.require_role(self.roles.registrar, "registrar", caller)?;
        if delegate.is_zero() {
            return Err(ValidityError::ZeroAddress.into());
        }
        if !self.state.delegates.insert(delegate) {
            return Ok(false);
        }
        info!(%delegate, "escrow: delegate registered");
        self.emit(EscrowEvent::DelegateRegistered(delegate));
        Ok(true)
    }

    /// Stop `delegate` from receiving new delegations. Existing delegations
    /// stay in place and can still be undelegated.
    pub fn deregister_delegate(&mut self, caller: Address, delegate: Address) -> Result<bool, EscrowError> {
        self.require_role(self.roles.registrar, "registrar", caller)?;
        if !self.state.delegates.remove(&delegate) {
            return Ok(false);
        }
        info!(%delegate, "escrow: delegate deregistered");
        self.emit(EscrowEvent::DelegateDeregistered(delegate));
        Ok(true)
    }

    /// Suspend every lock operation.
    pub fn pause(&mut self, caller: Address) -> Result<(), EscrowError> {
        self.require_role(self.roles.risk_manager, "risk-manager", caller)?;
        self.require_active()?;
        self.state.risk = RiskState::Paused;
        warn!(%caller, "escrow: paused");
        self.emit(EscrowEvent::Paused);
        Ok(())
    }

    pub fn unpause(&mut self, caller: Address) -> Result<(), EscrowError> {
        self.require_role(self.roles.risk_manager, "risk-manager", caller)?;
        match self.state.risk {
            RiskState::Paused => {}
            RiskState::Frozen => return Err(StateError::Frozen.into()),
            RiskState::Active => return Err(StateError::NotPaused.into()),
        }
        self.state.risk = RiskState::Active;
        info!(%caller, "escrow: unpaused");
        self.emit(EscrowEvent::Unpaused);
        Ok(())
    }

    /// Permanently freeze a paused escrow, enabling emergency exit.
    pub fn freeze(&mut self, caller: Address) -> Result<(), EscrowError> {
        self.require_role(self.roles.risk_manager, "risk-manager", caller)?;
        match self.state.risk {
            RiskState::Paused => {}
            RiskState::Frozen => return Err(StateError::AlreadyFrozen.into()),
            RiskState::Active => return Err(StateError::NotPaused.into()),
        }
        self.state.risk = RiskState::Frozen;
        warn!(%caller, "escrow: frozen");
        self.emit(EscrowEvent::Frozen);
        Ok(())
    }
}
