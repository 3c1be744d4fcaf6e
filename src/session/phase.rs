//! Session phase machine.

use std::fmt;

use crate::error::SessionError;
use crate::sdk::{ProviderHandle, RpcHandle, WalletHandle};

/// Everything known about a fully connected wallet.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    /// Provider the connection was derived from.
    pub provider: ProviderHandle,
    /// Chain account address.
    pub address: String,
    /// Numeric chain id.
    pub chain_id: u64,
    /// Chain RPC client.
    pub rpc: RpcHandle,
    /// Signing wallet.
    pub wallet: WalletHandle,
}

/// Lifecycle phase of the wallet session.
///
/// Each variant carries exactly the data that is valid in that phase.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionPhase {
    /// No SDK instance exists.
    #[default]
    Uninitialized,
    /// SDK constructed and widget shown; waiting for the user.
    Initializing,
    /// Provider available but no address derived yet.
    AwaitingAddress { provider: ProviderHandle },
    /// Address and chain handles derived.
    Connected(Connection),
    /// Logout in progress.
    Disconnecting,
}

impl SessionPhase {
    /// The data-less kind of this phase.
    pub fn kind(&self) -> PhaseKind {
        match self {
            SessionPhase::Uninitialized => PhaseKind::Uninitialized,
            SessionPhase::Initializing => PhaseKind::Initializing,
            SessionPhase::AwaitingAddress { .. } => PhaseKind::AwaitingAddress,
            SessionPhase::Connected(_) => PhaseKind::Connected,
            SessionPhase::Disconnecting => PhaseKind::Disconnecting,
        }
    }

    /// Provider handle, present while awaiting an address or connected.
    pub fn provider(&self) -> Option<&ProviderHandle> {
        match self {
            SessionPhase::AwaitingAddress { provider } => Some(provider),
            SessionPhase::Connected(conn) => Some(&conn.provider),
            _ => None,
        }
    }

    /// Connection details, present only when connected.
    pub fn connection(&self) -> Option<&Connection> {
        match self {
            SessionPhase::Connected(conn) => Some(conn),
            _ => None,
        }
    }
}

/// Data-less mirror of [`SessionPhase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PhaseKind {
    #[default]
    Uninitialized,
    Initializing,
    AwaitingAddress,
    Connected,
    Disconnecting,
}

impl PhaseKind {
    /// Check if transition to target phase is valid.
    ///
    /// Valid transitions:
    /// - Uninitialized -> Initializing
    /// - Initializing -> AwaitingAddress | Disconnecting
    /// - AwaitingAddress -> Connected | Disconnecting
    /// - Connected -> Disconnecting
    /// - Disconnecting -> Uninitialized (logout done)
    /// - Disconnecting -> Initializing | AwaitingAddress | Connected (logout failed)
    pub fn can_transition_to(&self, target: PhaseKind) -> bool {
        use PhaseKind::*;
        matches!(
            (*self, target),
            (Uninitialized, Initializing)
                | (Initializing, AwaitingAddress)
                | (Initializing, Disconnecting)
                | (AwaitingAddress, Connected)
                | (AwaitingAddress, Disconnecting)
                | (Connected, Disconnecting)
                | (Disconnecting, Uninitialized)
                | (Disconnecting, Initializing)
                | (Disconnecting, AwaitingAddress)
                | (Disconnecting, Connected)
        )
    }

    /// Validate a transition, returning an error when it is not allowed.
    pub fn check_transition(&self, target: PhaseKind) -> crate::Result<()> {
        if self.can_transition_to(target) {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseKind::Uninitialized => "uninitialized",
            PhaseKind::Initializing => "initializing",
            PhaseKind::AwaitingAddress => "awaiting_address",
            PhaseKind::Connected => "connected",
            PhaseKind::Disconnecting => "disconnecting",
        }
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
