//! Session snapshot published to the shell.

use super::{Connection, PhaseKind, SessionPhase};
use crate::error::SessionError;
use crate::sdk::{ProviderHandle, RpcHandle, UserInfo, WalletHandle};

/// Complete view of the wallet session at one point in time.
///
/// Snapshots are never mutated in place once published; the store swaps in
/// a new one on every change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// Current phase and its data.
    pub phase: SessionPhase,
    /// An SDK step is in progress.
    pub loading: bool,
    /// Last fetched user profile.
    pub user_info: Option<UserInfo>,
    /// Last captured failure.
    pub last_error: Option<SessionError>,
}

impl SessionState {
    /// Initial, empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Kind of the current phase.
    pub fn kind(&self) -> PhaseKind {
        self.phase.kind()
    }

    /// Account address, or `""` unless connected.
    pub fn address(&self) -> &str {
        self.connection().map(|c| c.address.as_str()).unwrap_or("")
    }

    /// Chain id, or `0` unless connected.
    pub fn chain_id(&self) -> u64 {
        self.connection().map(|c| c.chain_id).unwrap_or(0)
    }

    /// Provider handle while awaiting an address or connected.
    pub fn provider(&self) -> Option<&ProviderHandle> {
        self.phase.provider()
    }

    /// Chain RPC handle when connected.
    pub fn rpc(&self) -> Option<&RpcHandle> {
        self.connection().map(|c| &c.rpc)
    }

    /// Signing wallet handle when connected.
    pub fn wallet(&self) -> Option<&WalletHandle> {
        self.connection().map(|c| &c.wallet)
    }

    /// Connection details when connected.
    pub fn connection(&self) -> Option<&Connection> {
        self.phase.connection()
    }

    /// Check if a wallet address is known.
    pub fn is_connected(&self) -> bool {
        !self.address().is_empty()
    }
}
