//! Error types for wallet-session.

use thiserror::Error;

use crate::session::PhaseKind;

/// Failure reported by an opaque collaborator (wallet SDK or chain RPC helper).
///
/// The controller never interprets these; it only wraps them in a
/// [`SessionError`] that names the step that failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SdkError {
    message: String,
}

impl SdkError {
    /// Create a new collaborator error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The collaborator-provided message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Main error type for wallet-session operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    /// SDK construction or network initialization failed.
    #[error("wallet SDK initialization failed: {0}")]
    Initialization(#[source] SdkError),

    /// Address, chain id or handle derivation failed.
    #[error("wallet connection failed: {0}")]
    Connection(#[source] SdkError),

    /// SDK logout failed.
    #[error("wallet logout failed: {0}")]
    Logout(#[source] SdkError),

    /// Profile fetch failed.
    #[error("user info fetch failed: {0}")]
    ProfileFetch(#[source] SdkError),

    /// An action that needs an SDK instance ran without one.
    #[error("{0}: wallet SDK not initialized")]
    NotInitialized(&'static str),

    /// The address recovery poll hit its attempt cap.
    #[error("address recovery gave up after {0} attempts")]
    RecoveryExhausted(u32),

    /// Invalid phase transition attempted.
    #[error("invalid phase transition from {from} to {to}")]
    InvalidTransition { from: PhaseKind, to: PhaseKind },
}

/// Convenience Result type for wallet-session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
