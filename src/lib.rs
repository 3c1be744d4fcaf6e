//! # wallet-session
//!
//! Lifecycle controller for social-login wallet sessions.
//!
//! The wallet SDK and the chain RPC helper are opaque collaborators behind
//! the traits in [`sdk`]. This crate decides when to construct and
//! initialize the SDK, when a session counts as connected, how a provider
//! without an address is nudged forward, and how a session is torn down.
//!
//! ## Features
//!
//! - **Explicit phase machine**: each phase carries only its valid data
//! - **Whole-snapshot store**: subscribers never see a half-updated session
//! - **Cancellable recovery poll**: injectable clock, optional attempt cap and backoff
//! - **Single-flight actions**: overlapping connect/disconnect calls are rejected
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use wallet_session::sdk::loopback::{LoopbackRpcFactory, LoopbackSdkFactory};
//! use wallet_session::{Config, SessionController};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     wallet_session::logging::try_init().ok();
//!
//!     let mut config = Config::default();
//!     config.sdk.client_id = "my-client-id".into();
//!
//!     let controller = SessionController::new(
//!         config.to_session_config()?,
//!         Arc::new(LoopbackSdkFactory::default()),
//!         Arc::new(LoopbackRpcFactory),
//!     );
//!
//!     controller.connect().await;
//!     println!("{}", wallet_session::shell::render(&controller.snapshot()));
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod sdk;
pub mod session;
pub mod shell;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use controller::{
    ConnectOutcome, DisconnectOutcome, ManualClock, PollPolicy, SessionConfig, SessionController,
};
pub use error::{Result, SdkError, SessionError};
pub use sdk::{
    ChainRpc, ChainRpcFactory, Network, ProviderHandle, RpcHandle, SdkFactory, WalletHandle,
    WalletSdk,
};
pub use session::{Connection, PhaseKind, SessionPhase, SessionState, SessionStore};
