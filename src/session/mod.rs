//! Session data model.
//!
//! This module provides the phase machine, the snapshot published to the
//! shell, and the store that holds it.

mod phase;
mod state;
mod store;

pub use phase::{Connection, PhaseKind, SessionPhase};
pub use state::SessionState;
pub use store::SessionStore;
