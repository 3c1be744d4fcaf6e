//! Session state storage.

use std::sync::Arc;

use tokio::sync::watch;

use super::{PhaseKind, SessionPhase, SessionState};
use crate::Result;

/// Holder of the current [`SessionState`].
///
/// Readers take cheap `Arc` snapshots or subscribe to a watch channel that
/// yields every replacement. Only the controller writes.
pub struct SessionStore {
    tx: watch::Sender<Arc<SessionState>>,
}

impl SessionStore {
    /// Create a store holding the initial state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(SessionState::new()));
        Self { tx }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<SessionState> {
        self.tx.borrow().clone()
    }

    /// Subscribe to snapshot replacements.
    pub fn subscribe(&self) -> watch::Receiver<Arc<SessionState>> {
        self.tx.subscribe()
    }

    /// Derive a new state from the current one and publish it.
    ///
    /// The closure works on a private copy; subscribers only ever see the
    /// finished result.
    pub(crate) fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut SessionState),
    {
        self.tx.send_modify(|current| {
            let mut next = SessionState::clone(current);
            f(&mut next);
            *current = Arc::new(next);
        });
    }

    /// Move to a new phase, validating the transition.
    ///
    /// `f` may adjust the remaining fields in the same replacement. Returns
    /// the phase that was left.
    pub(crate) fn transition<F>(&self, phase: SessionPhase, f: F) -> Result<PhaseKind>
    where
        F: FnOnce(&mut SessionState),
    {
        let mut outcome = Ok(PhaseKind::default());
        self.tx.send_if_modified(|current| {
            let from = current.kind();
            if let Err(e) = from.check_transition(phase.kind()) {
                outcome = Err(e);
                return false;
            }
            let mut next = SessionState::clone(current);
            next.phase = phase;
            f(&mut next);
            *current = Arc::new(next);
            outcome = Ok(from);
            true
        });
        outcome
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
