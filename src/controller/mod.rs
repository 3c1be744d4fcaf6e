//! Wallet session lifecycle controller.
//!
//! The controller owns the SDK instance, drives the phase machine and is the
//! only writer of the [`SessionStore`]. Actions never return errors: failures
//! are logged and captured in [`SessionState::last_error`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wallet_session::controller::{SessionConfig, SessionController};
//! use wallet_session::sdk::loopback::{LoopbackRpcFactory, LoopbackSdkFactory};
//!
//! # async fn demo(config: SessionConfig) {
//! let controller = SessionController::new(
//!     config,
//!     Arc::new(LoopbackSdkFactory::default()),
//!     Arc::new(LoopbackRpcFactory),
//! );
//! controller.connect().await;
//! println!("phase: {}", controller.snapshot().kind());
//! # }
//! ```

mod clock;
mod poll;

pub use clock::{ManualClock, PollClock, PollTimer, TokioClock};
pub use poll::{Backoff, PollPolicy, DEFAULT_MAX_INTERVAL, DEFAULT_POLL_INTERVAL};

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{SdkError, SessionError};
use crate::sdk::{
    AuthParams, Blockchain, ChainRpc, ChainRpcFactory, Network, ProviderHandle, SdkFactory,
    UserInfo, WalletSdk, WhiteLabel,
};
use crate::session::{Connection, PhaseKind, SessionPhase, SessionState, SessionStore};

/// Static settings the controller is built with.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// SDK credentials.
    pub auth: AuthParams,
    /// Widget branding.
    pub white_label: WhiteLabel,
    /// Authentication network.
    pub network: Network,
    /// Chain the RPC helper is bound to.
    pub chain: Blockchain,
    /// Address recovery poll policy.
    pub poll: PollPolicy,
}

/// What a `connect` call did. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// An address was already known; nothing happened.
    AlreadyConnected,
    /// A new SDK instance was constructed and its widget shown.
    Initialized,
    /// The existing SDK's widget was shown again.
    WidgetShown,
    /// Provider present but no address derived yet.
    AwaitingAddress,
    /// Address and handles derived.
    Connected,
    /// Another action was in flight.
    Busy,
    /// A collaborator failed; see `last_error`.
    Failed,
}

/// What a `disconnect` call did. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectOutcome {
    /// Logged out and reset.
    Disconnected,
    /// No SDK instance existed; nothing happened.
    NotInitialized,
    /// Another action was in flight.
    Busy,
    /// Logout failed; see `last_error`.
    Failed,
}

struct Inner {
    config: SessionConfig,
    sdk_factory: Arc<dyn SdkFactory>,
    rpc_factory: Arc<dyn ChainRpcFactory>,
    clock: Arc<dyn PollClock>,
    store: SessionStore,
    sdk: Mutex<Option<Arc<dyn WalletSdk>>>,
    poll: Mutex<Option<CancellationToken>>,
    /// Single-flight guard shared by connect and disconnect.
    flight: tokio::sync::Mutex<()>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(token) = lock(&self.poll).take() {
            token.cancel();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to the session lifecycle controller.
///
/// Cloning is cheap; all clones drive the same session. The recovery poll
/// stops once the last handle is dropped.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    /// Create a controller that polls on tokio time.
    pub fn new(
        config: SessionConfig,
        sdk_factory: Arc<dyn SdkFactory>,
        rpc_factory: Arc<dyn ChainRpcFactory>,
    ) -> Self {
        Self::with_clock(config, sdk_factory, rpc_factory, Arc::new(TokioClock))
    }

    /// Create a controller with an explicit poll clock.
    pub fn with_clock(
        config: SessionConfig,
        sdk_factory: Arc<dyn SdkFactory>,
        rpc_factory: Arc<dyn ChainRpcFactory>,
        clock: Arc<dyn PollClock>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                sdk_factory,
                rpc_factory,
                clock,
                store: SessionStore::new(),
                sdk: Mutex::new(None),
                poll: Mutex::new(None),
                flight: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Settings the controller was built with.
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Current session snapshot.
    pub fn snapshot(&self) -> Arc<SessionState> {
        self.inner.store.snapshot()
    }

    /// Subscribe to session snapshot replacements.
    pub fn subscribe(&self) -> watch::Receiver<Arc<SessionState>> {
        self.inner.store.subscribe()
    }

    /// The SDK instance owned by this controller, if any.
    pub fn sdk(&self) -> Option<Arc<dyn WalletSdk>> {
        lock(&self.inner.sdk).clone()
    }

    /// Check whether the address recovery poll is running.
    pub fn is_polling(&self) -> bool {
        lock(&self.inner.poll)
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    /// Connect the wallet, or push an in-progress connection forward.
    ///
    /// Safe to call repeatedly: once an address is known this is a no-op.
    pub async fn connect(&self) -> ConnectOutcome {
        let Ok(_guard) = self.inner.flight.try_lock() else {
            warn!("connect rejected: another session action is in flight");
            return ConnectOutcome::Busy;
        };

        if self.snapshot().is_connected() {
            debug!("connect skipped: wallet already connected");
            return ConnectOutcome::AlreadyConnected;
        }

        match self.sdk() {
            Some(sdk) => {
                if sdk.is_connected() {
                    if let Some(provider) = sdk.provider() {
                        return self.derive_connection(&sdk, provider).await;
                    }
                }
                sdk.show_widget();
                debug!("wallet widget shown again");
                if !self.is_polling() {
                    self.start_polling();
                }
                ConnectOutcome::WidgetShown
            }
            None => self.initialize().await,
        }
    }

    /// Log out and reset the session.
    ///
    /// Without an SDK instance this is a logged no-op.
    pub async fn disconnect(&self) -> DisconnectOutcome {
        let Ok(_guard) = self.inner.flight.try_lock() else {
            warn!("disconnect rejected: another session action is in flight");
            return DisconnectOutcome::Busy;
        };

        let Some(sdk) = self.sdk() else {
            warn!("{}", SessionError::NotInitialized("disconnect"));
            return DisconnectOutcome::NotInitialized;
        };

        let previous = self.snapshot().phase.clone();
        if let Err(e) = self
            .inner
            .store
            .transition(SessionPhase::Disconnecting, |s| s.loading = false)
        {
            error!(error = %e, "cannot start disconnect");
            self.record(e);
            return DisconnectOutcome::Failed;
        }
        self.stop_polling();

        match sdk.logout().await {
            Ok(()) => {
                let reset = self.inner.store.transition(SessionPhase::Uninitialized, |s| {
                    s.loading = false;
                    s.user_info = None;
                    s.last_error = None;
                });
                if let Err(e) = reset {
                    error!(error = %e, "failed to reset session after logout");
                }
                sdk.hide_widget();
                *lock(&self.inner.sdk) = None;
                info!("wallet disconnected");
                DisconnectOutcome::Disconnected
            }
            Err(e) => {
                let err = SessionError::Logout(e);
                error!(error = %err, "disconnect failed");
                let resume_polling = previous.kind() != PhaseKind::Connected;
                let restored = self.inner.store.transition(previous, |s| {
                    s.last_error = Some(err.clone());
                });
                if let Err(e) = restored {
                    error!(error = %e, "failed to restore phase after logout failure");
                    self.record(err);
                }
                if resume_polling {
                    self.start_polling();
                }
                DisconnectOutcome::Failed
            }
        }
    }

    /// Fetch the user's profile and cache it in the session.
    ///
    /// Returns `None` without an SDK instance or when the fetch fails.
    pub async fn get_user_info(&self) -> Option<UserInfo> {
        let Some(sdk) = self.sdk() else {
            debug!("user info requested without an SDK instance");
            return None;
        };

        let result = sdk.user_info().await;

        // Drop results for an SDK instance that was disconnected meanwhile.
        let current = self.sdk();
        if !current.is_some_and(|c| Arc::ptr_eq(&c, &sdk)) {
            debug!("discarding user info from a replaced SDK instance");
            return None;
        }

        match result {
            Ok(info) => {
                info!("user info fetched");
                let cached = info.clone();
                self.inner.store.update(|s| s.user_info = Some(cached));
                Some(info)
            }
            Err(e) => {
                let err = SessionError::ProfileFetch(e);
                error!(error = %err, "get user info failed");
                self.record(err);
                None
            }
        }
    }

    /// Clear the last captured error.
    pub fn clear_error(&self) {
        self.inner.store.update(|s| s.last_error = None);
    }

    /// Stop the recovery poll. The session itself is left as is.
    pub fn shutdown(&self) {
        self.stop_polling();
        debug!("session controller shut down");
    }

    async fn initialize(&self) -> ConnectOutcome {
        let config = &self.inner.config;
        self.inner.store.update(|s| s.loading = true);

        let constructed = async {
            let sdk = self
                .inner
                .sdk_factory
                .construct(&config.auth, &config.white_label)?;
            sdk.init(config.network).await?;
            Ok::<_, SdkError>(sdk)
        }
        .await;

        let sdk = match constructed {
            Ok(sdk) => sdk,
            Err(e) => {
                let err = SessionError::Initialization(e);
                error!(error = %err, network = %config.network, "connect failed");
                self.inner.store.update(|s| {
                    s.loading = false;
                    s.last_error = Some(err);
                });
                return ConnectOutcome::Failed;
            }
        };

        sdk.show_widget();
        if let Err(e) = self
            .inner
            .store
            .transition(SessionPhase::Initializing, |s| s.loading = false)
        {
            error!(error = %e, "cannot enter initializing phase");
            self.inner.store.update(|s| {
                s.loading = false;
                s.last_error = Some(e);
            });
            return ConnectOutcome::Failed;
        }
        *lock(&self.inner.sdk) = Some(Arc::clone(&sdk));
        if sdk.provider().is_some() {
            sdk.hide_widget();
        }
        info!(network = %config.network, "wallet SDK initialized, widget shown");

        self.start_polling();
        ConnectOutcome::Initialized
    }

    async fn derive_connection(
        &self,
        sdk: &Arc<dyn WalletSdk>,
        provider: ProviderHandle,
    ) -> ConnectOutcome {
        if self.snapshot().kind() == PhaseKind::Initializing {
            let awaiting = SessionPhase::AwaitingAddress {
                provider: provider.clone(),
            };
            match self.inner.store.transition(awaiting, |_| {}) {
                Ok(_) => info!(provider = provider.label(), "wallet provider available"),
                Err(e) => {
                    error!(error = %e, "cannot enter awaiting-address phase");
                    self.record(e);
                    return ConnectOutcome::Failed;
                }
            }
        }

        self.inner.store.update(|s| s.loading = true);
        let rpc = self
            .inner
            .rpc_factory
            .bind(&provider, &self.inner.config.chain);

        match fetch_connection(rpc.as_ref(), provider).await {
            Ok(Some(conn)) => {
                let address = conn.address.clone();
                let chain_id = conn.chain_id;
                if let Err(e) = self
                    .inner
                    .store
                    .transition(SessionPhase::Connected(conn), |s| s.loading = false)
                {
                    error!(error = %e, "cannot enter connected phase");
                    self.inner.store.update(|s| {
                        s.loading = false;
                        s.last_error = Some(e);
                    });
                    return ConnectOutcome::Failed;
                }
                self.stop_polling();
                sdk.hide_widget();
                info!(%address, chain_id, "wallet connected");
                ConnectOutcome::Connected
            }
            Ok(None) => {
                self.inner.store.update(|s| s.loading = false);
                debug!("provider has not derived an address yet");
                ConnectOutcome::AwaitingAddress
            }
            Err(e) => {
                let err = SessionError::Connection(e);
                error!(error = %err, "connect failed");
                self.inner.store.update(|s| {
                    s.loading = false;
                    s.last_error = Some(err);
                });
                ConnectOutcome::Failed
            }
        }
    }

    /// Boxed `connect` for the poll task, which is spawned from inside it.
    fn retry_connect(&self) -> Pin<Box<dyn Future<Output = ConnectOutcome> + Send + '_>> {
        Box::pin(self.connect())
    }

    fn record(&self, err: SessionError) {
        self.inner.store.update(|s| s.last_error = Some(err));
    }

    fn start_polling(&self) {
        let token = CancellationToken::new();
        if let Some(previous) = lock(&self.inner.poll).replace(token.clone()) {
            previous.cancel();
        }
        let timer = self.inner.clock.timer();
        let policy = self.inner.config.poll.clone();
        debug!(interval = ?policy.interval, max_attempts = ?policy.max_attempts, "recovery poll started");
        tokio::spawn(run_recovery(
            Arc::downgrade(&self.inner),
            timer,
            policy,
            token,
        ));
    }

    fn stop_polling(&self) {
        if let Some(token) = lock(&self.inner.poll).take() {
            token.cancel();
            debug!("recovery poll stopped");
        }
    }
}

async fn fetch_connection(
    rpc: &dyn ChainRpc,
    provider: ProviderHandle,
) -> Result<Option<Connection>, SdkError> {
    let address = rpc.accounts().await?;
    if address.is_empty() {
        return Ok(None);
    }
    let chain_id = rpc.chain_id().await?;
    let wallet = rpc.wallet().await?;
    let rpc_handle = rpc.rpc_provider().await?;
    Ok(Some(Connection {
        provider,
        address,
        chain_id,
        rpc: rpc_handle,
        wallet,
    }))
}

/// Recovery loop: while a provider exists without an address, keep calling
/// `connect` until the address is derived, the session goes away, or the
/// policy's attempt cap is hit.
async fn run_recovery(
    inner: Weak<Inner>,
    mut timer: Box<dyn PollTimer>,
    policy: PollPolicy,
    token: CancellationToken,
) {
    let mut attempts: u32 = 0;

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = timer.wait(policy.delay_after(attempts)) => {}
        }
        if token.is_cancelled() {
            break;
        }
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let controller = SessionController { inner };

        if controller.snapshot().is_connected() {
            debug!("address known, recovery poll done");
            break;
        }
        let Some(sdk) = controller.sdk() else {
            break;
        };
        if sdk.provider().is_none() {
            debug!("recovery tick: waiting for wallet provider");
            continue;
        }
        if !policy.allows(attempts) {
            let err = SessionError::RecoveryExhausted(attempts);
            warn!(error = %err, "recovery poll stopped");
            controller.record(err);
            break;
        }

        debug!(attempt = attempts + 1, "provider present without address, retrying connect");
        if controller.retry_connect().await == ConnectOutcome::Busy {
            debug!("retry deferred: session action in flight");
            continue;
        }
        attempts += 1;

        if controller.snapshot().is_connected() {
            break;
        }
    }

    token.cancel();
}
