//! Session lifecycle integration tests.
//!
//! The SDK and chain RPC helper are replaced by recording mocks; the recovery
//! poll runs on a `ManualClock` so every tick is explicit.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use wallet_session::controller::{PollClock, PollPolicy, SessionConfig};
use wallet_session::sdk::{
    AuthParams, Blockchain, ChainRpc, ChainRpcFactory, Network, ProviderHandle, RpcHandle,
    SdkFactory, UserInfo, WalletHandle, WalletSdk, WhiteLabel,
};
use wallet_session::{
    ConnectOutcome, DisconnectOutcome, ManualClock, PhaseKind, SdkError, SessionController,
    SessionError, SessionState,
};

const ADDRESS: &str = "0xABC...123";
const CHAIN_ID: u64 = 51;

// ============================================================================
// Mock Collaborators
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
struct Calls {
    construct: usize,
    init: Vec<Network>,
    show: usize,
    hide: usize,
    logout: usize,
    user_info: usize,
    bind: Vec<Blockchain>,
    accounts: usize,
    chain_id: usize,
    wallet: usize,
    rpc_provider: usize,
}

impl Calls {
    fn rpc_total(&self) -> usize {
        self.bind.len() + self.accounts + self.chain_id + self.wallet + self.rpc_provider
    }
}

struct Script {
    fail_construct: bool,
    fail_init: bool,
    fail_logout: bool,
    fail_user_info: bool,
    fail_chain_id: bool,
    adapter_connected: bool,
    /// `accounts()` returns an empty string this many times first.
    empty_accounts: usize,
    init_gate: Option<Arc<Notify>>,
    /// The next `accounts()` call parks on this until notified.
    accounts_gate: Option<Arc<Notify>>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            fail_construct: false,
            fail_init: false,
            fail_logout: false,
            fail_user_info: false,
            fail_chain_id: false,
            adapter_connected: true,
            empty_accounts: 0,
            init_gate: None,
            accounts_gate: None,
        }
    }
}

#[derive(Clone, Default)]
struct Mock {
    script: Arc<Mutex<Script>>,
    calls: Arc<Mutex<Calls>>,
    provider: Arc<Mutex<Option<ProviderHandle>>>,
    init_entered: Arc<Notify>,
    accounts_entered: Arc<Notify>,
}

impl Mock {
    fn new() -> Self {
        Self::default()
    }

    fn script(&self, f: impl FnOnce(&mut Script)) {
        f(&mut self.script.lock().unwrap());
    }

    fn calls(&self) -> Calls {
        self.calls.lock().unwrap().clone()
    }

    /// Simulate the user finishing the SDK widget flow.
    fn complete_widget(&self) {
        *self.provider.lock().unwrap() = Some(ProviderHandle::new("mock-provider", ()));
    }
}

struct MockSdkFactory(Mock);

impl SdkFactory for MockSdkFactory {
    fn construct(
        &self,
        params: &AuthParams,
        white_label: &WhiteLabel,
    ) -> Result<Arc<dyn WalletSdk>, SdkError> {
        assert_eq!(params.client_id, "client-id");
        assert_eq!(white_label.name, "XDC Auth");
        self.0.calls.lock().unwrap().construct += 1;
        if self.0.script.lock().unwrap().fail_construct {
            return Err(SdkError::new("invalid client id"));
        }
        Ok(Arc::new(MockSdk(self.0.clone())))
    }
}

struct MockSdk(Mock);

#[async_trait]
impl WalletSdk for MockSdk {
    async fn init(&self, network: Network) -> Result<(), SdkError> {
        self.0.calls.lock().unwrap().init.push(network);
        let (gate, fail) = {
            let script = self.0.script.lock().unwrap();
            (script.init_gate.clone(), script.fail_init)
        };
        if let Some(gate) = gate {
            self.0.init_entered.notify_one();
            gate.notified().await;
        }
        if fail {
            return Err(SdkError::new("network unreachable"));
        }
        Ok(())
    }

    fn show_widget(&self) {
        self.0.calls.lock().unwrap().show += 1;
    }

    fn hide_widget(&self) {
        self.0.calls.lock().unwrap().hide += 1;
    }

    async fn logout(&self) -> Result<(), SdkError> {
        self.0.calls.lock().unwrap().logout += 1;
        if self.0.script.lock().unwrap().fail_logout {
            return Err(SdkError::new("session expired"));
        }
        *self.0.provider.lock().unwrap() = None;
        Ok(())
    }

    async fn user_info(&self) -> Result<UserInfo, SdkError> {
        self.0.calls.lock().unwrap().user_info += 1;
        if self.0.script.lock().unwrap().fail_user_info {
            return Err(SdkError::new("token revoked"));
        }
        Ok(json!({"name": "Ada", "typeOfLogin": "google"}))
    }

    fn provider(&self) -> Option<ProviderHandle> {
        self.0.provider.lock().unwrap().clone()
    }

    fn is_connected(&self) -> bool {
        self.0.provider.lock().unwrap().is_some()
            && self.0.script.lock().unwrap().adapter_connected
    }
}

struct MockRpcFactory(Mock);

impl ChainRpcFactory for MockRpcFactory {
    fn bind(&self, _provider: &ProviderHandle, chain: &Blockchain) -> Arc<dyn ChainRpc> {
        self.0.calls.lock().unwrap().bind.push(chain.clone());
        Arc::new(MockRpc(self.0.clone()))
    }
}

struct MockRpc(Mock);

#[async_trait]
impl ChainRpc for MockRpc {
    async fn accounts(&self) -> Result<String, SdkError> {
        self.0.calls.lock().unwrap().accounts += 1;
        let gate = self.0.script.lock().unwrap().accounts_gate.take();
        if let Some(gate) = gate {
            self.0.accounts_entered.notify_one();
            gate.notified().await;
        }
        let mut script = self.0.script.lock().unwrap();
        if script.empty_accounts > 0 {
            script.empty_accounts -= 1;
            return Ok(String::new());
        }
        Ok(ADDRESS.to_string())
    }

    async fn chain_id(&self) -> Result<u64, SdkError> {
        self.0.calls.lock().unwrap().chain_id += 1;
        if self.0.script.lock().unwrap().fail_chain_id {
            return Err(SdkError::new("eth_chainId timed out"));
        }
        Ok(CHAIN_ID)
    }

    async fn wallet(&self) -> Result<WalletHandle, SdkError> {
        self.0.calls.lock().unwrap().wallet += 1;
        Ok(WalletHandle::new("mock-wallet", ()))
    }

    async fn rpc_provider(&self) -> Result<RpcHandle, SdkError> {
        self.0.calls.lock().unwrap().rpc_provider += 1;
        Ok(RpcHandle::new("mock-rpc", ()))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn session_config(poll: PollPolicy) -> SessionConfig {
    SessionConfig {
        auth: AuthParams::web3auth("client-id", "client-secret"),
        white_label: WhiteLabel {
            name: "XDC Auth".to_string(),
            logo: "https://xinfin.org/assets/images/brand-assets/xdc-icon.png".to_string(),
        },
        network: Network::SapphireMainnet,
        chain: Blockchain {
            blockchain: "xinfin".to_string(),
            network: "mainnet".to_string(),
        },
        poll,
    }
}

fn setup_with(poll: PollPolicy) -> (SessionController, Mock, ManualClock) {
    let mock = Mock::new();
    let clock = ManualClock::new();
    let controller = SessionController::with_clock(
        session_config(poll),
        Arc::new(MockSdkFactory(mock.clone())),
        Arc::new(MockRpcFactory(mock.clone())),
        Arc::new(clock.clone()) as Arc<dyn PollClock>,
    );
    (controller, mock, clock)
}

fn setup() -> (SessionController, Mock, ManualClock) {
    setup_with(PollPolicy::default())
}

/// Drive a controller all the way to `Connected`.
async fn connected() -> (SessionController, Mock, ManualClock) {
    let (controller, mock, clock) = setup();
    assert_eq!(controller.connect().await, ConnectOutcome::Initialized);
    mock.complete_widget();
    assert!(clock.advance().await.is_none());
    assert_eq!(controller.snapshot().kind(), PhaseKind::Connected);
    (controller, mock, clock)
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

#[tokio::test]
async fn first_connect_then_provider_arrives() {
    let (controller, mock, clock) = setup();

    assert_eq!(controller.connect().await, ConnectOutcome::Initialized);

    let calls = mock.calls();
    assert_eq!(calls.construct, 1);
    assert_eq!(calls.init, vec![Network::SapphireMainnet]);
    assert_eq!(calls.show, 1);
    let snap = controller.snapshot();
    assert_eq!(snap.kind(), PhaseKind::Initializing);
    assert!(!snap.loading);
    assert!(controller.sdk().is_some());
    assert!(controller.is_polling());

    mock.complete_widget();
    // The tick that derives the address also ends the poll.
    assert!(clock.advance().await.is_none());

    let snap = controller.snapshot();
    assert_eq!(snap.kind(), PhaseKind::Connected);
    assert_eq!(snap.address(), ADDRESS);
    assert_eq!(snap.chain_id(), CHAIN_ID);
    assert!(!snap.loading);
    assert!(snap.last_error.is_none());

    let calls = mock.calls();
    assert_eq!(
        calls.bind,
        vec![Blockchain {
            blockchain: "xinfin".to_string(),
            network: "mainnet".to_string(),
        }]
    );
    assert_eq!(calls.hide, 1);
    assert!(!controller.is_polling());
}

#[tokio::test]
async fn connect_while_connected_is_free() {
    let (controller, mock, _clock) = connected().await;
    let before = mock.calls();

    assert_eq!(controller.connect().await, ConnectOutcome::AlreadyConnected);

    assert_eq!(mock.calls(), before);
}

#[tokio::test]
async fn disconnect_resets_everything() {
    let (controller, mock, _clock) = connected().await;
    controller.get_user_info().await;
    let hides = mock.calls().hide;

    assert_eq!(controller.disconnect().await, DisconnectOutcome::Disconnected);

    let calls = mock.calls();
    assert_eq!(calls.logout, 1);
    assert_eq!(calls.hide, hides + 1);
    assert_eq!(*controller.snapshot(), SessionState::new());
    assert!(controller.sdk().is_none());
}

#[tokio::test]
async fn empty_accounts_retry_until_address() {
    let (controller, mock, clock) = setup();
    mock.script(|s| s.empty_accounts = 2);

    controller.connect().await;
    mock.complete_widget();

    assert!(clock.advance().await.is_some());
    assert_eq!(controller.snapshot().kind(), PhaseKind::AwaitingAddress);
    assert!(clock.advance().await.is_some());
    assert_eq!(controller.snapshot().kind(), PhaseKind::AwaitingAddress);
    assert!(clock.advance().await.is_none());
    assert_eq!(controller.snapshot().kind(), PhaseKind::Connected);

    assert_eq!(mock.calls().accounts, 3);

    // No further ticks are scheduled.
    assert!(clock.advance().await.is_none());
    assert!(clock.advance().await.is_none());
    assert_eq!(mock.calls().accounts, 3);
}

// ============================================================================
// Session Invariant Tests
// ============================================================================

#[tokio::test]
async fn connect_is_idempotent_while_connected() {
    let (controller, _mock, _clock) = connected().await;
    let before = controller.snapshot();

    for _ in 0..3 {
        controller.connect().await;
    }

    let after = controller.snapshot();
    assert_eq!(after.kind(), before.kind());
    assert_eq!(after.provider(), before.provider());
    assert_eq!(after.address(), before.address());
}

#[tokio::test]
async fn connected_implies_all_fields() {
    let (controller, _mock, _clock) = connected().await;
    let snap = controller.snapshot();

    assert!(!snap.address().is_empty());
    assert_ne!(snap.chain_id(), 0);
    assert_eq!(snap.rpc().map(RpcHandle::label), Some("mock-rpc"));
    assert_eq!(snap.wallet().map(WalletHandle::label), Some("mock-wallet"));
    assert!(snap.provider().is_some());
}

#[tokio::test]
async fn disconnect_from_initializing() {
    let (controller, mock, clock) = setup();
    controller.connect().await;
    assert_eq!(controller.snapshot().kind(), PhaseKind::Initializing);

    assert_eq!(controller.disconnect().await, DisconnectOutcome::Disconnected);

    let snap = controller.snapshot();
    assert_eq!(snap.kind(), PhaseKind::Uninitialized);
    assert_eq!(snap.address(), "");
    assert_eq!(snap.chain_id(), 0);
    assert!(snap.user_info.is_none());
    assert_eq!(mock.calls().logout, 1);
    assert!(!controller.is_polling());
    assert!(clock.advance().await.is_none());
}

#[tokio::test]
async fn disconnect_without_sdk_is_noop() {
    let (controller, mock, _clock) = setup();

    assert_eq!(
        controller.disconnect().await,
        DisconnectOutcome::NotInitialized
    );
    assert_eq!(*controller.snapshot(), SessionState::new());
    assert_eq!(mock.calls(), Calls::default());
}

#[tokio::test]
async fn disconnect_twice_is_safe() {
    let (controller, mock, _clock) = connected().await;

    assert_eq!(controller.disconnect().await, DisconnectOutcome::Disconnected);
    assert_eq!(
        controller.disconnect().await,
        DisconnectOutcome::NotInitialized
    );
    assert_eq!(mock.calls().logout, 1);
    assert_eq!(controller.snapshot().kind(), PhaseKind::Uninitialized);
}

#[tokio::test]
async fn poll_waits_for_provider_without_retrying() {
    let (controller, mock, clock) = setup();
    controller.connect().await;

    for _ in 0..5 {
        assert!(clock.advance().await.is_some());
    }
    assert_eq!(mock.calls().rpc_total(), 0);
    assert_eq!(controller.snapshot().kind(), PhaseKind::Initializing);
    assert!(controller.is_polling());
}

#[tokio::test]
async fn initialization_failure_is_captured() {
    let (controller, mock, _clock) = setup();
    mock.script(|s| s.fail_init = true);

    assert_eq!(controller.connect().await, ConnectOutcome::Failed);

    let snap = controller.snapshot();
    assert_eq!(snap.kind(), PhaseKind::Uninitialized);
    assert!(!snap.loading);
    assert!(matches!(
        snap.last_error,
        Some(SessionError::Initialization(_))
    ));
    assert!(controller.sdk().is_none());
    assert!(!controller.is_polling());
}

#[tokio::test]
async fn construction_failure_is_captured() {
    let (controller, mock, _clock) = setup();
    mock.script(|s| s.fail_construct = true);

    assert_eq!(controller.connect().await, ConnectOutcome::Failed);
    assert!(mock.calls().init.is_empty());
    assert_eq!(
        controller.snapshot().last_error,
        Some(SessionError::Initialization(SdkError::new(
            "invalid client id"
        )))
    );
}

#[tokio::test]
async fn connection_failure_keeps_phase() {
    let (controller, mock, clock) = setup();
    mock.script(|s| s.fail_chain_id = true);

    controller.connect().await;
    mock.complete_widget();
    assert!(clock.advance().await.is_some());

    let snap = controller.snapshot();
    assert_eq!(snap.kind(), PhaseKind::AwaitingAddress);
    assert!(!snap.loading);
    assert!(matches!(snap.last_error, Some(SessionError::Connection(_))));

    // The poll keeps trying and succeeds once the helper recovers.
    mock.script(|s| s.fail_chain_id = false);
    assert!(clock.advance().await.is_none());
    assert_eq!(controller.snapshot().kind(), PhaseKind::Connected);
}

#[tokio::test]
async fn logout_failure_restores_phase() {
    let (controller, mock, _clock) = connected().await;
    mock.script(|s| s.fail_logout = true);

    assert_eq!(controller.disconnect().await, DisconnectOutcome::Failed);

    let snap = controller.snapshot();
    assert_eq!(snap.kind(), PhaseKind::Connected);
    assert_eq!(snap.address(), ADDRESS);
    assert!(matches!(snap.last_error, Some(SessionError::Logout(_))));
    assert!(controller.sdk().is_some());
}

// ============================================================================
// User Info, Guard and Poll Policy Tests
// ============================================================================

#[tokio::test]
async fn connect_reshows_widget_when_adapter_not_connected() {
    let (controller, mock, _clock) = setup();
    controller.connect().await;
    mock.script(|s| s.adapter_connected = false);
    mock.complete_widget();

    assert_eq!(controller.connect().await, ConnectOutcome::WidgetShown);
    assert_eq!(mock.calls().show, 2);
    assert_eq!(mock.calls().construct, 1);
}

#[tokio::test]
async fn user_info_is_cached_and_cleared() {
    let (controller, mock, _clock) = setup();

    // No SDK yet: silently nothing.
    assert!(controller.get_user_info().await.is_none());
    assert_eq!(mock.calls().user_info, 0);

    controller.connect().await;
    let info = controller.get_user_info().await.unwrap();
    assert_eq!(info["name"], "Ada");
    assert_eq!(
        controller.snapshot().user_info,
        Some(json!({"name": "Ada", "typeOfLogin": "google"}))
    );

    controller.disconnect().await;
    assert!(controller.snapshot().user_info.is_none());
}

#[tokio::test]
async fn user_info_failure_is_captured() {
    let (controller, mock, _clock) = connected().await;
    mock.script(|s| s.fail_user_info = true);

    assert!(controller.get_user_info().await.is_none());
    let snap = controller.snapshot();
    assert!(matches!(snap.last_error, Some(SessionError::ProfileFetch(_))));
    assert_eq!(snap.kind(), PhaseKind::Connected);

    controller.clear_error();
    assert!(controller.snapshot().last_error.is_none());
}

#[tokio::test]
async fn overlapping_actions_are_rejected() {
    let (controller, mock, _clock) = setup();
    let gate = Arc::new(Notify::new());
    mock.script(|s| s.init_gate = Some(Arc::clone(&gate)));

    let first = tokio::spawn({
        let controller = controller.clone();
        async move { controller.connect().await }
    });
    mock.init_entered.notified().await;

    assert!(controller.snapshot().loading);
    assert_eq!(controller.connect().await, ConnectOutcome::Busy);
    assert_eq!(controller.disconnect().await, DisconnectOutcome::Busy);

    gate.notify_one();
    assert_eq!(first.await.unwrap(), ConnectOutcome::Initialized);
    assert_eq!(mock.calls().construct, 1);
}

#[tokio::test]
async fn attempt_cap_stops_recovery() {
    let (controller, mock, clock) = setup_with(PollPolicy::default().with_max_attempts(2));
    mock.script(|s| s.empty_accounts = usize::MAX);

    controller.connect().await;
    mock.complete_widget();

    assert!(clock.advance().await.is_some());
    assert!(clock.advance().await.is_some());
    assert!(clock.advance().await.is_none());

    assert_eq!(mock.calls().accounts, 2);
    let snap = controller.snapshot();
    assert_eq!(snap.kind(), PhaseKind::AwaitingAddress);
    assert_eq!(snap.last_error, Some(SessionError::RecoveryExhausted(2)));
}

#[tokio::test]
async fn rejected_retry_does_not_use_attempt() {
    let (controller, mock, clock) = setup_with(PollPolicy::default().with_max_attempts(1));
    mock.script(|s| s.empty_accounts = usize::MAX);

    controller.connect().await;
    mock.complete_widget();

    // A user connect holds the guard while the helper derives the account.
    let gate = Arc::new(Notify::new());
    mock.script(|s| s.accounts_gate = Some(Arc::clone(&gate)));
    let user = tokio::spawn({
        let controller = controller.clone();
        async move { controller.connect().await }
    });
    mock.accounts_entered.notified().await;

    // The tick finds the guard taken and waits for the next one.
    assert!(clock.advance().await.is_some());
    assert_eq!(mock.calls().accounts, 1);

    gate.notify_one();
    assert_eq!(user.await.unwrap(), ConnectOutcome::AwaitingAddress);

    // The single allowed attempt is still available.
    assert!(clock.advance().await.is_some());
    assert_eq!(mock.calls().accounts, 2);
    assert!(clock.advance().await.is_none());
    assert_eq!(
        controller.snapshot().last_error,
        Some(SessionError::RecoveryExhausted(1))
    );
}

#[tokio::test]
async fn connect_after_exhausted_recovery_restarts_poll() {
    let (controller, mock, clock) = setup_with(PollPolicy::default().with_max_attempts(1));
    mock.script(|s| s.adapter_connected = false);

    controller.connect().await;
    mock.complete_widget();

    assert!(clock.advance().await.is_some());
    assert!(clock.advance().await.is_none());
    assert!(!controller.is_polling());
    assert_eq!(
        controller.snapshot().last_error,
        Some(SessionError::RecoveryExhausted(1))
    );

    assert_eq!(controller.connect().await, ConnectOutcome::WidgetShown);
    assert!(controller.is_polling());
    assert!(clock.is_attached());

    // The user finishes the widget; the restarted poll picks it up.
    mock.script(|s| s.adapter_connected = true);
    assert!(clock.advance().await.is_none());
    assert_eq!(controller.snapshot().kind(), PhaseKind::Connected);
    assert_eq!(controller.snapshot().address(), ADDRESS);
}

#[tokio::test]
async fn exponential_backoff_delays() {
    let policy = PollPolicy::every(Duration::from_millis(100))
        .with_exponential_backoff(Duration::from_millis(400));
    let (controller, mock, clock) = setup_with(policy);
    mock.script(|s| s.empty_accounts = usize::MAX);

    controller.connect().await;
    mock.complete_widget();

    assert_eq!(clock.advance().await, Some(Duration::from_millis(100)));
    assert_eq!(clock.advance().await, Some(Duration::from_millis(200)));
    assert_eq!(clock.advance().await, Some(Duration::from_millis(400)));
    assert_eq!(clock.advance().await, Some(Duration::from_millis(400)));
    assert_eq!(mock.calls().accounts, 4);
}

#[tokio::test]
async fn reconnect_after_disconnect_builds_new_sdk() {
    let (controller, mock, clock) = connected().await;
    let first_sdk = controller.sdk().unwrap();

    controller.disconnect().await;
    assert_eq!(controller.connect().await, ConnectOutcome::Initialized);

    assert_eq!(mock.calls().construct, 2);
    assert!(!Arc::ptr_eq(&first_sdk, &controller.sdk().unwrap()));
    assert!(clock.is_attached());

    mock.complete_widget();
    assert!(clock.advance().await.is_none());
    assert_eq!(controller.snapshot().address(), ADDRESS);
}

#[tokio::test]
async fn subscribers_only_see_whole_snapshots() {
    let (controller, mock, clock) = setup();
    let mut rx = controller.subscribe();
    let seen: Arc<Mutex<Vec<Arc<SessionState>>>> = Arc::new(Mutex::new(Vec::new()));

    let watcher = tokio::spawn({
        let seen = Arc::clone(&seen);
        async move {
            while rx.changed().await.is_ok() {
                let snap = rx.borrow_and_update().clone();
                let done = snap.is_connected();
                seen.lock().unwrap().push(snap);
                if done {
                    break;
                }
            }
        }
    });

    controller.connect().await;
    mock.complete_widget();
    clock.advance().await;
    watcher.await.unwrap();

    for snap in seen.lock().unwrap().iter() {
        let connected = snap.kind() == PhaseKind::Connected;
        assert_eq!(connected, !snap.address().is_empty());
        assert_eq!(connected, snap.rpc().is_some());
        let carries_provider = matches!(
            snap.kind(),
            PhaseKind::AwaitingAddress | PhaseKind::Connected
        );
        assert_eq!(snap.provider().is_some(), carries_provider);
    }
}

#[test]
fn user_info_payload_is_opaque() {
    let state = SessionState {
        user_info: Some(Value::String("anything".into())),
        ..SessionState::default()
    };
    let text = wallet_session::shell::render(&state);
    assert!(text.contains("\"anything\""));
}
