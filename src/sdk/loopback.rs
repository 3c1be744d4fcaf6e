//! In-process stand-in for the social-login SDK.
//!
//! The loopback widget "completes" after it has been checked a configured
//! number of times, at which point a provider carrying the configured account
//! appears. The bound RPC helper reads the account back out of the provider.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::{
    AuthParams, Blockchain, ChainRpc, ChainRpcFactory, Network, ProviderHandle, RpcHandle,
    SdkFactory, UserInfo, WalletHandle, WalletSdk, WhiteLabel,
};
use crate::error::SdkError;

/// Account the loopback provider resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopbackAccount {
    /// Account address.
    pub address: String,
    /// Chain id.
    pub chain_id: u64,
}

/// Loopback behaviour knobs.
#[derive(Debug, Clone)]
pub struct LoopbackSettings {
    /// Account handed out once the widget completes.
    pub account: LoopbackAccount,
    /// Provider checks after `show_widget` before a provider appears.
    pub approve_after: u32,
}

impl Default for LoopbackSettings {
    fn default() -> Self {
        Self {
            account: LoopbackAccount {
                address: "0x0000000000000000000000000000000000000001".to_string(),
                chain_id: 50,
            },
            approve_after: 2,
        }
    }
}

/// Builds [`LoopbackSdk`] instances.
#[derive(Debug, Clone, Default)]
pub struct LoopbackSdkFactory {
    settings: LoopbackSettings,
}

impl LoopbackSdkFactory {
    /// Create a factory with the given settings.
    pub fn new(settings: LoopbackSettings) -> Self {
        Self { settings }
    }
}

impl SdkFactory for LoopbackSdkFactory {
    fn construct(
        &self,
        params: &AuthParams,
        white_label: &WhiteLabel,
    ) -> Result<Arc<dyn WalletSdk>, SdkError> {
        if params.client_id.is_empty() {
            return Err(SdkError::new("client id is required"));
        }
        Ok(Arc::new(LoopbackSdk::new(
            self.settings.clone(),
            white_label.clone(),
        )))
    }
}

#[derive(Debug, Default)]
struct LoopbackState {
    network: Option<Network>,
    widget_visible: bool,
    checks: u32,
    provider: Option<ProviderHandle>,
}

/// Loopback SDK instance.
#[derive(Debug)]
pub struct LoopbackSdk {
    settings: LoopbackSettings,
    white_label: WhiteLabel,
    state: Mutex<LoopbackState>,
}

impl LoopbackSdk {
    fn new(settings: LoopbackSettings, white_label: WhiteLabel) -> Self {
        Self {
            settings,
            white_label,
            state: Mutex::new(LoopbackState::default()),
        }
    }

    /// Whether the widget is currently shown.
    #[cfg(test)]
    pub(crate) fn widget_visible(&self) -> bool {
        self.state.lock().map(|s| s.widget_visible).unwrap_or(false)
    }

    /// Network passed to `init`, if any.
    #[cfg(test)]
    pub(crate) fn network(&self) -> Option<Network> {
        self.state.lock().ok().and_then(|s| s.network)
    }
}

#[async_trait]
impl WalletSdk for LoopbackSdk {
    async fn init(&self, network: Network) -> Result<(), SdkError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| SdkError::new("loopback state poisoned"))?;
        state.network = Some(network);
        debug!(%network, "loopback SDK initialized");
        Ok(())
    }

    fn show_widget(&self) {
        if let Ok(mut state) = self.state.lock() {
            if !state.widget_visible {
                state.checks = 0;
            }
            state.widget_visible = true;
        }
    }

    fn hide_widget(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.widget_visible = false;
        }
    }

    async fn logout(&self) -> Result<(), SdkError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| SdkError::new("loopback state poisoned"))?;
        if state.network.is_none() {
            return Err(SdkError::new("SDK not initialized"));
        }
        state.provider = None;
        state.widget_visible = false;
        Ok(())
    }

    async fn user_info(&self) -> Result<UserInfo, SdkError> {
        let connected = self
            .state
            .lock()
            .map_err(|_| SdkError::new("loopback state poisoned"))?
            .provider
            .is_some();
        if !connected {
            return Err(SdkError::new("user not logged in"));
        }
        Ok(json!({
            "name": format!("{} user", self.white_label.name),
            "email": "user@loopback.invalid",
            "profileImage": self.white_label.logo,
            "typeOfLogin": "loopback",
            "verifier": self.white_label.name,
        }))
    }

    fn provider(&self) -> Option<ProviderHandle> {
        let mut state = self.state.lock().ok()?;
        if state.provider.is_none() && state.widget_visible {
            state.checks += 1;
            if state.checks >= self.settings.approve_after {
                state.provider = Some(ProviderHandle::new(
                    "loopback",
                    self.settings.account.clone(),
                ));
            }
        }
        state.provider.clone()
    }

    fn is_connected(&self) -> bool {
        self.state
            .lock()
            .map(|s| s.provider.is_some())
            .unwrap_or(false)
    }
}

/// Binds [`LoopbackRpc`] helpers to loopback providers.
#[derive(Debug, Clone, Default)]
pub struct LoopbackRpcFactory;

impl ChainRpcFactory for LoopbackRpcFactory {
    fn bind(&self, provider: &ProviderHandle, chain: &Blockchain) -> Arc<dyn ChainRpc> {
        Arc::new(LoopbackRpc {
            account: provider.downcast_ref::<LoopbackAccount>().cloned(),
            chain: chain.clone(),
        })
    }
}

/// Chain RPC helper over a loopback provider.
#[derive(Debug)]
pub struct LoopbackRpc {
    account: Option<LoopbackAccount>,
    chain: Blockchain,
}

impl LoopbackRpc {
    fn account(&self) -> Result<&LoopbackAccount, SdkError> {
        self.account
            .as_ref()
            .ok_or_else(|| SdkError::new("provider is not a loopback provider"))
    }
}

#[async_trait]
impl ChainRpc for LoopbackRpc {
    async fn accounts(&self) -> Result<String, SdkError> {
        Ok(self.account()?.address.clone())
    }

    async fn chain_id(&self) -> Result<u64, SdkError> {
        Ok(self.account()?.chain_id)
    }

    async fn wallet(&self) -> Result<WalletHandle, SdkError> {
        let account = self.account()?;
        Ok(WalletHandle::new(
            format!("{}-wallet", self.chain.blockchain),
            account.address.clone(),
        ))
    }

    async fn rpc_provider(&self) -> Result<RpcHandle, SdkError> {
        self.account()?;
        Ok(RpcHandle::new(
            format!("{}-{}", self.chain.blockchain, self.chain.network),
            self.chain.clone(),
        ))
    }
}
