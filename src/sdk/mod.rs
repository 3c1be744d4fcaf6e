//! Boundary to the social-login wallet SDK and the chain RPC helper.
//!
//! Both collaborators are opaque: the controller drives them only through
//! the traits defined here. A real integration implements [`SdkFactory`] and
//! [`ChainRpcFactory`]; the [`loopback`] module provides an in-process
//! stand-in used by the binary.

mod handle;
pub mod loopback;

pub use handle::{ProviderHandle, RpcHandle, WalletHandle};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SdkError;

/// Opaque user profile returned by the SDK.
pub type UserInfo = serde_json::Value;

/// Authentication network the SDK initializes against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    Mainnet,
    Testnet,
    Cyan,
    Aqua,
    SapphireDevnet,
    #[default]
    SapphireMainnet,
}

impl Network {
    /// Wire name of the network.
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Cyan => "cyan",
            Network::Aqua => "aqua",
            Network::SapphireDevnet => "sapphire_devnet",
            Network::SapphireMainnet => "sapphire_mainnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "cyan" => Ok(Network::Cyan),
            "aqua" => Ok(Network::Aqua),
            "sapphire_devnet" => Ok(Network::SapphireDevnet),
            "sapphire_mainnet" => Ok(Network::SapphireMainnet),
            other => Err(format!("unknown network: {}", other)),
        }
    }
}

/// Credentials used to construct the SDK.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthParams {
    /// Authentication backend type.
    pub kind: String,
    /// Dashboard client id.
    pub client_id: String,
    /// Dashboard client secret.
    pub client_secret: String,
}

impl AuthParams {
    /// Parameters for the default `web3auth` backend.
    pub fn web3auth(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            kind: "web3auth".to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for AuthParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthParams")
            .field("kind", &self.kind)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Branding shown inside the SDK widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhiteLabel {
    /// Display name.
    pub name: String,
    /// Logo URL.
    pub logo: String,
}

/// Chain descriptor the RPC helper is bound with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blockchain {
    /// Blockchain family (e.g. `xinfin`).
    pub blockchain: String,
    /// Network tier (e.g. `mainnet`).
    pub network: String,
}

/// A constructed social-login SDK instance.
#[async_trait]
pub trait WalletSdk: Send + Sync {
    /// Initialize the SDK against an authentication network.
    async fn init(&self, network: Network) -> Result<(), SdkError>;

    /// Show the wallet selection/authentication widget.
    fn show_widget(&self);

    /// Hide the wallet widget.
    fn hide_widget(&self);

    /// End the SDK session.
    async fn logout(&self) -> Result<(), SdkError>;

    /// Fetch the signed-in user's profile.
    async fn user_info(&self) -> Result<UserInfo, SdkError>;

    /// The active provider, once the widget flow has completed.
    fn provider(&self) -> Option<ProviderHandle>;

    /// Whether the underlying auth adapter reports a live connection.
    fn is_connected(&self) -> bool;
}

/// Constructs SDK instances.
pub trait SdkFactory: Send + Sync {
    /// Build a new, uninitialized SDK instance.
    fn construct(
        &self,
        params: &AuthParams,
        white_label: &WhiteLabel,
    ) -> Result<Arc<dyn WalletSdk>, SdkError>;
}

/// Chain-specific helper bound to a provider.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Primary account address. Empty while the provider has not derived one.
    async fn accounts(&self) -> Result<String, SdkError>;

    /// Numeric chain id.
    async fn chain_id(&self) -> Result<u64, SdkError>;

    /// Signing wallet instance.
    async fn wallet(&self) -> Result<WalletHandle, SdkError>;

    /// RPC provider instance.
    async fn rpc_provider(&self) -> Result<RpcHandle, SdkError>;
}

/// Binds chain RPC helpers to providers.
pub trait ChainRpcFactory: Send + Sync {
    /// Create a helper for `provider` on `chain`.
    fn bind(&self, provider: &ProviderHandle, chain: &Blockchain) -> Arc<dyn ChainRpc>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_roundtrip_names() {
        for net in [
            Network::Mainnet,
            Network::Testnet,
            Network::Cyan,
            Network::Aqua,
            Network::SapphireDevnet,
            Network::SapphireMainnet,
        ] {
            assert_eq!(net.as_str().parse::<Network>().unwrap(), net);
        }
        assert!("devnet".parse::<Network>().is_err());
    }

    #[test]
    fn test_network_default() {
        assert_eq!(Network::default(), Network::SapphireMainnet);
    }

    #[test]
    fn test_network_serde() {
        let json = serde_json::to_string(&Network::SapphireDevnet).unwrap();
        assert_eq!(json, "\"sapphire_devnet\"");
    }

    #[test]
    fn test_auth_params_debug_redacts_secret() {
        let params = AuthParams::web3auth("client-1", "very-secret");
        let debug = format!("{:?}", params);
        assert!(debug.contains("client-1"));
        assert!(!debug.contains("very-secret"));
        assert_eq!(params.kind, "web3auth");
    }
}
