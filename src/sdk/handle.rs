//! Opaque handles passed between the SDK, the chain RPC helper and the shell.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Shared, type-erased reference to a collaborator-owned object.
///
/// Cloning is cheap. Two handles are equal only when they point at the same
/// object, so a re-derived provider is distinguishable from the original.
#[derive(Clone)]
struct Opaque {
    label: Arc<str>,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Opaque {
    fn new<T: Any + Send + Sync>(label: impl Into<Arc<str>>, value: T) -> Self {
        Self {
            label: label.into(),
            inner: Arc::new(value),
        }
    }

    fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Handle to the active wallet provider exposed by the SDK.
#[derive(Clone)]
pub struct ProviderHandle(Opaque);

/// Handle to the chain RPC client derived from a provider.
#[derive(Clone)]
pub struct RpcHandle(Opaque);

/// Handle to the signing wallet derived from a provider.
#[derive(Clone)]
pub struct WalletHandle(Opaque);

impl ProviderHandle {
    /// Wrap a collaborator value.
    pub fn new<T: Any + Send + Sync>(label: impl Into<Arc<str>>, value: T) -> Self {
        Self(Opaque::new(label, value))
    }

    /// Human-readable label supplied by the collaborator.
    pub fn label(&self) -> &str {
        &self.0.label
    }

    /// Borrow the wrapped value if it has type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.inner.downcast_ref()
    }
}

impl RpcHandle {
    /// Wrap a collaborator value.
    pub fn new<T: Any + Send + Sync>(label: impl Into<Arc<str>>, value: T) -> Self {
        Self(Opaque::new(label, value))
    }

    /// Human-readable label supplied by the collaborator.
    pub fn label(&self) -> &str {
        &self.0.label
    }

    /// Borrow the wrapped value if it has type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.inner.downcast_ref()
    }
}

impl WalletHandle {
    /// Wrap a collaborator value.
    pub fn new<T: Any + Send + Sync>(label: impl Into<Arc<str>>, value: T) -> Self {
        Self(Opaque::new(label, value))
    }

    /// Human-readable label supplied by the collaborator.
    pub fn label(&self) -> &str {
        &self.0.label
    }

    /// Borrow the wrapped value if it has type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.inner.downcast_ref()
    }
}

impl PartialEq for ProviderHandle {
    fn eq(&self, other: &Self) -> bool {
        self.0.same(&other.0)
    }
}

impl PartialEq for RpcHandle {
    fn eq(&self, other: &Self) -> bool {
        self.0.same(&other.0)
    }
}

impl PartialEq for WalletHandle {
    fn eq(&self, other: &Self) -> bool {
        self.0.same(&other.0)
    }
}

impl fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProviderHandle({})", self.0.label)
    }
}

impl fmt::Debug for RpcHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RpcHandle({})", self.0.label)
    }
}

impl fmt::Debug for WalletHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WalletHandle({})", self.0.label)
    }
}
