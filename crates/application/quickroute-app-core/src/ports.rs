use std::fmt;

use async_trait::async_trait;
use quickroute_core::{
    AppFlags, EngineConfig, EnginePatch, FlagsPatch, ProfileCollection, RuntimeLogs,
    ServiceStatus,
};

/// Failure reported by the other side of an RPC boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RemoteCallError {
    pub message: String,
}

impl RemoteCallError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type RemoteResult<T> = Result<T, RemoteCallError>;

/// Secret used to elevate privileges for service (un)installation.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceAction {
    Install,
    Uninstall,
}

#[async_trait]
pub trait ProfilesPort: Send + Sync + 'static {
    async fn fetch_profiles(&self) -> RemoteResult<ProfileCollection>;
    /// Points the backend at `uid` and pushes that profile's configuration to the engine.
    async fn patch_current(&self, uid: &str) -> RemoteResult<()>;
    async fn persist_reorder(&self, uid: &str, target_uid: &str) -> RemoteResult<()>;
    async fn delete_profile(&self, uid: &str) -> RemoteResult<()>;
    async fn import_profile(&self, url: &str) -> RemoteResult<()>;
    /// Asks the engine to re-read the merged ("enhanced") configuration.
    async fn reactivate_engine(&self) -> RemoteResult<()>;
    async fn fetch_runtime_logs(&self) -> RemoteResult<RuntimeLogs>;
}

#[async_trait]
pub trait EnginePort: Send + Sync + 'static {
    async fn fetch_engine_config(&self) -> RemoteResult<EngineConfig>;
    /// Patches the running engine only; nothing is persisted.
    async fn patch_live_config(&self, patch: &EnginePatch) -> RemoteResult<()>;
    async fn close_all_connections(&self) -> RemoteResult<()>;
}

#[async_trait]
pub trait ConfigPort: Send + Sync + 'static {
    async fn fetch_flags(&self) -> RemoteResult<AppFlags>;
    async fn patch_flags(&self, patch: &FlagsPatch) -> RemoteResult<()>;
    /// Persists an engine patch so it survives engine restarts.
    async fn patch_engine_config(&self, patch: &EnginePatch) -> RemoteResult<()>;
}

#[async_trait]
pub trait ServicePort: Send + Sync + 'static {
    async fn fetch_service_status(&self) -> RemoteResult<ServiceStatus>;
    async fn install_service(&self, credential: Option<&Credential>) -> RemoteResult<()>;
    async fn uninstall_service(&self, credential: Option<&Credential>) -> RemoteResult<()>;
}

/// UI boundary that asks the user for an elevation credential.
#[async_trait]
pub trait CredentialPrompt: Send + Sync + 'static {
    /// `None` means the user dismissed the prompt.
    async fn request_credential(&self, action: ServiceAction) -> Option<Credential>;
}
