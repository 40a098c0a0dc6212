//! Lifecycle of the privileged helper service.
//!
//! The OS owns the real status; this manager only requests transitions and
//! observes the result by polling. After every state-changing call the status
//! is fetched once right away and once more after a settle delay, because the
//! OS transition is not synchronous with the RPC response.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::app_core::{UiEvent, UiStore};
use crate::domain::Notice;
use crate::error::CoreError;
use crate::ports::{ConfigPort, Credential, CredentialPrompt, ServiceAction, ServicePort};
use quickroute_config::SERVICE_SETTLE_DELAY;
use quickroute_core::{FlagsPatch, ServiceStatus};

/// Platform behaviour relevant to service management.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    /// Install/uninstall needs an out-of-band elevation credential.
    pub requires_credential: bool,
}

impl Platform {
    pub fn current() -> Self {
        Self {
            requires_credential: !cfg!(target_os = "windows"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceOutcome {
    Installed,
    Uninstalled,
    Toggled { enabled: bool },
    /// Another install/uninstall/toggle is in flight.
    Busy,
    /// The credential prompt was dismissed; nothing was called.
    Cancelled,
    Failed,
}

impl ServiceOutcome {
    pub fn is_ok(self) -> bool {
        matches!(
            self,
            ServiceOutcome::Installed | ServiceOutcome::Uninstalled | ServiceOutcome::Toggled { .. }
        )
    }
}

/// Fetches the status and publishes it. Cheap to clone into timer tasks.
#[derive(Clone)]
struct StatusReader {
    service: Arc<dyn ServicePort>,
    store: UiStore,
}

impl StatusReader {
    async fn refresh(&self) -> Option<ServiceStatus> {
        match self.service.fetch_service_status().await {
            Ok(status) => {
                debug!(%status, "service status observed");
                self.store.apply(UiEvent::ServiceStatusObserved(status));
                Some(status)
            }
            Err(e) => {
                // Keep the last confirmed status rather than guessing one.
                warn!("service status fetch failed: {e}");
                None
            }
        }
    }
}

pub struct ServiceLifecycleManager {
    reader: StatusReader,
    config: Arc<dyn ConfigPort>,
    prompt: Arc<dyn CredentialPrompt>,
    store: UiStore,
    platform: Platform,
    settle_delay: Duration,
    lock: tokio::sync::Mutex<()>,
    /// Delayed re-fetches still waiting out the settle delay.
    settling: Mutex<Vec<JoinHandle<()>>>,
}

impl ServiceLifecycleManager {
    pub fn new(
        service: Arc<dyn ServicePort>,
        config: Arc<dyn ConfigPort>,
        prompt: Arc<dyn CredentialPrompt>,
        store: UiStore,
        platform: Platform,
    ) -> Self {
        Self {
            reader: StatusReader {
                service,
                store: store.clone(),
            },
            config,
            prompt,
            store,
            platform,
            settle_delay: SERVICE_SETTLE_DELAY,
            lock: tokio::sync::Mutex::new(()),
            settling: Mutex::new(Vec::new()),
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn status(&self) -> ServiceStatus {
        self.store.state().service_status
    }

    pub async fn refresh_status(&self) -> Option<ServiceStatus> {
        self.reader.refresh().await
    }

    /// Waits for every delayed status re-fetch scheduled so far.
    pub async fn settled(&self) {
        let pending = std::mem::take(&mut *self.settling());
        for handle in pending {
            if let Err(e) = handle.await {
                warn!("delayed status fetch did not finish: {e}");
            }
        }
    }

    /// Installs when not installed, otherwise flips Active and Installed.
    pub async fn install_or_enable(&self) -> ServiceOutcome {
        let Ok(_busy) = self.lock.try_lock() else {
            return ServiceOutcome::Busy;
        };
        let status = self.status();
        if !status.is_installed() {
            self.install_locked().await
        } else {
            self.set_enabled_locked(!status.is_active()).await
        }
    }

    /// Makes sure the service is installed and service mode is on.
    pub async fn ensure_enabled(&self) -> ServiceOutcome {
        let Ok(_busy) = self.lock.try_lock() else {
            return ServiceOutcome::Busy;
        };
        if !self.status().is_installed() {
            let installed = self.install_locked().await;
            if installed != ServiceOutcome::Installed {
                return installed;
            }
        }
        self.set_enabled_locked(true).await
    }

    pub async fn set_enabled(&self, enabled: bool) -> ServiceOutcome {
        let Ok(_busy) = self.lock.try_lock() else {
            return ServiceOutcome::Busy;
        };
        self.set_enabled_locked(enabled).await
    }

    pub async fn uninstall(&self) -> ServiceOutcome {
        let Ok(_busy) = self.lock.try_lock() else {
            return ServiceOutcome::Busy;
        };

        self.store.apply(UiEvent::UninstallLoading(true));
        let outcome = match self.obtain_credential(ServiceAction::Uninstall).await {
            None => ServiceOutcome::Cancelled,
            Some(credential) => {
                let res = self
                    .reader
                    .service
                    .uninstall_service(credential.as_ref())
                    .await
                    .map_err(CoreError::remote("uninstall service"));
                self.reconcile().await;
                match res {
                    Ok(()) => {
                        info!("service uninstalled");
                        self.store
                            .notify(Notice::success("Service Uninstalled Successfully"));
                        ServiceOutcome::Uninstalled
                    }
                    Err(e) => self.fail(e),
                }
            }
        };
        self.store.apply(UiEvent::UninstallLoading(false));
        outcome
    }

    /// Polls the status every `every` until the returned token is cancelled.
    pub fn spawn_poller(&self, every: Duration) -> CancellationToken {
        let token = CancellationToken::new();
        let child = token.clone();
        let reader = self.reader.clone();
        tokio::spawn(async move {
            let mut ticker = interval(every);
            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => {
                        reader.refresh().await;
                    }
                }
            }
        });
        token
    }

    async fn install_locked(&self) -> ServiceOutcome {
        self.store.apply(UiEvent::ServiceLoading(true));
        let outcome = match self.obtain_credential(ServiceAction::Install).await {
            None => ServiceOutcome::Cancelled,
            Some(credential) => {
                let res = self
                    .reader
                    .service
                    .install_service(credential.as_ref())
                    .await
                    .map_err(CoreError::remote("install service"));
                self.reconcile().await;
                match res {
                    Ok(()) => {
                        info!("service installed");
                        self.store
                            .notify(Notice::success("Service Installed Successfully"));
                        ServiceOutcome::Installed
                    }
                    Err(e) => self.fail(e),
                }
            }
        };
        self.store.apply(UiEvent::ServiceLoading(false));
        outcome
    }

    async fn set_enabled_locked(&self, enabled: bool) -> ServiceOutcome {
        self.store.apply(UiEvent::ServiceLoading(true));
        let patch = FlagsPatch::service_mode(enabled);
        let res = self
            .config
            .patch_flags(&patch)
            .await
            .map_err(CoreError::remote("patch service mode"));
        if res.is_ok() {
            self.store.apply(UiEvent::FlagsPatched(patch));
        }
        self.reconcile().await;
        self.store.apply(UiEvent::ServiceLoading(false));

        match res {
            Ok(()) => {
                info!(enabled, "service mode switched");
                ServiceOutcome::Toggled { enabled }
            }
            Err(e) => self.fail(e),
        }
    }

    /// `None` when the user dismissed the prompt. `Some(None)` on platforms
    /// that need no credential.
    async fn obtain_credential(&self, action: ServiceAction) -> Option<Option<Credential>> {
        if !self.platform.requires_credential {
            return Some(None);
        }
        self.store.apply(UiEvent::CredentialPromptOpened(action));
        let credential = self.prompt.request_credential(action).await;
        self.store.apply(UiEvent::CredentialPromptClosed(action));
        if credential.is_none() {
            debug!(?action, "credential prompt dismissed");
        }
        credential.map(Some)
    }

    async fn reconcile(&self) {
        self.reader.refresh().await;
        let reader = self.reader.clone();
        let delay = self.settle_delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            reader.refresh().await;
        });
        let mut settling = self.settling();
        settling.retain(|h| !h.is_finished());
        settling.push(handle);
    }

    fn settling(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.settling
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn fail(&self, e: CoreError) -> ServiceOutcome {
        error!("{e}");
        self.store.notify(Notice::error(e.user_message()));
        ServiceOutcome::Failed
    }
}
