use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};

use crate::activation::{ActivationOrchestrator, ActivationOutcome};
use crate::app_core::{AppCommand, UiStore};
use crate::domain::Notice;
use crate::mode::{ModeController, ModeOutcome};
use crate::ports::{ConfigPort, CredentialPrompt, EnginePort, ProfilesPort, ServicePort};
use crate::profiles::ProfileStore;
use crate::quick_connect::{QuickConnectOutcome, QuickConnectToggle};
use crate::service::{Platform, ServiceLifecycleManager, ServiceOutcome};
use quickroute_config::{ACTIVATING_DEBOUNCE, IMPORT_ACTIVATE_DELAY, SERVICE_SETTLE_DELAY};

/// Adapters for every RPC boundary the core talks to.
#[derive(Clone)]
pub struct Backends {
    pub profiles: Arc<dyn ProfilesPort>,
    pub engine: Arc<dyn EnginePort>,
    pub config: Arc<dyn ConfigPort>,
    pub service: Arc<dyn ServicePort>,
    pub prompt: Arc<dyn CredentialPrompt>,
}

#[derive(Debug, Clone, Copy)]
pub struct KernelOptions {
    pub platform: Platform,
    pub activating_debounce: Duration,
    pub service_settle_delay: Duration,
    pub import_activate_delay: Duration,
}

impl Default for KernelOptions {
    fn default() -> Self {
        Self {
            platform: Platform::current(),
            activating_debounce: ACTIVATING_DEBOUNCE,
            service_settle_delay: SERVICE_SETTLE_DELAY,
            import_activate_delay: IMPORT_ACTIVATE_DELAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Loaded,
    Activation(ActivationOutcome),
    Reordered(bool),
    Mode(ModeOutcome),
    Service(ServiceOutcome),
    QuickConnect(QuickConnectOutcome),
    Refreshed,
    Failed,
}

/// Wires the four components around one UI store and routes commands to them.
pub struct AppKernel {
    pub store: UiStore,
    pub profiles: Arc<ProfileStore>,
    pub activation: ActivationOrchestrator,
    pub service: Arc<ServiceLifecycleManager>,
    pub mode: ModeController,
    pub quick: QuickConnectToggle,
}

impl AppKernel {
    pub fn new(backends: Backends, options: KernelOptions) -> Self {
        let store = UiStore::default();
        let profiles = Arc::new(ProfileStore::new(backends.profiles.clone()));
        let activation = ActivationOrchestrator::new(
            profiles.clone(),
            backends.profiles.clone(),
            backends.engine.clone(),
            store.clone(),
        )
        .with_timings(options.activating_debounce, options.import_activate_delay);
        let service = Arc::new(
            ServiceLifecycleManager::new(
                backends.service.clone(),
                backends.config.clone(),
                backends.prompt.clone(),
                store.clone(),
                options.platform,
            )
            .with_settle_delay(options.service_settle_delay),
        );
        let mode = ModeController::new(
            backends.engine.clone(),
            backends.config.clone(),
            store.clone(),
        );
        let quick = QuickConnectToggle::new(
            profiles.clone(),
            service.clone(),
            backends.config.clone(),
            store.clone(),
        );

        Self {
            store,
            profiles,
            activation,
            service,
            mode,
            quick,
        }
    }

    /// Initial fetch of every external state. Each failure is reported on its own.
    pub async fn load(&self) -> CommandOutcome {
        let mut ok = true;
        if let Err(e) = self.profiles.load().await {
            error!("{e}");
            self.store.notify(Notice::error(e.user_message()));
            ok = false;
        }
        if self.quick.reconcile().await.is_none() {
            ok = false;
        }
        if self.mode.refresh().await == ModeOutcome::Failed {
            ok = false;
        }
        if self.service.refresh_status().await.is_none() {
            ok = false;
        }
        if ok {
            CommandOutcome::Loaded
        } else {
            warn!("initial load incomplete");
            CommandOutcome::Failed
        }
    }

    pub async fn dispatch(&self, cmd: AppCommand) -> CommandOutcome {
        match cmd {
            AppCommand::Load => self.load().await,

            AppCommand::Activate { uid, force } => {
                CommandOutcome::Activation(self.activation.activate(&uid, force).await)
            }
            AppCommand::Reactivate => CommandOutcome::Activation(self.activation.reactivate().await),
            AppCommand::Delete(uid) => {
                CommandOutcome::Activation(self.activation.delete_and_reactivate(&uid).await)
            }
            AppCommand::Reorder { source, target } => {
                match self.profiles.reorder(&source, &target).await {
                    Ok(moved) => CommandOutcome::Reordered(moved),
                    Err(e) => {
                        error!("{e}");
                        self.store.notify(Notice::error(e.user_message()));
                        CommandOutcome::Failed
                    }
                }
            }
            AppCommand::Import(url) => CommandOutcome::Activation(self.activation.import(&url).await),
            AppCommand::ProfileEdited { uid, changed } => {
                CommandOutcome::Activation(self.activation.after_profile_edit(&uid, changed).await)
            }

            AppCommand::SetMode(raw) => CommandOutcome::Mode(self.mode.set_mode_str(&raw).await),

            AppCommand::InstallOrEnableService => {
                CommandOutcome::Service(self.service.install_or_enable().await)
            }
            AppCommand::UninstallService => CommandOutcome::Service(self.service.uninstall().await),
            AppCommand::RefreshServiceStatus => match self.service.refresh_status().await {
                Some(_) => CommandOutcome::Refreshed,
                None => CommandOutcome::Failed,
            },

            AppCommand::EnableQuickConnect => CommandOutcome::QuickConnect(self.quick.enable().await),
            AppCommand::DisableQuickConnect => {
                CommandOutcome::QuickConnect(self.quick.disable().await)
            }
            AppCommand::RefreshFlags => match self.quick.reconcile().await {
                Some(_) => CommandOutcome::Refreshed,
                None => CommandOutcome::Failed,
            },
        }
    }
}
