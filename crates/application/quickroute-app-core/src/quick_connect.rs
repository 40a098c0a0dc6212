//! One switch for "service mode + tun + system proxy".
//!
//! Turning it on or off runs a saga: an ordered list of independent steps,
//! each logged and individually fallible. A failed step does not stop the
//! ones after it and nothing is rolled back.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::app_core::{UiEvent, UiStore};
use crate::domain::Notice;
use crate::error::{CoreError, ValidationError};
use crate::ports::ConfigPort;
use crate::profiles::ProfileStore;
use crate::service::{ServiceLifecycleManager, ServiceOutcome};
use quickroute_core::{AppFlags, FlagsPatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaStep {
    ServiceMode,
    TunMode,
    SystemProxy,
}

impl SagaStep {
    pub const ORDER: [SagaStep; 3] = [SagaStep::ServiceMode, SagaStep::TunMode, SagaStep::SystemProxy];
}

impl fmt::Display for SagaStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SagaStep::ServiceMode => "service mode",
            SagaStep::TunMode => "tun mode",
            SagaStep::SystemProxy => "system proxy",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: SagaStep,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SagaReport {
    pub enabled: bool,
    pub steps: Vec<StepReport>,
}

impl SagaReport {
    pub fn all_ok(&self) -> bool {
        self.steps.iter().all(|s| s.error.is_none())
    }

    pub fn failed(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| s.error.is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuickConnectOutcome {
    /// Nothing to route through; no flag was touched.
    Rejected,
    Completed(SagaReport),
}

pub struct QuickConnectToggle {
    profiles: Arc<ProfileStore>,
    service: Arc<ServiceLifecycleManager>,
    config: Arc<dyn ConfigPort>,
    store: UiStore,
}

impl QuickConnectToggle {
    pub fn new(
        profiles: Arc<ProfileStore>,
        service: Arc<ServiceLifecycleManager>,
        config: Arc<dyn ConfigPort>,
        store: UiStore,
    ) -> Self {
        Self {
            profiles,
            service,
            config,
            store,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.store.state().quick_connected
    }

    pub async fn enable(&self) -> QuickConnectOutcome {
        if !self.profiles.list().has_selectable() {
            let e = CoreError::from(ValidationError::EmptyProfiles);
            warn!("quick connect refused: {e}");
            self.store.notify(Notice::error(e.user_message()));
            return QuickConnectOutcome::Rejected;
        }
        self.store.apply(UiEvent::QuickConnectedPredicted(true));
        QuickConnectOutcome::Completed(self.run(true).await)
    }

    pub async fn disable(&self) -> QuickConnectOutcome {
        self.store.apply(UiEvent::QuickConnectedPredicted(false));
        QuickConnectOutcome::Completed(self.run(false).await)
    }

    pub async fn toggle(&self) -> QuickConnectOutcome {
        if self.is_connected() {
            self.disable().await
        } else {
            self.enable().await
        }
    }

    /// Overwrites the predicted indicator with what the config boundary reports.
    pub async fn reconcile(&self) -> Option<AppFlags> {
        match self.config.fetch_flags().await {
            Ok(flags) => {
                self.store.apply(UiEvent::FlagsObserved(flags));
                Some(flags)
            }
            Err(e) => {
                warn!("flags fetch failed, keeping predicted state: {e}");
                None
            }
        }
    }

    async fn run(&self, enabled: bool) -> SagaReport {
        let mut report = SagaReport {
            enabled,
            steps: Vec::with_capacity(SagaStep::ORDER.len()),
        };
        for step in SagaStep::ORDER {
            let error = self.run_step(step, enabled).await.err();
            match &error {
                None => info!(%step, enabled, "quick connect step done"),
                Some(message) => warn!(%step, enabled, "quick connect step failed: {message}"),
            }
            report.steps.push(StepReport { step, error });
        }
        report
    }

    async fn run_step(&self, step: SagaStep, enabled: bool) -> Result<(), String> {
        let patch = match step {
            SagaStep::ServiceMode => {
                let outcome = if enabled {
                    self.service.ensure_enabled().await
                } else {
                    self.service.set_enabled(false).await
                };
                return match outcome {
                    o if o.is_ok() => Ok(()),
                    ServiceOutcome::Busy => Err("service operation already in progress".into()),
                    ServiceOutcome::Cancelled => Err("credential prompt dismissed".into()),
                    _ => Err("service mode could not be changed".into()),
                };
            }
            SagaStep::TunMode => FlagsPatch::tun_mode(enabled),
            SagaStep::SystemProxy => FlagsPatch::system_proxy(enabled),
        };

        match self.config.patch_flags(&patch).await {
            Ok(()) => {
                self.store.apply(UiEvent::FlagsPatched(patch));
                Ok(())
            }
            Err(e) => {
                let e = CoreError::remote("patch flags")(e);
                self.store.notify(Notice::error(e.user_message()));
                Err(e.to_string())
            }
        }
    }
}
