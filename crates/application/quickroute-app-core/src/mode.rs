use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::app_core::{UiEvent, UiStore};
use crate::domain::Notice;
use crate::error::{CoreError, ValidationError};
use crate::ports::{ConfigPort, EnginePort};
use quickroute_core::{EngineConfig, EnginePatch, RoutingMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeOutcome {
    Applied,
    /// Refresh found a valid mode; nothing pushed.
    Unchanged,
    /// The engine reported an unknown mode and was forced back to `rule`.
    Corrected,
    /// Input was not a known mode; nothing pushed.
    Rejected,
    Busy,
    Failed,
}

pub struct ModeController {
    engine: Arc<dyn EnginePort>,
    config: Arc<dyn ConfigPort>,
    store: UiStore,
    lock: tokio::sync::Mutex<()>,
}

impl ModeController {
    pub fn new(engine: Arc<dyn EnginePort>, config: Arc<dyn ConfigPort>, store: UiStore) -> Self {
        Self {
            engine,
            config,
            store,
            lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Last mode the engine reported, lowercased.
    pub fn current(&self) -> Option<String> {
        self.store.state().engine.map(|e| e.mode_lowercase())
    }

    pub async fn set_mode_str(&self, raw: &str) -> ModeOutcome {
        match raw.parse::<RoutingMode>() {
            Ok(mode) => self.set_mode(mode).await,
            Err(e) => {
                let e = CoreError::from(ValidationError::from(e));
                warn!("{e}");
                self.store.notify(Notice::error(e.user_message()));
                ModeOutcome::Rejected
            }
        }
    }

    pub async fn set_mode(&self, mode: RoutingMode) -> ModeOutcome {
        let Ok(_busy) = self.lock.try_lock() else {
            return ModeOutcome::Busy;
        };

        let pushed = self.push_mode(mode).await;
        let refreshed = self.refresh_locked().await;
        match pushed {
            Ok(()) => {
                info!(%mode, "routing mode applied");
                if refreshed == ModeOutcome::Corrected {
                    refreshed
                } else {
                    ModeOutcome::Applied
                }
            }
            Err(e) => {
                error!("{e}");
                self.store.notify(Notice::error(e.user_message()));
                ModeOutcome::Failed
            }
        }
    }

    /// Re-reads the engine config and self-heals an unknown, non-empty mode to `rule`.
    pub async fn refresh(&self) -> ModeOutcome {
        let Ok(_busy) = self.lock.try_lock() else {
            return ModeOutcome::Busy;
        };
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> ModeOutcome {
        let Some(config) = self.fetch_observed().await else {
            return ModeOutcome::Failed;
        };
        // A controller that reports no mode at all is left alone.
        if config.mode.trim().is_empty() || config.routing_mode().is_ok() {
            return ModeOutcome::Unchanged;
        }

        let inconsistency = CoreError::StateInconsistency {
            observed: config.mode.clone(),
        };
        warn!("{inconsistency}, forcing rule");
        match self.push_mode(RoutingMode::Rule).await {
            Ok(()) => {
                // One correction attempt; a second bad report is left for the next refresh.
                self.fetch_observed().await;
                ModeOutcome::Corrected
            }
            Err(e) => {
                error!("{e}");
                self.store.notify(Notice::error(e.user_message()));
                ModeOutcome::Failed
            }
        }
    }

    async fn push_mode(&self, mode: RoutingMode) -> Result<(), CoreError> {
        let state = self.store.state();
        let current = state.engine.as_ref().map(EngineConfig::mode_lowercase);
        if current.as_deref() != Some(mode.as_str()) && state.flags.auto_close_connection {
            if let Err(e) = self.engine.close_all_connections().await {
                warn!("closing connections before mode switch failed: {e}");
            }
        }

        let patch = EnginePatch::mode(mode);
        self.engine
            .patch_live_config(&patch)
            .await
            .map_err(CoreError::remote("patch live mode"))?;
        self.config
            .patch_engine_config(&patch)
            .await
            .map_err(CoreError::remote("persist mode"))?;
        Ok(())
    }

    async fn fetch_observed(&self) -> Option<EngineConfig> {
        match self.engine.fetch_engine_config().await {
            Ok(config) => {
                debug!(mode = %config.mode, "engine config observed");
                self.store
                    .apply(UiEvent::EngineConfigObserved(config.clone()));
                Some(config)
            }
            Err(e) => {
                warn!("engine config fetch failed: {e}");
                None
            }
        }
    }
}
