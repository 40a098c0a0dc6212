//! Profile activation: switching, re-applying and deleting the active profile.
//!
//! Every operation here runs under one lock per orchestrator. A call that
//! arrives while another is Pending is rejected with [`ActivationOutcome::Busy`]
//! so two profiles never race for `current`.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::app_core::{UiEvent, UiStore};
use crate::domain::Notice;
use crate::error::{CoreError, ValidationError};
use crate::ports::{EnginePort, ProfilesPort};
use crate::profiles::ProfileStore;
use crate::progress::ActivationRun;
use quickroute_config::{
    ACTIVATING_DEBOUNCE, IMPORT_ACTIVATE_DELAY, NOTICE_ACTIVATION_ERROR_MS, NOTICE_ERROR_MS,
};
use quickroute_core::ProfileUid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationRequest {
    pub uid: ProfileUid,
    /// Re-activate even when `uid` is already current.
    pub force: bool,
}

impl ActivationRequest {
    pub fn new(uid: impl Into<ProfileUid>) -> Self {
        Self {
            uid: uid.into(),
            force: false,
        }
    }

    pub fn forced(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    Succeeded,
    /// Nothing to do (already current, unchanged profile, empty input).
    Skipped,
    /// Another activation is Pending.
    Busy,
    Failed,
}

pub struct ActivationOrchestrator {
    profiles: Arc<ProfileStore>,
    backend: Arc<dyn ProfilesPort>,
    engine: Arc<dyn EnginePort>,
    store: UiStore,
    lock: tokio::sync::Mutex<()>,
    debounce: Duration,
    import_delay: Duration,
}

impl ActivationOrchestrator {
    pub fn new(
        profiles: Arc<ProfileStore>,
        backend: Arc<dyn ProfilesPort>,
        engine: Arc<dyn EnginePort>,
        store: UiStore,
    ) -> Self {
        Self {
            profiles,
            backend,
            engine,
            store,
            lock: tokio::sync::Mutex::new(()),
            debounce: ACTIVATING_DEBOUNCE,
            import_delay: IMPORT_ACTIVATE_DELAY,
        }
    }

    pub fn with_timings(mut self, debounce: Duration, import_delay: Duration) -> Self {
        self.debounce = debounce;
        self.import_delay = import_delay;
        self
    }

    pub async fn activate(&self, uid: &str, force: bool) -> ActivationOutcome {
        self.submit(ActivationRequest::new(uid).forced(force)).await
    }

    pub async fn submit(&self, req: ActivationRequest) -> ActivationOutcome {
        let Ok(_pending) = self.lock.try_lock() else {
            debug!(uid = %req.uid, "activation rejected, another one is pending");
            return ActivationOutcome::Busy;
        };

        let previous = self.profiles.current();
        if !req.force && previous == req.uid {
            return ActivationOutcome::Skipped;
        }
        if !self.profiles.list().contains(&req.uid) {
            self.report(ValidationError::UnknownProfile(req.uid).into(), NOTICE_ERROR_MS);
            return ActivationOutcome::Failed;
        }

        let run = ActivationRun::begin(&self.store);
        run.mark_after(
            self.debounce,
            BTreeSet::from([previous.clone(), req.uid.clone()]),
        );

        info!(from = %previous, to = %req.uid, "switching profile");
        match self.switch_to(&req.uid).await {
            Ok(()) => {
                run.succeed();
                self.store.notify(Notice::success("Profile Switched"));
                ActivationOutcome::Succeeded
            }
            Err(e) => {
                // `current` stays where the store committed it.
                drop(run);
                self.report(e, NOTICE_ACTIVATION_ERROR_MS);
                ActivationOutcome::Failed
            }
        }
    }

    /// Re-applies the current profile's enhanced configuration.
    pub async fn reactivate(&self) -> ActivationOutcome {
        let Ok(_pending) = self.lock.try_lock() else {
            debug!("reactivation rejected, another activation is pending");
            return ActivationOutcome::Busy;
        };
        let run = ActivationRun::begin(&self.store);
        run.mark_now(self.current_set());
        self.reactivate_in(run).await
    }

    /// Deletes `uid`; when it was current, re-applies whatever the backend
    /// now considers current so the engine never keeps a deleted profile.
    pub async fn delete_and_reactivate(&self, uid: &str) -> ActivationOutcome {
        let Ok(_pending) = self.lock.try_lock() else {
            debug!(uid, "delete rejected, another activation is pending");
            return ActivationOutcome::Busy;
        };

        let was_current = self.profiles.is_current(uid);
        let run = ActivationRun::begin(&self.store);
        let mut marked = if was_current {
            self.current_set()
        } else {
            BTreeSet::new()
        };
        marked.insert(uid.to_string());
        run.mark_now(marked);

        if let Err(e) = self.profiles.remove(uid).await {
            drop(run);
            self.report(e, NOTICE_ERROR_MS);
            return ActivationOutcome::Failed;
        }
        info!(uid, was_current, "profile deleted");

        if let Err(e) = self.profiles.load().await {
            warn!("reload after delete failed, keeping local collection: {e}");
        }
        self.refresh_logs().await;

        if !was_current {
            run.succeed();
            return ActivationOutcome::Succeeded;
        }
        self.reactivate_in(run).await
    }

    /// Hook for the profile editor: re-applies when the current profile changed.
    pub async fn after_profile_edit(&self, uid: &str, changed: bool) -> ActivationOutcome {
        if !changed || !self.profiles.is_current(uid) {
            return ActivationOutcome::Skipped;
        }
        self.reactivate().await
    }

    /// Imports a profile from `url`. When a profile is already active and the
    /// collection holds a remote profile, that profile becomes current and is
    /// applied after the import settle delay.
    ///
    /// The import, reload and switch run under the activation lock. It is
    /// released before the delay so the final re-apply can take it again.
    pub async fn import(&self, url: &str) -> ActivationOutcome {
        if url.trim().is_empty() {
            return ActivationOutcome::Skipped;
        }
        let Ok(pending) = self.lock.try_lock() else {
            debug!(url, "import rejected, an activation is pending");
            return ActivationOutcome::Busy;
        };

        self.store.apply(UiEvent::ImportLoading(true));
        let imported = self.profiles.import(url).await;
        self.store.apply(UiEvent::ImportLoading(false));

        if let Err(e) = imported {
            self.report(e, NOTICE_ERROR_MS);
            return ActivationOutcome::Failed;
        }
        self.store
            .notify(Notice::success("Profile Imported Successfully"));

        let collection = match self.profiles.load().await {
            Ok(c) => c,
            Err(e) => {
                warn!("reload after import failed: {e}");
                return ActivationOutcome::Succeeded;
            }
        };

        let remote = match collection.first_remote() {
            Some(p) if !collection.current_uid().is_empty() => p.uid.clone(),
            _ => return ActivationOutcome::Succeeded,
        };

        if let Err(e) = self.backend.patch_current(&remote).await {
            self.report(CoreError::remote("patch current profile")(e), NOTICE_ERROR_MS);
            return ActivationOutcome::Failed;
        }
        self.profiles.select(&remote);
        self.refresh_logs().await;
        drop(pending);

        tokio::time::sleep(self.import_delay).await;
        self.reactivate().await
    }

    async fn switch_to(&self, uid: &str) -> Result<(), CoreError> {
        self.profiles.select(uid);
        self.backend
            .patch_current(uid)
            .await
            .map_err(CoreError::remote("patch current profile"))?;
        self.refresh_logs().await;

        self.engine
            .close_all_connections()
            .await
            .map_err(CoreError::remote("close connections"))?;
        self.backend
            .reactivate_engine()
            .await
            .map_err(CoreError::remote("reactivate engine"))?;
        Ok(())
    }

    async fn reactivate_in(&self, run: ActivationRun) -> ActivationOutcome {
        let res = self
            .backend
            .reactivate_engine()
            .await
            .map_err(CoreError::remote("reactivate engine"));
        self.refresh_logs().await;

        match res {
            Ok(()) => {
                run.succeed();
                self.store.notify(Notice::success("Profile Reactivated"));
                ActivationOutcome::Succeeded
            }
            Err(e) => {
                drop(run);
                self.report(e, NOTICE_ERROR_MS);
                ActivationOutcome::Failed
            }
        }
    }

    fn current_set(&self) -> BTreeSet<ProfileUid> {
        let current = self.profiles.current();
        if current.is_empty() {
            BTreeSet::new()
        } else {
            BTreeSet::from([current])
        }
    }

    async fn refresh_logs(&self) {
        match self.backend.fetch_runtime_logs().await {
            Ok(logs) => self.store.apply(UiEvent::RuntimeLogsLoaded(logs)),
            Err(e) => debug!("runtime logs unavailable: {e}"),
        }
    }

    fn report(&self, e: CoreError, duration_ms: u64) {
        error!("{e}");
        self.store
            .notify(Notice::error(e.user_message()).with_duration(duration_ms));
    }
}
