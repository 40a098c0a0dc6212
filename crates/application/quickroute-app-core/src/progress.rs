use std::collections::BTreeSet;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::app_core::{UiEvent, UiStore};
use crate::domain::ActivationRunId;
use quickroute_core::ProfileUid;

/// One Pending activation. Dropping it ends the run and clears the activating
/// set, whichever path the operation took.
pub(crate) struct ActivationRun {
    store: UiStore,
    run_id: ActivationRunId,
    debounce: CancellationToken,
    succeeded: bool,
}

impl ActivationRun {
    pub(crate) fn begin(store: &UiStore) -> Self {
        let run_id: ActivationRunId = uuid::Uuid::new_v4();
        store.apply(UiEvent::ActivationStarted { run_id });
        Self {
            store: store.clone(),
            run_id,
            debounce: CancellationToken::new(),
            succeeded: false,
        }
    }

    pub(crate) fn mark_now(&self, uids: BTreeSet<ProfileUid>) {
        self.store.apply(UiEvent::ActivatingMarked {
            run_id: self.run_id,
            uids,
        });
    }

    /// Publishes `uids` after `delay` unless the run finishes first.
    pub(crate) fn mark_after(&self, delay: Duration, uids: BTreeSet<ProfileUid>) {
        if delay.is_zero() {
            self.mark_now(uids);
            return;
        }
        let token = self.debounce.clone();
        let store = self.store.clone();
        let run_id = self.run_id;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    store.apply(UiEvent::ActivatingMarked { run_id, uids });
                }
            }
        });
    }

    pub(crate) fn succeed(mut self) {
        self.succeeded = true;
    }
}

impl Drop for ActivationRun {
    fn drop(&mut self) {
        self.debounce.cancel();
        self.store.apply(UiEvent::ActivationFinished {
            run_id: self.run_id,
            succeeded: self.succeeded,
        });
    }
}
