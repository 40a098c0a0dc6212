use std::collections::BTreeSet;

use crate::domain::{ActivationRunId, Notice};
use crate::ports::ServiceAction;
use quickroute_core::{AppFlags, EngineConfig, FlagsPatch, ProfileUid, RuntimeLogs, ServiceStatus};

#[derive(Debug, Clone)]
pub enum UiEvent {
    // Activation progress
    ActivationStarted {
        run_id: ActivationRunId,
    },
    ActivatingMarked {
        run_id: ActivationRunId,
        uids: BTreeSet<ProfileUid>,
    },
    ActivationFinished {
        run_id: ActivationRunId,
        succeeded: bool,
    },
    ImportLoading(bool),
    RuntimeLogsLoaded(RuntimeLogs),

    // Service
    ServiceStatusObserved(ServiceStatus),
    ServiceLoading(bool),
    UninstallLoading(bool),
    CredentialPromptOpened(ServiceAction),
    CredentialPromptClosed(ServiceAction),

    // Flags: `Observed` is ground truth, `Patched` is a local prediction.
    FlagsObserved(AppFlags),
    FlagsPatched(FlagsPatch),
    QuickConnectedPredicted(bool),

    // Engine
    EngineConfigObserved(EngineConfig),

    // User-visible notifications
    Notice(Notice),
}
