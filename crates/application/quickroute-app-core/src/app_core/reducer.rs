use crate::domain::{ActivationPhase, UiState};

use super::events::UiEvent;

pub fn reduce(mut state: UiState, ev: UiEvent) -> UiState {
    match ev {
        UiEvent::ActivationStarted { run_id } => {
            state.activation = ActivationPhase::Pending;
            state.activation_run = Some(run_id);
            state.activating.clear();
        }

        // A debounce timer that fires after its run ended must not resurrect the set.
        UiEvent::ActivatingMarked { run_id, uids } => {
            if state.activation_run == Some(run_id) {
                state.activating = uids;
            }
        }

        UiEvent::ActivationFinished { run_id, succeeded } => {
            if state.activation_run == Some(run_id) {
                state.activation_run = None;
                state.activating.clear();
                state.activation = if succeeded {
                    ActivationPhase::Succeeded
                } else {
                    ActivationPhase::Failed
                };
            }
        }

        UiEvent::ImportLoading(on) => state.importing = on,
        UiEvent::RuntimeLogsLoaded(logs) => state.runtime_logs = logs,

        UiEvent::ServiceStatusObserved(status) => state.service_status = status,
        UiEvent::ServiceLoading(on) => state.service_loading = on,
        UiEvent::UninstallLoading(on) => state.uninstall_loading = on,
        UiEvent::CredentialPromptOpened(action) => state.credential_prompt = Some(action),
        UiEvent::CredentialPromptClosed(action) => {
            if state.credential_prompt == Some(action) {
                state.credential_prompt = None;
            }
        }

        UiEvent::FlagsObserved(flags) => {
            state.flags = flags;
            state.quick_connected = flags.quick_connected();
        }
        UiEvent::FlagsPatched(patch) => patch.apply_to(&mut state.flags),
        UiEvent::QuickConnectedPredicted(on) => state.quick_connected = on,

        UiEvent::EngineConfigObserved(config) => state.engine = Some(config),

        UiEvent::Notice(notice) => state.notices.push(notice),
    }
    state
}
