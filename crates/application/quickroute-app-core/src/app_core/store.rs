use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

use crate::domain::{Notice, UiState};

use super::{events::UiEvent, reducer::reduce};

/// Shared UI signal state. Cloning hands out another handle to the same state.
#[derive(Clone)]
pub struct UiStore {
    inner: Arc<Mutex<UiState>>,
    tx: Arc<watch::Sender<UiState>>,
}

impl Default for UiStore {
    fn default() -> Self {
        Self::new(UiState::default())
    }
}

impl UiStore {
    pub fn new(state: UiState) -> Self {
        let (tx, _rx) = watch::channel(state.clone());
        Self {
            inner: Arc::new(Mutex::new(state)),
            tx: Arc::new(tx),
        }
    }

    pub fn state(&self) -> UiState {
        self.lock().clone()
    }

    pub fn apply(&self, ev: UiEvent) {
        let mut guard = self.lock();
        let next = reduce(guard.clone(), ev);
        *guard = next;
        self.tx.send_replace(guard.clone());
    }

    pub fn notify(&self, notice: Notice) {
        self.apply(UiEvent::Notice(notice));
    }

    /// Receiver that sees every state published after an event is applied.
    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.tx.subscribe()
    }

    pub fn drain_notices(&self) -> Vec<Notice> {
        let mut guard = self.lock();
        let drained = std::mem::take(&mut guard.notices);
        self.tx.send_replace(guard.clone());
        drained
    }

    fn lock(&self) -> MutexGuard<'_, UiState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
