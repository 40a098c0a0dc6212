use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ports::ServiceAction;
use quickroute_config::{NOTICE_ERROR_MS, NOTICE_SUCCESS_MS};
use quickroute_core::{AppFlags, EngineConfig, ProfileUid, RuntimeLogs, ServiceStatus};

pub type ActivationRunId = uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// User-visible notification. Every failed operation produces exactly one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub duration_ms: u64,
    pub at: DateTime<Utc>,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message, NOTICE_SUCCESS_MS)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message, NOTICE_ERROR_MS)
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    fn new(level: NoticeLevel, message: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            level,
            message: message.into(),
            duration_ms,
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivationPhase {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed,
}

/// Everything the UI layer renders from the orchestration core.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    pub activation: ActivationPhase,
    pub activation_run: Option<ActivationRunId>,
    /// Uids mid-transition. Progress signal only.
    pub activating: BTreeSet<ProfileUid>,
    pub importing: bool,
    pub runtime_logs: RuntimeLogs,

    /// Last status confirmed by a fetch.
    pub service_status: ServiceStatus,
    pub service_loading: bool,
    pub uninstall_loading: bool,
    pub credential_prompt: Option<ServiceAction>,

    pub flags: AppFlags,
    pub quick_connected: bool,

    pub engine: Option<EngineConfig>,

    pub notices: Vec<Notice>,
}

impl UiState {
    pub fn last_notice(&self) -> Option<&Notice> {
        self.notices.last()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter().filter(|n| n.level == NoticeLevel::Error)
    }
}
